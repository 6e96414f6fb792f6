//! # Test Discovery Module / 测试发现模块
//!
//! Populates and refreshes subtrees of the `TestTree`. Two strategies exist
//! and exactly one is chosen when a session is built:
//!
//! - `glob::GlobDiscoverer` classifies the files matching the test glob and
//!   builds the whole directory/file hierarchy eagerly.
//! - `indexed::IndexedDiscoverer` builds the same hierarchy as empty
//!   placeholders and asks the indexing collaborator for a file's examples
//!   when that file is expanded or saved.
//!
//! 填充并刷新 `TestTree` 的子树。共有两种策略，构建会话时只选择其中一种：
//! 基于通配模式的即时发现，以及基于索引器的延迟发现。

pub mod glob;
pub mod indexed;
pub mod lens;

use async_trait::async_trait;
use globset::GlobSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::error::DiscoveryError;
use crate::core::models::{
    Capability, Location, NodeId, NodeKind, TestNode, Workspace, Workspaces,
};
use crate::core::tree::TestTree;
use crate::infra::fs;

pub use glob::GlobDiscoverer;
pub use indexed::IndexedDiscoverer;

/// Which discovery strategy a session uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// Filesystem glob, no lazy resolution.
    Glob,
    /// Lazy, delegated to the indexing collaborator.
    Indexed,
}

#[async_trait]
pub trait Discoverer: Send + Sync {
    fn mode(&self) -> DiscoveryMode;

    /// Populates the children of `node`, or the top level when `node` is `None`.
    async fn resolve(&self, tree: &mut TestTree, node: Option<&NodeId>) -> Result<(), DiscoveryError>;
}

/// How test files are laid out in a workspace and which commands run them.
/// 测试文件在工作区中的布局方式，以及运行它们的命令。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestLayout {
    /// Root directory names, in priority order.
    pub test_roots: Vec<String>,
    pub extension: String,
    pub helper_file: String,
    pub excluded_segment: String,
    pub file_command: Option<String>,
    pub example_command: Option<String>,
}

impl Default for TestLayout {
    fn default() -> Self {
        crate::core::config::Config::default().layout()
    }
}

impl TestLayout {
    /// `**/{test,spec,features}/**/{*_test.rb,test_*.rb,*_spec.rb,*.feature}` for the defaults.
    pub fn pattern(&self) -> String {
        let ext = &self.extension;
        format!(
            "**/{{{}}}/**/{{*_test.{ext},test_*.{ext},*_spec.{ext},*.feature}}",
            self.test_roots.join(",")
        )
    }

    pub fn globs(&self) -> Result<GlobSet, DiscoveryError> {
        fs::compile_glob(&self.pattern())
    }

    /// Index of the first segment naming a test root. Roots are tried in
    /// priority order, so `test` wins over an earlier `spec` segment.
    pub fn dir_position(&self, segments: &[String]) -> Option<usize> {
        self.test_roots
            .iter()
            .find_map(|root| segments.iter().position(|s| s == root))
    }

    /// Fixture files and the shared helper are never tests.
    pub fn is_excluded(&self, segments: &[String]) -> bool {
        segments.last().is_some_and(|name| *name == self.helper_file)
            || segments.iter().any(|s| *s == self.excluded_segment)
    }

    pub fn file_command(&self, file: &Path) -> Option<String> {
        let template = self.file_command.as_ref()?;
        Some(template.replace("{file}", &quote(&file.to_string_lossy())))
    }

    /// `line` is zero-based; templates receive it one-based.
    pub fn example_command(&self, file: &Path, line: u32, label: &str, id: &str) -> Option<String> {
        let template = self.example_command.as_ref()?;
        Some(
            template
                .replace("{file}", &quote(&file.to_string_lossy()))
                .replace("{line}", &(line + 1).to_string())
                .replace("{label}", &quote(label))
                .replace("{id}", &quote(id)),
        )
    }
}

fn quote(value: &str) -> String {
    shlex::try_quote(value)
        .map(|q| q.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

/// Ids of items found inside a file are scoped by the file so that the same
/// class name in two files yields two nodes.
pub(crate) fn scoped_id(file: &Path, item_id: &str) -> NodeId {
    NodeId::new(format!("{}::{}", file.display(), item_id))
}

/// One accepted test file and the directory levels it belongs under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScannedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub first_level_label: String,
    pub first_level_path: PathBuf,
    pub second_level: Option<(String, PathBuf)>,
}

/// Walks `root` and classifies every matching file. Blocking.
pub(crate) fn scan_workspace_blocking(
    root: &Path,
    layout: &TestLayout,
    globs: &GlobSet,
) -> Vec<ScannedFile> {
    let mut scanned = Vec::new();

    for path in fs::find_files(root, globs) {
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let segments = fs::path_segments(relative);
        if layout.is_excluded(&segments) {
            debug!(path = %path.display(), "excluded from discovery");
            continue;
        }
        let Some(position) = layout.dir_position(&segments) else {
            continue;
        };
        let Some(file_name) = segments.last().cloned() else {
            continue;
        };

        let first_level_relative: PathBuf = segments[..=position].iter().collect();
        let first_level_path = root.join(&first_level_relative);

        // Rails-style second level (test/models, test/controllers) only when it is a directory
        let second_level = segments.get(position + 1).and_then(|name| {
            let candidate = first_level_path.join(name);
            fs::is_directory(&candidate).then(|| (name.clone(), candidate))
        });

        scanned.push(ScannedFile {
            path,
            file_name,
            first_level_label: first_level_relative.display().to_string(),
            first_level_path,
            second_level,
        });
    }

    scanned
}

pub(crate) async fn scan_workspace(
    workspace: &Workspace,
    layout: &TestLayout,
) -> Result<Vec<ScannedFile>, DiscoveryError> {
    let globs = layout.globs()?;
    let root = workspace.root.clone();
    let layout = layout.clone();
    tokio::task::spawn_blocking(move || scan_workspace_blocking(&root, &layout, &globs))
        .await
        .map_err(|e| DiscoveryError::Walk {
            path: workspace.root.clone(),
            message: e.to_string(),
        })
}

/// Drops the files that belong to a workspace nested inside `workspace`.
fn owned_by(workspaces: &Workspaces, workspace: &Workspace, files: Vec<ScannedFile>) -> Vec<ScannedFile> {
    files
        .into_iter()
        .filter(|file| {
            workspaces
                .containing(&file.path)
                .is_none_or(|owner| owner.root == workspace.root)
        })
        .collect()
}

async fn has_test_files(workspace: &Workspace, layout: &TestLayout) -> Result<bool, DiscoveryError> {
    let globs = layout.globs()?;
    let root = workspace.root.clone();
    tokio::task::spawn_blocking(move || fs::has_matching_file(&root, &globs))
        .await
        .map_err(|e| DiscoveryError::Walk {
            path: workspace.root.clone(),
            message: e.to_string(),
        })
}

fn directory_node(path: &Path, label: impl Into<String>) -> TestNode {
    TestNode::new(
        NodeId::for_path(path),
        label,
        Location::new(path),
        NodeKind::Directory,
    )
    .with_capability(Capability::Debuggable)
}

/// Test files start out resolvable: their examples are loaded on demand.
pub(crate) fn file_node(path: &Path, label: impl Into<String>) -> TestNode {
    TestNode::new(NodeId::for_path(path), label, Location::new(path), NodeKind::File)
        .with_capability(Capability::Resolvable)
        .with_capability(Capability::Debuggable)
}

pub(crate) fn workspace_node(workspace: &Workspace, lazy: bool) -> TestNode {
    let node = TestNode::new(
        NodeId::for_path(&workspace.root),
        workspace.name.clone(),
        Location::new(&workspace.root),
        NodeKind::Workspace,
    )
    .with_capability(Capability::Debuggable);
    if lazy {
        node.with_capability(Capability::Resolvable)
    } else {
        node
    }
}

/// Inserts scanned files under `container`, creating each directory level
/// once and reusing it for every file that shares its prefix.
pub(crate) fn apply_scan(
    tree: &mut TestTree,
    layout: &TestLayout,
    files: &[ScannedFile],
    container: Option<&NodeId>,
) -> Result<usize, DiscoveryError> {
    for file in files {
        let first_id = NodeId::for_path(&file.first_level_path);
        if !tree.contains(&first_id) {
            tree.add(
                directory_node(&file.first_level_path, file.first_level_label.clone()),
                container,
            )?;
        }

        let mut parent = first_id;
        if let Some((name, path)) = &file.second_level {
            let second_id = NodeId::for_path(path);
            if !tree.contains(&second_id) {
                tree.add(directory_node(path, name.clone()), Some(&parent))?;
            }
            parent = second_id;
        }

        let file_id = NodeId::for_path(&file.path);
        tree.add(file_node(&file.path, file.file_name.clone()), Some(&parent))?;
        if let Some(command) = layout.file_command(&file.path) {
            tree.set_command(&file_id, command)?;
        }
    }
    Ok(files.len())
}

/// Builds the top level of the tree. A single workspace is attached
/// directly; with several, each workspace holding at least one test file
/// becomes a node of its own.
pub(crate) async fn resolve_top_level(
    tree: &mut TestTree,
    layout: &TestLayout,
    workspaces: &Workspaces,
    lazy: bool,
) -> Result<(), DiscoveryError> {
    tree.clear_children(None)?;

    if workspaces.len() == 1 {
        if let Some(workspace) = workspaces.iter().next() {
            let files = scan_workspace(workspace, layout).await?;
            apply_scan(tree, layout, &files, None)?;
        }
        return Ok(());
    }

    for workspace in workspaces.iter() {
        if !has_test_files(workspace, layout).await? {
            debug!(workspace = %workspace.name, "no test files, skipping");
            continue;
        }
        let node = workspace_node(workspace, lazy);
        let id = node.id.clone();
        tree.add(node, None)?;

        if !lazy {
            let files = owned_by(workspaces, workspace, scan_workspace(workspace, layout).await?);
            apply_scan(tree, layout, &files, Some(&id))?;
        }
    }
    Ok(())
}

/// Rebuilds the directory/file placeholders of one workspace node.
pub(crate) async fn resolve_workspace(
    tree: &mut TestTree,
    layout: &TestLayout,
    workspaces: &Workspaces,
    id: &NodeId,
) -> Result<(), DiscoveryError> {
    let root = tree
        .get(id)
        .map(|node| node.location.path.clone())
        .ok_or_else(|| crate::core::error::TreeError::NotFound(id.clone()))?;
    let Some(workspace) = workspaces.iter().find(|ws| ws.root == root) else {
        debug!(root = %root.display(), "workspace node without a configured workspace");
        return Ok(());
    };

    let files = owned_by(workspaces, workspace, scan_workspace(workspace, layout).await?);
    tree.clear_children(Some(id))?;
    apply_scan(tree, layout, &files, Some(id))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(path: &str) -> Vec<String> {
        path.split('/').map(str::to_string).collect()
    }

    #[test]
    fn test_default_pattern() {
        assert_eq!(
            TestLayout::default().pattern(),
            "**/{test,spec,features}/**/{*_test.rb,test_*.rb,*_spec.rb,*.feature}"
        );
    }

    #[test]
    fn test_dir_position_follows_root_priority() {
        let layout = TestLayout::default();
        assert_eq!(layout.dir_position(&segments("test/a_test.rb")), Some(0));
        assert_eq!(layout.dir_position(&segments("spec/test/a_spec.rb")), Some(1));
        assert_eq!(
            layout.dir_position(&segments("engines/billing/spec/x_spec.rb")),
            Some(2)
        );
        assert_eq!(layout.dir_position(&segments("features/login.feature")), Some(0));
        assert_eq!(layout.dir_position(&segments("lib/a.rb")), None);
    }

    #[test]
    fn test_is_excluded() {
        let layout = TestLayout::default();
        assert!(layout.is_excluded(&segments("test/test_helper.rb")));
        assert!(layout.is_excluded(&segments("test/fixtures/files/a_test.rb")));
        assert!(!layout.is_excluded(&segments("test/models/user_test.rb")));
    }

    #[test]
    fn test_command_templates() {
        let layout = TestLayout {
            file_command: Some("bin/rails test {file}".to_string()),
            example_command: Some("bin/rails test {file}:{line}".to_string()),
            ..TestLayout::default()
        };
        let file = Path::new("/w/test/my test.rb");
        let words = shlex::split(&layout.file_command(file).unwrap()).unwrap();
        assert_eq!(words, vec!["bin/rails", "test", "/w/test/my test.rb"]);

        let words = shlex::split(&layout.example_command(file, 4, "x", "y").unwrap()).unwrap();
        assert_eq!(words, vec!["bin/rails", "test", "/w/test/my test.rb:5"]);
        assert!(TestLayout::default().file_command(file).is_none());
    }
}
