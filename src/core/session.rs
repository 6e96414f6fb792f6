//! # Test Session Module / 测试会话模块
//!
//! A `TestSession` owns the tree of one set of workspaces and is the entry
//! point a host drives: initial discovery, expand gestures, save events,
//! code lens batches and run/debug requests.
//!
//! The discovery strategy is chosen once, when the session is built. All
//! tree mutations go through `&mut self`, so refreshes of the same subtree
//! can never interleave.
//!
//! `TestSession` 拥有一组工作区的测试树，是宿主驱动的入口：初始发现、展开、
//! 保存事件、代码透镜批次以及运行/调试请求。发现策略在构建会话时一次性选定。

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::classifier::{OutputClassifier, SummaryLayoutClassifier};
use crate::core::config::Config;
use crate::core::discovery::lens::{self, CodeLens, LensIngest};
use crate::core::discovery::{
    Discoverer, DiscoveryMode, GlobDiscoverer, IndexedDiscoverer, TestLayout,
};
use crate::core::error::{DiscoveryError, TreeError};
use crate::core::execution::{Orchestrator, RunReport};
use crate::core::models::{NodeId, RunEvent, RunMode, RunRequest, RunResult, Workspaces};
use crate::core::tree::TestTree;
use crate::infra::command::{DebugLauncher, ProcessExecutor, ShellDebugLauncher, ShellExecutor};
use crate::infra::indexer::{CommandIndexer, Indexer};

/// The external services a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub executor: Arc<dyn ProcessExecutor>,
    pub launcher: Arc<dyn DebugLauncher>,
    pub indexer: Option<Arc<dyn Indexer>>,
    pub classifier: Arc<dyn OutputClassifier>,
}

impl Collaborators {
    /// Shell-backed collaborators. The indexer runs from the first workspace
    /// root when `[indexer]` is configured.
    pub fn from_config(config: &Config, workspaces: &Workspaces) -> Self {
        let executor: Arc<dyn ProcessExecutor> = Arc::new(ShellExecutor);
        let indexer = config.indexer.as_ref().and_then(|cfg| {
            let workspace = workspaces.iter().next()?;
            let indexer = CommandIndexer::new(
                cfg.command.clone(),
                cfg.ready_command.clone(),
                workspace.root.clone(),
                executor.clone(),
            )
            .with_env(workspace.env.clone());
            Some(Arc::new(indexer) as Arc<dyn Indexer>)
        });

        Self {
            executor,
            launcher: Arc::new(ShellDebugLauncher),
            indexer,
            classifier: Arc::new(SummaryLayoutClassifier),
        }
    }
}

pub struct TestSession {
    tree: TestTree,
    workspaces: Workspaces,
    layout: TestLayout,
    discoverer: Box<dyn Discoverer>,
    orchestrator: Orchestrator,
}

impl TestSession {
    /// Builds a session. Full discovery needs an indexer.
    pub fn new(
        config: &Config,
        workspaces: Workspaces,
        collaborators: Collaborators,
    ) -> Result<Self, DiscoveryError> {
        let layout = config.layout();
        let discoverer: Box<dyn Discoverer> = if config.full_discovery {
            let indexer = collaborators.indexer.ok_or(DiscoveryError::NoIndexer)?;
            Box::new(IndexedDiscoverer::new(layout.clone(), workspaces.clone(), indexer))
        } else {
            Box::new(GlobDiscoverer::new(layout.clone(), workspaces.clone()))
        };

        let orchestrator = Orchestrator::new(
            collaborators.executor,
            collaborators.launcher,
            collaborators.classifier,
            config.timeout(),
        )
        .with_debug_env(config.debug_env.clone());

        Ok(Self {
            tree: TestTree::new(),
            workspaces,
            layout,
            discoverer,
            orchestrator,
        })
    }

    pub fn tree(&self) -> &TestTree {
        &self.tree
    }

    pub fn workspaces(&self) -> &Workspaces {
        &self.workspaces
    }

    pub fn layout(&self) -> &TestLayout {
        &self.layout
    }

    pub fn mode(&self) -> DiscoveryMode {
        self.discoverer.mode()
    }

    /// Builds the top level of the tree, replacing whatever was there.
    pub async fn init(&mut self) -> Result<(), DiscoveryError> {
        self.discoverer.resolve(&mut self.tree, None).await?;
        info!(mode = ?self.mode(), nodes = self.tree.len(), "test tree initialized");
        Ok(())
    }

    /// Drops the whole tree.
    pub fn dispose(&mut self) {
        self.tree.clear();
    }

    /// Loads the children of `id` if it has not been resolved yet.
    pub async fn expand(&mut self, id: &NodeId) -> Result<(), DiscoveryError> {
        let node = self
            .tree
            .get(id)
            .ok_or_else(|| TreeError::NotFound(id.clone()))?;
        if !node.needs_resolution() {
            return Ok(());
        }
        self.discoverer.resolve(&mut self.tree, Some(id)).await?;
        self.tree.set_resolved(id, true)?;
        Ok(())
    }

    /// Resolves every resolvable node, including the ones that appear while
    /// resolving. A failing subtree is logged and left unresolved.
    pub async fn expand_all(&mut self) -> Result<usize, DiscoveryError> {
        let mut attempted: HashSet<NodeId> = HashSet::new();
        let mut resolved = 0;

        loop {
            let pending: Vec<NodeId> = self
                .tree
                .walk()
                .into_iter()
                .filter(|(_, node)| node.needs_resolution() && !attempted.contains(&node.id))
                .map(|(_, node)| node.id.clone())
                .collect();
            if pending.is_empty() {
                break;
            }

            for id in pending {
                attempted.insert(id.clone());
                if !self.tree.contains(&id) {
                    continue;
                }
                match self.expand(&id).await {
                    Ok(()) => resolved += 1,
                    Err(e) => warn!(node = %id, error = %e, "failed to resolve"),
                }
            }
        }
        Ok(resolved)
    }

    /// Re-discovers a saved file whose examples were already loaded.
    /// Returns whether anything was refreshed.
    pub async fn on_save(&mut self, file: &Path) -> Result<bool, DiscoveryError> {
        if self.mode() != DiscoveryMode::Indexed {
            return Ok(false);
        }
        let Some(id) = self
            .tree
            .find_file(file)
            .filter(|node| node.is_resolved())
            .map(|node| node.id.clone())
        else {
            debug!(file = %file.display(), "saved file is not resolved, ignoring");
            return Ok(false);
        };

        self.tree.clear_children(Some(&id))?;
        self.tree.set_resolved(&id, false)?;
        self.discoverer.resolve(&mut self.tree, Some(&id)).await?;
        self.tree.set_resolved(&id, true)?;
        Ok(true)
    }

    /// Applies a code lens batch for `file`. Lenses only feed glob discovery;
    /// full discovery ignores them.
    pub fn ingest_code_lenses(
        &mut self,
        file: &Path,
        lenses: &[CodeLens],
    ) -> Result<LensIngest, TreeError> {
        if self.mode() == DiscoveryMode::Indexed {
            debug!(file = %file.display(), "ignoring code lenses in full discovery mode");
            return Ok(LensIngest::default());
        }
        lens::ingest_code_lenses(&mut self.tree, file, lenses)
    }

    /// Runs `request`. In debug mode only its first included node is launched.
    pub async fn run(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
        events: &UnboundedSender<RunEvent>,
    ) -> RunReport {
        if request.mode == RunMode::Debug {
            let mut report = RunReport::default();
            if let Some(id) = request.included.first() {
                let result = self.debug(id).await;
                let label = self
                    .tree
                    .get(id)
                    .map(|n| n.label.clone())
                    .unwrap_or_else(|| id.to_string());
                let _ = events.send(RunEvent {
                    node: id.clone(),
                    label,
                    result: result.clone(),
                });
                report.results.push((id.clone(), result));
            }
            return report;
        }

        self.orchestrator
            .run(&self.tree, &self.workspaces, request, cancel, events)
            .await
    }

    pub async fn debug(&self, id: &NodeId) -> RunResult {
        self.orchestrator.debug(&self.tree, &self.workspaces, id).await
    }

    /// Runs the node with `id`, or the node under the cursor when the id is
    /// unknown. `active` is a file and zero-based line. Returns `None` when
    /// neither names a node.
    pub async fn run_by_id(
        &self,
        id: &NodeId,
        active: Option<(&Path, u32)>,
        cancel: &CancellationToken,
        events: &UnboundedSender<RunEvent>,
    ) -> Option<RunReport> {
        let target = if self.tree.contains(id) {
            id.clone()
        } else {
            let (file, line) = active?;
            self.tree.find_by_location(file, line)?.id.clone()
        };
        let request = RunRequest::run_all().include(target);
        Some(self.run(&request, cancel, events).await)
    }

    /// The command of the innermost node at `file:line`, falling back to its
    /// ancestors and then to the file itself.
    pub fn command_at(&self, file: &Path, line: u32) -> Option<&str> {
        let mut current = self.tree.find_by_location(file, line).map(|n| n.id.clone());
        while let Some(id) = current {
            if let Some(command) = self.tree.command(&id) {
                return Some(command);
            }
            current = self.tree.parent_of(&id).cloned();
        }
        let file_node = self.tree.find_file(file)?;
        self.tree.command(&file_node.id)
    }
}
