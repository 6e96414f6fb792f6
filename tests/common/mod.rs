// Shared test helpers for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tokio_util::sync::CancellationToken;

use testree::config::Config;
use testree::core::error::{DiscoveryError, ExecError};
use testree::core::session::Collaborators;
use testree::classifier::SummaryLayoutClassifier;
use testree::infra::command::{DebugLauncher, ExecOutput, ProcessExecutor};
use testree::infra::indexer::{DiscoveredItem, Indexer};
use testree::models::{Workspace, Workspaces};

/// Creates a project containing `files` (relative paths), each with a
/// placeholder body.
pub fn project(files: &[&str]) -> TempDir {
    let dir = tempdir().expect("Failed to create temporary directory");
    add_files(dir.path(), files);
    dir
}

pub fn add_files(root: &Path, files: &[&str]) {
    for file in files {
        let path = root.join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create test directory");
        }
        fs::write(&path, "# test\n").expect("Failed to write test file");
    }
}

/// Canonical root, matching what `Config::workspaces` produces.
pub fn root(dir: &TempDir) -> PathBuf {
    fs::canonicalize(dir.path()).expect("Failed to canonicalize temp dir")
}

pub fn single_workspace(dir: &TempDir) -> Workspaces {
    Workspaces::new(vec![Workspace::new("app", root(dir))])
}

/// Glob discovery with `run <file>` as the file command.
pub fn glob_config() -> Config {
    Config {
        file_command: Some("run {file}".to_string()),
        ..Config::default()
    }
}

pub fn indexed_config() -> Config {
    Config {
        full_discovery: true,
        file_command: Some("run {file}".to_string()),
        example_command: Some("run {file}:{line}".to_string()),
        ..Config::default()
    }
}

/// Replies to commands containing a key with a scripted outcome and
/// records every call. Unscripted commands succeed with empty output.
#[derive(Default)]
pub struct FakeExecutor {
    replies: Vec<(String, Reply)>,
    pub calls: Mutex<Vec<String>>,
    /// Cancelled when the first command starts.
    pub cancel_on_first: Option<CancellationToken>,
}

#[derive(Clone)]
pub enum Reply {
    Pass(String),
    Fail { stdout: String, stderr: String },
    Timeout,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, key: &str, reply: Reply) -> Self {
        self.replies.push((key.to_string(), reply));
        self
    }

    pub fn cancelling(mut self, token: CancellationToken) -> Self {
        self.cancel_on_first = Some(token);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessExecutor for FakeExecutor {
    async fn execute(
        &self,
        command: &str,
        _cwd: &Path,
        _env: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<ExecOutput, ExecError> {
        self.calls.lock().unwrap().push(command.to_string());
        if let Some(token) = &self.cancel_on_first {
            token.cancel();
        }

        let reply = self
            .replies
            .iter()
            .find(|(key, _)| command.contains(key.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or(Reply::Pass(String::new()));
        match reply {
            Reply::Pass(stdout) => Ok(ExecOutput {
                stdout,
                stderr: String::new(),
            }),
            Reply::Fail { stdout, stderr } => Err(ExecError::NonZeroExit {
                code: Some(1),
                stdout,
                stderr,
            }),
            Reply::Timeout => Err(ExecError::Timeout { timeout }),
        }
    }
}

#[derive(Default)]
pub struct FakeLauncher {
    pub launches: Mutex<Vec<(String, HashMap<String, String>)>>,
}

#[async_trait]
impl DebugLauncher for FakeLauncher {
    async fn launch(
        &self,
        command: &str,
        _cwd: &Path,
        env: &HashMap<String, String>,
    ) -> Result<(), ExecError> {
        self.launches
            .lock()
            .unwrap()
            .push((command.to_string(), env.clone()));
        Ok(())
    }
}

/// Serves fixed items per file and counts calls.
#[derive(Default)]
pub struct FakeIndexer {
    pub items: HashMap<PathBuf, Vec<DiscoveredItem>>,
    pub ready_calls: AtomicUsize,
    pub discover_calls: AtomicUsize,
}

impl FakeIndexer {
    pub fn with_items(mut self, file: &Path, items: Vec<DiscoveredItem>) -> Self {
        self.items.insert(file.to_path_buf(), items);
        self
    }

    pub fn discover_calls(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Indexer for FakeIndexer {
    async fn wait_for_indexing(&self) -> Result<(), DiscoveryError> {
        self.ready_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn discover_tests(&self, file: &Path) -> Result<Vec<DiscoveredItem>, DiscoveryError> {
        assert!(
            self.ready_calls.load(Ordering::SeqCst) > 0,
            "discovery requested before the index was ready"
        );
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.items.get(file).cloned().unwrap_or_default())
    }
}

/// A class with two examples, as an indexer would report it for `file`.
pub fn class_with_examples(file: &Path, class: &str, examples: &[&str]) -> Vec<DiscoveredItem> {
    let uri = format!("file://{}", file.display());
    let children = examples
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let line = 2 + 4 * i as u32;
            DiscoveredItem::new(format!("{class}#{name}"), *name, uri.clone(), (line, line + 2))
        })
        .collect();
    vec![DiscoveredItem::new(class, class, uri, (0, 40)).with_children(children)]
}

pub fn collaborators(
    executor: Arc<FakeExecutor>,
    launcher: Arc<FakeLauncher>,
    indexer: Option<Arc<FakeIndexer>>,
) -> Collaborators {
    Collaborators {
        executor,
        launcher,
        indexer: indexer.map(|i| i as Arc<dyn Indexer>),
        classifier: Arc::new(SummaryLayoutClassifier),
    }
}

/// A Minitest-style failure report: blank first line, the `F` marker, and
/// enough lines around the summary for the positional slice.
pub fn minitest_failure(summary: &str) -> String {
    let mut lines = vec![String::new(), "Run options: --seed 1".to_string()];
    lines.extend((0..6).map(|i| format!("# header {i}")));
    lines.push("F".to_string());
    lines.push(String::new());
    lines.push(summary.to_string());
    lines.push("Finished in 0.01s".to_string());
    lines.push("1 runs, 1 assertions, 1 failures, 0 errors, 0 skips".to_string());
    lines.join("\n")
}
