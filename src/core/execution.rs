//! # Run Orchestrator Module / 运行编排模块
//!
//! Walks the tree for a `RunRequest` and drives the external test processes,
//! one at a time. Every status change is streamed as a `RunEvent`; the final
//! outcome of each node is collected into a `RunReport`.
//!
//! Cancellation is cooperative: the token is checked before each node is
//! popped. A process that is already running is left to finish (or time out).
//!
//! 为 `RunRequest` 遍历测试树并逐个驱动外部测试进程。每次状态变化都会作为
//! `RunEvent` 流式发送；每个节点的最终结果收集在 `RunReport` 中。
//! 取消是协作式的：在弹出每个节点之前检查令牌，已在运行的进程不会被中断。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::classifier::{FailureKind, OutputClassifier};
use crate::core::error::ExecError;
use crate::core::models::{NodeId, RunEvent, RunRequest, RunResult, RunStatus, Workspaces};
use crate::core::planner::ExecutionQueue;
use crate::core::tree::TestTree;
use crate::infra::command::{DebugLauncher, ProcessExecutor};
use crate::infra::t;

/// Terminal outcomes of one run, in the order they were reached.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub results: Vec<(NodeId, RunResult)>,
    /// The run stopped because cancellation was requested.
    pub cancelled: bool,
}

/// Per-status totals of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub skipped: usize,
}

impl RunReport {
    pub fn status_of(&self, id: &NodeId) -> Option<RunStatus> {
        self.results
            .iter()
            .rev()
            .find(|(node, _)| node == id)
            .map(|(_, result)| result.status)
    }

    pub fn counts(&self) -> RunCounts {
        let mut counts = RunCounts::default();
        for (_, result) in &self.results {
            match result.status {
                RunStatus::Passed => counts.passed += 1,
                RunStatus::Failed => counts.failed += 1,
                RunStatus::Errored => counts.errored += 1,
                RunStatus::Skipped => counts.skipped += 1,
                RunStatus::Enqueued | RunStatus::Started => {}
            }
        }
        counts
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|(_, r)| r.status.is_failure())
    }
}

pub struct Orchestrator {
    executor: Arc<dyn ProcessExecutor>,
    launcher: Arc<dyn DebugLauncher>,
    classifier: Arc<dyn OutputClassifier>,
    timeout: Duration,
    debug_env: HashMap<String, String>,
}

impl Orchestrator {
    pub fn new(
        executor: Arc<dyn ProcessExecutor>,
        launcher: Arc<dyn DebugLauncher>,
        classifier: Arc<dyn OutputClassifier>,
        timeout: Duration,
    ) -> Self {
        Self {
            executor,
            launcher,
            classifier,
            timeout,
            debug_env: HashMap::new(),
        }
    }

    /// Extra environment merged over the workspace environment for debug launches.
    pub fn with_debug_env(mut self, env: HashMap<String, String>) -> Self {
        self.debug_env = env;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `request` against `tree` until the queue drains or `cancel` fires.
    pub async fn run(
        &self,
        tree: &TestTree,
        workspaces: &Workspaces,
        request: &RunRequest,
        cancel: &CancellationToken,
        events: &UnboundedSender<RunEvent>,
    ) -> RunReport {
        let mut queue = ExecutionQueue::plan(tree, request);
        let mut report = RunReport::default();

        for id in queue.pending() {
            emit(events, tree, id, RunResult::enqueued());
        }

        loop {
            if cancel.is_cancelled() {
                info!(pending = queue.len(), "run cancelled");
                report.cancelled = true;
                break;
            }
            let Some(id) = queue.pop() else {
                break;
            };
            let Some(node) = tree.get(&id) else {
                continue;
            };

            if request.is_excluded(&id) {
                self.finish(&mut report, events, tree, &id, RunResult::skipped());
                continue;
            }
            emit(events, tree, &id, RunResult::started());

            if tree.is_executable(&id) {
                let result = match workspaces.containing(&node.location.path) {
                    Some(workspace) => {
                        // is_executable guarantees a command
                        let command = tree.command(&id).unwrap_or_default();
                        self.execute(command, &workspace.root, &workspace.env).await
                    }
                    None => RunResult::errored(None, vec![t!("run.no_workspace").to_string()]),
                };
                self.finish(&mut report, events, tree, &id, result);
                continue;
            }

            let children = node.children();
            if children.is_empty() {
                debug!(node = %id, "nothing to run");
                self.finish(&mut report, events, tree, &id, RunResult::skipped());
                continue;
            }
            for child in children {
                emit(events, tree, child, RunResult::enqueued());
            }
            queue.extend(children.iter().cloned());
        }

        report
    }

    /// Runs one command and turns its outcome into a terminal result.
    async fn execute(
        &self,
        command: &str,
        cwd: &std::path::Path,
        env: &HashMap<String, String>,
    ) -> RunResult {
        let start = Instant::now();
        let outcome = self.executor.execute(command, cwd, env, self.timeout).await;
        let duration = start.elapsed();

        match outcome {
            Ok(output) => RunResult::passed(duration, Some(output.stdout)),
            Err(ExecError::Timeout { timeout }) => RunResult::errored(
                Some(duration),
                vec![t!("run.timed_out", timeout = timeout.as_secs()).to_string()],
            ),
            Err(ExecError::NonZeroExit { stdout, stderr, .. }) => {
                let raw = if stdout.trim().is_empty() { stderr } else { stdout };
                let classification = self.classifier.classify(&raw);
                let messages = vec![raw, classification.summary];
                match classification.kind {
                    FailureKind::Failed => RunResult::failed(duration, messages),
                    FailureKind::Errored => RunResult::errored(Some(duration), messages),
                }
            }
            Err(other) => RunResult::errored(Some(duration), vec![other.to_string()]),
        }
    }

    /// Launches exactly one node under the debugger. No queue, no timeout.
    pub async fn debug(&self, tree: &TestTree, workspaces: &Workspaces, id: &NodeId) -> RunResult {
        let Some(node) = tree.get(id) else {
            return RunResult::errored(None, vec![t!("run.unknown_node", id = id).to_string()]);
        };
        let Some(command) = tree.command(id) else {
            return RunResult::errored(None, vec![t!("run.not_runnable", id = id).to_string()]);
        };
        let Some(workspace) = workspaces.containing(&node.location.path) else {
            return RunResult::errored(None, vec![t!("run.no_workspace").to_string()]);
        };

        let mut env = workspace.env.clone();
        env.extend(self.debug_env.iter().map(|(k, v)| (k.clone(), v.clone())));

        let start = Instant::now();
        match self.launcher.launch(command, &workspace.root, &env).await {
            Ok(()) => RunResult::passed(start.elapsed(), None),
            Err(e) => RunResult::errored(Some(start.elapsed()), vec![e.to_string()]),
        }
    }

    fn finish(
        &self,
        report: &mut RunReport,
        events: &UnboundedSender<RunEvent>,
        tree: &TestTree,
        id: &NodeId,
        result: RunResult,
    ) {
        emit(events, tree, id, result.clone());
        report.results.push((id.clone(), result));
    }
}

fn emit(events: &UnboundedSender<RunEvent>, tree: &TestTree, id: &NodeId, result: RunResult) {
    let label = tree
        .get(id)
        .map(|n| n.label.clone())
        .unwrap_or_else(|| id.to_string());
    // A dropped receiver only means nobody is watching.
    let _ = events.send(RunEvent {
        node: id.clone(),
        label,
        result,
    });
}
