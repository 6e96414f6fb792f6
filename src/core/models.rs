//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures used throughout Testree.
//! It includes the test node model, run requests, per-node run results and
//! the workspaces tests are discovered in.
//!
//! 此模块定义了整个 Testree 中使用的核心数据结构。
//! 它包括测试节点模型、运行请求、单节点运行结果以及发现测试的工作区。

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Unique identifier of a node within the test tree.
/// 测试树中节点的唯一标识符。
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new node ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Node IDs for directories and files are derived from their path.
    pub fn for_path(path: &Path) -> Self {
        Self(path.display().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The position of a node in the hierarchy.
/// 节点在层级中的位置类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A workspace root, only present when more than one root contains tests.
    Workspace,
    /// A test directory grouping (first or second level).
    Directory,
    /// A test file.
    File,
    /// A group of examples inside a file (a class, a `describe` block).
    Group,
    /// A single executable example. Never has children.
    Example,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Workspace => "workspace",
            NodeKind::Directory => "directory",
            NodeKind::File => "file",
            NodeKind::Group => "group",
            NodeKind::Example => "example",
        }
    }
}

/// Capabilities a node can carry. These mirror the tags a host UI filters on.
/// 节点可以携带的能力，对应宿主 UI 用于过滤的标签。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Children are not loaded until the node is resolved.
    Resolvable,
    /// The node can be launched through the debug launcher.
    Debuggable,
    /// The node groups examples discovered inside a file.
    Group,
    /// The node is directly executable.
    Example,
}

/// A zero-based line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A line/column range inside a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Range spanning whole lines, columns set to zero.
    pub fn lines(start_line: u32, end_line: u32) -> Self {
        Self::new(Position::new(start_line, 0), Position::new(end_line, 0))
    }

    pub fn contains_line(&self, line: u32) -> bool {
        self.start.line <= line && line <= self.end.line
    }
}

/// Where a node lives on disk. Directories, workspaces and files carry no range.
/// 节点在磁盘上的位置。目录、工作区和文件不携带范围。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
}

impl Location {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            range: None,
        }
    }

    pub fn with_range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }
}

/// A node in the test hierarchy.
///
/// Children are owned exclusively by their parent and are only ever mutated
/// through the `TestTree`, which keeps the arena consistent.
///
/// 测试层级中的一个节点。子节点由父节点独占，只能通过 `TestTree` 修改。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestNode {
    pub id: NodeId,
    pub label: String,
    pub location: Location,
    pub kind: NodeKind,
    pub capabilities: BTreeSet<Capability>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) resolved: bool,
}

impl TestNode {
    pub fn new(
        id: impl Into<NodeId>,
        label: impl Into<String>,
        location: Location,
        kind: NodeKind,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            location,
            kind,
            capabilities: BTreeSet::new(),
            children: Vec::new(),
            resolved: false,
        }
    }

    /// Add a capability
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// A resolvable node that has not been resolved since its last invalidation.
    pub fn needs_resolution(&self) -> bool {
        self.has(Capability::Resolvable) && !self.resolved
    }
}

/// Whether a request runs tests or launches them under a debugger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Run,
    Debug,
}

/// A user request to run a set of nodes.
/// 用户运行一组节点的请求。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    /// Nodes to run, in the order they were selected. Empty means all roots.
    pub included: Vec<NodeId>,
    /// Nodes to skip, together with their subtrees.
    pub excluded: HashSet<NodeId>,
    pub mode: RunMode,
}

impl RunRequest {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn run_all() -> Self {
        Self::new(RunMode::Run)
    }

    pub fn include(mut self, id: impl Into<NodeId>) -> Self {
        self.included.push(id.into());
        self
    }

    pub fn exclude(mut self, id: impl Into<NodeId>) -> Self {
        self.excluded.insert(id.into());
        self
    }

    pub fn is_excluded(&self, id: &NodeId) -> bool {
        self.excluded.contains(id)
    }
}

/// The state of a node within a run.
/// 节点在一次运行中的状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Enqueued,
    Started,
    Passed,
    Failed,
    Errored,
    Skipped,
}

impl RunStatus {
    /// Terminal statuses end a node's participation in a run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Passed | RunStatus::Failed | RunStatus::Errored | RunStatus::Skipped
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RunStatus::Failed | RunStatus::Errored)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Enqueued => "enqueued",
            RunStatus::Started => "started",
            RunStatus::Passed => "passed",
            RunStatus::Failed => "failed",
            RunStatus::Errored => "errored",
            RunStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The transient outcome of a node within one run. Never persisted.
/// 节点在一次运行中的临时结果，不会被持久化。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
    /// Raw stdout of a passing process, attached as an output artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl RunResult {
    fn with_status(status: RunStatus) -> Self {
        Self {
            status,
            duration: None,
            messages: Vec::new(),
            output: None,
        }
    }

    pub fn enqueued() -> Self {
        Self::with_status(RunStatus::Enqueued)
    }

    pub fn started() -> Self {
        Self::with_status(RunStatus::Started)
    }

    pub fn skipped() -> Self {
        Self::with_status(RunStatus::Skipped)
    }

    pub fn passed(duration: Duration, output: Option<String>) -> Self {
        Self {
            duration: Some(duration),
            output,
            ..Self::with_status(RunStatus::Passed)
        }
    }

    pub fn failed(duration: Duration, messages: Vec<String>) -> Self {
        Self {
            duration: Some(duration),
            messages,
            ..Self::with_status(RunStatus::Failed)
        }
    }

    pub fn errored(duration: Option<Duration>, messages: Vec<String>) -> Self {
        Self {
            duration,
            messages,
            ..Self::with_status(RunStatus::Errored)
        }
    }

    pub fn duration_ms(&self) -> Option<u128> {
        self.duration.map(|d| d.as_millis())
    }
}

/// A status change for one node, streamed while a run progresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEvent {
    pub node: NodeId,
    pub label: String,
    pub result: RunResult,
}

/// A workspace root tests are discovered in and executed from.
/// 发现测试并在其中执行测试的工作区根目录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub name: String,
    pub root: PathBuf,
    /// Environment passed to every process spawned for this workspace.
    pub env: HashMap<String, String>,
}

impl Workspace {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            env: HashMap::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// The set of workspace roots open in a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workspaces(Vec<Workspace>);

impl Workspaces {
    pub fn new(workspaces: Vec<Workspace>) -> Self {
        Self(workspaces)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Workspace> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The innermost workspace whose root contains `path`.
    pub fn containing(&self, path: &Path) -> Option<&Workspace> {
        self.0
            .iter()
            .filter(|ws| path.starts_with(&ws.root))
            .max_by_key(|ws| ws.root.components().count())
    }
}
