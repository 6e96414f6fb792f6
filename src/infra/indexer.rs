//! # Indexer Module / 索引器模块
//!
//! The indexing collaborator used by full discovery. It must report ready
//! before any discovery result is trusted, then returns the structured test
//! items of a single file.
//!
//! 完整发现模式使用的索引协作者。在信任任何发现结果之前，它必须先报告就绪，
//! 然后返回单个文件的结构化测试项。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::core::error::{DiscoveryError, ExecError};
use crate::core::models::{Position, Range};
use crate::infra::command::ProcessExecutor;

/// Upper bound for a single indexer invocation.
const INDEXER_TIMEOUT: Duration = Duration::from_secs(120);

/// A test item as reported by the indexer. Items nest arbitrarily deep.
/// 索引器报告的测试项，可以任意深度嵌套。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredItem {
    pub id: String,
    pub label: String,
    pub uri: String,
    pub range: Range,
    #[serde(default)]
    pub children: Vec<DiscoveredItem>,
    /// Command that runs this item, when the indexer knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl DiscoveredItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>, uri: impl Into<String>, lines: (u32, u32)) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            uri: uri.into(),
            range: Range::new(Position::new(lines.0, 0), Position::new(lines.1, 0)),
            children: Vec::new(),
            command: None,
        }
    }

    pub fn with_children(mut self, children: Vec<DiscoveredItem>) -> Self {
        self.children = children;
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }
}

#[async_trait]
pub trait Indexer: Send + Sync {
    /// Blocks until the index is ready.
    async fn wait_for_indexing(&self) -> Result<(), DiscoveryError>;

    /// Discovers the tests of one file. May be empty.
    async fn discover_tests(&self, file: &Path) -> Result<Vec<DiscoveredItem>, DiscoveryError>;
}

/// An indexer backed by external commands: `ready_command` runs once per
/// session, `command <file>` prints a JSON array of `DiscoveredItem`s.
pub struct CommandIndexer {
    command: String,
    ready_command: Option<String>,
    cwd: PathBuf,
    env: HashMap<String, String>,
    executor: Arc<dyn ProcessExecutor>,
    ready: OnceCell<()>,
}

impl CommandIndexer {
    pub fn new(
        command: impl Into<String>,
        ready_command: Option<String>,
        cwd: impl Into<PathBuf>,
        executor: Arc<dyn ProcessExecutor>,
    ) -> Self {
        Self {
            command: command.into(),
            ready_command,
            cwd: cwd.into(),
            env: HashMap::new(),
            executor,
            ready: OnceCell::new(),
        }
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    async fn exec(&self, command: &str) -> Result<String, DiscoveryError> {
        self.executor
            .execute(command, &self.cwd, &self.env, INDEXER_TIMEOUT)
            .await
            .map(|out| out.stdout)
            .map_err(|e| match e {
                ExecError::NonZeroExit { stderr, code, .. } => DiscoveryError::Indexer(format!(
                    "`{command}` exited with {code:?}: {}",
                    stderr.trim()
                )),
                other => DiscoveryError::Indexer(format!("`{command}`: {other}")),
            })
    }
}

#[async_trait]
impl Indexer for CommandIndexer {
    async fn wait_for_indexing(&self) -> Result<(), DiscoveryError> {
        self.ready
            .get_or_try_init(|| async {
                if let Some(ready) = &self.ready_command {
                    debug!(command = %ready, "waiting for indexing");
                    self.exec(ready).await?;
                }
                Ok::<(), DiscoveryError>(())
            })
            .await?;
        Ok(())
    }

    async fn discover_tests(&self, file: &Path) -> Result<Vec<DiscoveredItem>, DiscoveryError> {
        let path = file.to_string_lossy();
        let quoted = shlex::try_quote(&path)
            .map_err(|e| DiscoveryError::Indexer(format!("cannot quote {path}: {e}")))?;
        let stdout = self.exec(&format!("{} {}", self.command, quoted)).await?;

        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&stdout)
            .map_err(|e| DiscoveryError::Indexer(format!("malformed discovery output: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovered_items_deserialize_with_defaults() {
        let json = r#"[{
            "id": "UserTest",
            "label": "UserTest",
            "uri": "file:///w/test/user_test.rb",
            "range": {"start": {"line": 0, "column": 0}, "end": {"line": 9, "column": 3}},
            "children": [{
                "id": "UserTest#test_name",
                "label": "test_name",
                "uri": "file:///w/test/user_test.rb",
                "range": {"start": {"line": 2, "column": 2}, "end": {"line": 4, "column": 5}}
            }]
        }]"#;

        let items: Vec<DiscoveredItem> = serde_json::from_str(json).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].children.len(), 1);
        assert!(items[0].children[0].children.is_empty());
        assert!(items[0].children[0].command.is_none());
        assert_eq!(items[0].children[0].range.start.line, 2);
    }
}
