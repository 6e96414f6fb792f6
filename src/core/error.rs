//! Error types for the tree store, discovery, configuration and process execution.
//!
//! Run-time failures of individual nodes never surface as these errors: the
//! orchestrator turns them into `errored` or `failed` results instead.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::core::models::NodeId;

/// Errors raised by the test tree store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("No test node with id '{0}'")]
    NotFound(NodeId),

    /// Examples are leaves
    #[error("Example '{0}' cannot have children")]
    ExampleCannotHaveChildren(NodeId),

    #[error("Parent '{0}' does not exist")]
    UnknownParent(NodeId),
}

/// Errors raised while discovering tests
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// The indexing collaborator failed or returned malformed data
    #[error("Indexer failed: {0}")]
    Indexer(String),

    #[error("Failed to walk {path}: {message}")]
    Walk { path: PathBuf, message: String },

    /// Full discovery was selected but no indexer is configured
    #[error("Full test discovery requires an indexer")]
    NoIndexer,
}

/// Errors raised by the process execution collaborator
#[derive(Error, Debug)]
pub enum ExecError {
    /// The process exceeded its time limit and was terminated
    #[error("Process timed out after {}s", timeout.as_secs())]
    Timeout { timeout: Duration },

    #[error("Process exited with {}", code.map(|c| c.to_string()).unwrap_or_else(|| "a signal".to_string()))]
    NonZeroExit {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Failed to spawn process: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Empty command")]
    EmptyCommand,
}

/// Invalid configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Workspace root {path} does not exist")]
    MissingWorkspace { path: PathBuf },

    #[error("Failed to expand path '{path}': {message}")]
    Expand { path: String, message: String },
}
