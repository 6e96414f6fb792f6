//! # Core Module / 核心模块
//!
//! This module contains the core functionality of Testree: the test tree
//! store, the two discovery strategies, the output classifier and the run
//! orchestrator, tied together by a `TestSession`.
//!
//! 此模块包含 Testree 的核心功能：测试树存储、两种发现策略、
//! 输出分类器以及运行编排器，并由 `TestSession` 统一管理。

pub mod classifier;
pub mod config;
pub mod discovery;
pub mod error;
pub mod execution;
pub mod models;
pub mod planner;
pub mod session;
pub mod tree;

// Re-exports
pub use config::Config;
pub use execution::Orchestrator;
pub use models::{NodeId, RunRequest, RunResult, RunStatus, TestNode};
pub use session::TestSession;
pub use tree::TestTree;
