//! # Infrastructure Module / 基础设施模块
//!
//! This module provides the external collaborators Testree talks to:
//! process execution, the indexing service, file system walking and logging.
//!
//! 此模块提供 Testree 所依赖的外部协作者：
//! 进程执行、索引服务、文件系统遍历和日志。

pub mod command;
pub mod fs;
pub mod indexer;
pub mod logging;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
