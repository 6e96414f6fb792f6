//! # Testree Library / Testree 库
//!
//! This library maintains a hierarchical model of the tests discovered in a
//! workspace and orchestrates their execution as external processes.
//!
//! 此库维护在工作区中发现的测试的层级模型，
//! 并将这些测试作为外部进程进行编排执行。
//!
//! ## Modules / 模块
//!
//! - `core` - Test tree, discovery strategies, output classification and the run orchestrator
//! - `infra` - Collaborators: process execution, indexing, file system walking and logging
//! - `reporting` - Console and HTML rendering of trees and run reports
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 测试树、发现策略、输出分类和运行编排器
//! - `infra` - 协作者：进程执行、索引、文件系统遍历和日志
//! - `reporting` - 测试树与运行报告的控制台和 HTML 渲染
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use crate::core::classifier;
pub use crate::core::config;
pub use crate::core::execution;
pub use crate::core::models;
pub use crate::core::session;
pub use crate::core::tree;

/// Picks the message language from the system locale.
///
/// `zh-CN` is used as is when translated, `de-AT` falls back to `de` and then
/// to English. A `--lang` flag or the configured `language` may override it later.
pub fn init() {
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    set_language(&locale);
}

/// Sets the message language, trying the full locale, then its language code, then "en".
pub fn set_language(locale: &str) {
    let available = rust_i18n::available_locales!();
    let lang = if available.contains(&locale) {
        locale
    } else {
        locale
            .split('-')
            .next()
            .filter(|code| available.contains(code))
            .unwrap_or("en")
    };
    rust_i18n::set_locale(lang);
}

// Messages live in locales/*.yml
rust_i18n::i18n!("locales", fallback = "en");
