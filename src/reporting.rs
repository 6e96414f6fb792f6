//! # Reporting Module / 报告模块
//!
//! This module renders test trees and run reports, either as colorful console
//! output or as a standalone HTML file.
//!
//! 此模块渲染测试树和运行报告，输出为彩色控制台文本或独立的 HTML 文件。

pub mod console;
pub mod html;

// Re-export common reporting functions
pub use console::{print_event, print_summary, print_tree};
pub use html::generate_html_report;
