//! # Console Reporting Module / 控制台报告模块
//!
//! Colorful console rendering of the test tree, of run events as they stream
//! in, and of the final summary of a run.
//!
//! 以彩色控制台文本渲染测试树、流式到达的运行事件以及运行的最终摘要。

use colored::*;

use crate::core::execution::RunReport;
use crate::core::models::{NodeKind, RunEvent, RunResult, RunStatus};
use crate::core::tree::TestTree;
use crate::infra::t;

/// Prints the tree, indented by depth.
///
/// ```text
/// test
///   models
///     user_test.rb
///       UserTest
///         test_name  [runnable]
/// ```
pub fn print_tree(tree: &TestTree) {
    if tree.is_empty() {
        println!("{}", t!("discover.empty").yellow());
        return;
    }

    for (depth, node) in tree.walk() {
        let indent = "  ".repeat(depth);
        let label = match node.kind {
            NodeKind::Workspace => node.label.bold().cyan(),
            NodeKind::Directory => node.label.blue(),
            NodeKind::File => node.label.normal(),
            NodeKind::Group => node.label.yellow(),
            NodeKind::Example => node.label.green(),
        };
        let mut markers = Vec::new();
        if tree.is_executable(&node.id) {
            markers.push(t!("discover.runnable").to_string());
        }
        if node.needs_resolution() {
            markers.push(t!("discover.unresolved").to_string());
        }

        if markers.is_empty() {
            println!("{indent}{label}");
        } else {
            println!("{indent}{label}  {}", format!("[{}]", markers.join(", ")).dimmed());
        }
    }
}

fn status_text(status: RunStatus) -> ColoredString {
    match status {
        RunStatus::Enqueued => t!("status.enqueued").blue(),
        RunStatus::Started => t!("status.started").blue(),
        RunStatus::Passed => t!("status.passed").green(),
        RunStatus::Failed => t!("status.failed").red(),
        RunStatus::Errored => t!("status.errored").red().bold(),
        RunStatus::Skipped => t!("status.skipped").dimmed(),
    }
}

fn duration_text(result: &RunResult) -> String {
    result
        .duration
        .map(|d| format!("{:.2}s", d.as_secs_f64()))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Prints one streamed status change. Enqueued events are only shown in verbose mode.
pub fn print_event(event: &RunEvent, verbose: bool) {
    match event.result.status {
        RunStatus::Enqueued if !verbose => {}
        RunStatus::Started => {
            println!("{} {}", status_text(event.result.status), event.label);
        }
        RunStatus::Enqueued | RunStatus::Skipped => {
            println!("  - {:<10} {}", status_text(event.result.status), event.label.dimmed());
        }
        _ => {
            println!(
                "  - {:<10} {:<40} {:>8}",
                status_text(event.result.status),
                event.label,
                duration_text(&event.result)
            );
            if event.result.status.is_failure() {
                if let Some(summary) = event.result.messages.last() {
                    println!("{}", terminal_output(summary.trim_end()));
                }
            }
        }
    }
}

/// Prints the totals of a run and whether it was cancelled.
pub fn print_summary(report: &RunReport) {
    let counts = report.counts();
    println!("\n{}", t!("run.summary_banner").bold());
    println!(
        "  {}  {}  {}  {}",
        t!("run.summary_passed", count = counts.passed).green(),
        t!("run.summary_failed", count = counts.failed).red(),
        t!("run.summary_errored", count = counts.errored).red(),
        t!("run.summary_skipped", count = counts.skipped).dimmed(),
    );
    if report.cancelled {
        println!("{}", t!("run.cancelled").yellow());
    }
}

/// Converts bare `\n` line endings to `\r\n`, which terminal emulators in
/// raw mode need to return to the first column.
pub fn terminal_output(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous = None;
    for c in text.chars() {
        if c == '\n' && previous != Some('\r') {
            out.push('\r');
        }
        out.push(c);
        previous = Some(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_output_normalizes_line_endings() {
        assert_eq!(terminal_output("a\nb\r\nc\n"), "a\r\nb\r\nc\r\n");
        assert_eq!(terminal_output(""), "");
    }
}
