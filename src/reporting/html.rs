//! # HTML Reporting Module / HTML 报告模块
//!
//! Renders a run report as a single self-contained HTML file: summary
//! counters, one row per node outcome, and the failure output of every
//! failed or errored node in a collapsible block.
//!
//! 将运行报告渲染为单个独立的 HTML 文件：汇总计数、每个节点结果一行，
//! 以及每个失败或出错节点的可折叠输出。

use anyhow::{Context, Result};
use chrono::Local;
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::fs;
use std::path::Path;

use crate::core::execution::RunReport;
use crate::core::models::{RunStatus, TestNode};
use crate::core::tree::TestTree;
use crate::infra::t;

const HTML_STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 2rem; color: #24292f; }
h1 { margin-bottom: 0.25rem; }
.generated { color: #57606a; margin-bottom: 1.5rem; }
.summary-container { display: flex; gap: 1rem; margin-bottom: 1.5rem; }
.summary-item { border: 1px solid #d0d7de; border-radius: 6px; padding: 0.75rem 1.25rem; text-align: center; }
.summary-item .count { display: block; font-size: 1.6rem; font-weight: 600; }
.passed-text { color: #1a7f37; }
.failed-text { color: #cf222e; }
.skipped-text { color: #6e7781; }
.cancelled { color: #9a6700; font-weight: 600; }
table { border-collapse: collapse; width: 100%; }
th, td { border-bottom: 1px solid #d0d7de; padding: 0.4rem 0.6rem; text-align: left; vertical-align: top; }
.status-passed { color: #1a7f37; font-weight: 600; }
.status-failed, .status-errored { color: #cf222e; font-weight: 600; }
.status-skipped { color: #6e7781; }
.duration-cell { text-align: right; white-space: nowrap; }
pre.output-content { background: #f6f8fa; padding: 0.75rem; overflow-x: auto; }
"#;

fn status_label(status: RunStatus) -> String {
    match status {
        RunStatus::Enqueued => t!("status.enqueued"),
        RunStatus::Started => t!("status.started"),
        RunStatus::Passed => t!("status.passed"),
        RunStatus::Failed => t!("status.failed"),
        RunStatus::Errored => t!("status.errored"),
        RunStatus::Skipped => t!("status.skipped"),
    }
    .to_string()
}

/// Builds the report markup. Labels are taken from `tree`; nodes that have
/// since disappeared are shown by id.
pub fn render_html_report(report: &RunReport, tree: &TestTree) -> Markup {
    let counts = report.counts();
    let generated = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (t!("html_report.title")) }
                style { (PreEscaped(HTML_STYLE)) }
            }
            body {
                h1 { (t!("html_report.main_header")) }
                p.generated { (t!("html_report.generated_at", time = generated)) }
                @if report.cancelled {
                    p.cancelled { (t!("run.cancelled")) }
                }
                div.summary-container {
                    div.summary-item {
                        span.count { (report.results.len()) }
                        span.label { (t!("html_report.summary.total")) }
                    }
                    div.summary-item {
                        span.count.passed-text { (counts.passed) }
                        span.label { (t!("html_report.summary.passed")) }
                    }
                    div.summary-item {
                        span.count.failed-text { (counts.failed + counts.errored) }
                        span.label { (t!("html_report.summary.failed")) }
                    }
                    div.summary-item {
                        span.count.skipped-text { (counts.skipped) }
                        span.label { (t!("html_report.summary.skipped")) }
                    }
                }
                table {
                    thead {
                        tr {
                            th { (t!("html_report.table.header.name")) }
                            th { (t!("html_report.table.header.status")) }
                            th.duration-cell { (t!("html_report.table.header.duration")) }
                        }
                    }
                    tbody {
                        @for (id, result) in &report.results {
                            @let label = tree.get(id).map(|n: &TestNode| n.label.clone()).unwrap_or_else(|| id.to_string());
                            tr {
                                td title=(id.as_str()) { (label) }
                                td class={ "status-" (result.status.as_str()) } { (status_label(result.status)) }
                                td.duration-cell {
                                    @match result.duration {
                                        Some(d) => { (format!("{:.2}s", d.as_secs_f64())) }
                                        None => { "N/A" }
                                    }
                                }
                            }
                            @if result.status.is_failure() && !result.messages.is_empty() {
                                tr {
                                    td colspan="3" {
                                        details {
                                            summary { (t!("html_report.toggle_output")) }
                                            pre.output-content { (result.messages.join("\n\n")) }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Writes the report for `report` to `output_path`.
pub fn generate_html_report(report: &RunReport, tree: &TestTree, output_path: &Path) -> Result<()> {
    let markup = render_html_report(report, tree);
    fs::write(output_path, markup.into_string())
        .with_context(|| t!("html_report.write_failed", path = output_path.display()).to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Location, NodeId, NodeKind, RunResult};
    use std::time::Duration;

    #[test]
    fn test_report_escapes_output_and_lists_every_result() {
        let mut tree = TestTree::new();
        tree.add(
            TestNode::new("a", "test_a", Location::new("/w/test/a_test.rb"), NodeKind::Example),
            None,
        )
        .unwrap();

        let report = RunReport {
            results: vec![
                (
                    NodeId::from("a"),
                    RunResult::failed(Duration::from_millis(20), vec!["expected <1>".to_string()]),
                ),
                (NodeId::from("gone"), RunResult::skipped()),
            ],
            cancelled: false,
        };

        let html = render_html_report(&report, &tree).into_string();
        assert!(html.contains("test_a"));
        assert!(html.contains("gone"));
        assert!(html.contains("expected &lt;1&gt;"));
        assert!(html.contains("status-failed"));
    }
}
