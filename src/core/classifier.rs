//! # Output Classifier Module / 输出分类模块
//!
//! Turns the captured text of a failed test process into a failure kind and
//! a trimmed diagnostic summary. Classifiers are strategies behind the
//! `OutputClassifier` trait so another framework layout can be supported
//! without touching the orchestrator.
//!
//! 将失败测试进程的输出文本转换为失败类型和精简的诊断摘要。
//! 分类器是 `OutputClassifier` trait 背后的策略，新增框架格式时无需修改编排器。

use serde::{Deserialize, Serialize};

/// Whether a failing process hit an assertion or crashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// An assertion failed.
    Failed,
    /// An unexpected exception or crash.
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: FailureKind,
    pub summary: String,
}

pub trait OutputClassifier: Send + Sync {
    fn classify(&self, raw: &str) -> Classification;
}

/// Lines dropped from the head and tail of a Minitest report, which opens with a blank line.
const MINITEST_SLICE: (usize, usize) = (10, 2);
/// Lines dropped from the head and tail of a test-unit report.
const TEST_UNIT_SLICE: (usize, usize) = (4, 9);
/// The progress marker both frameworks print for an assertion failure.
const FAILURE_MARKER: &str = "F";

/// Positional classifier for the Minitest and test-unit summary layouts.
///
/// The offsets are tuned to those two formats only. Output that is too short
/// to slice falls back to the whole text as the summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryLayoutClassifier;

impl OutputClassifier for SummaryLayoutClassifier {
    fn classify(&self, raw: &str) -> Classification {
        let lines: Vec<&str> = raw.split('\n').map(|l| l.trim_end_matches('\r')).collect();

        let (head, tail) = if lines.first().is_some_and(|l| l.is_empty()) {
            MINITEST_SLICE
        } else {
            TEST_UNIT_SLICE
        };
        let end = lines.len().saturating_sub(tail);
        let summary = if head < end {
            lines[head..end].join("\n")
        } else {
            raw.trim().to_string()
        };

        let kind = if lines.iter().any(|l| *l == FAILURE_MARKER) {
            FailureKind::Failed
        } else {
            FailureKind::Errored
        };

        Classification { kind, summary }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(prefix: &str, count: usize) -> Vec<String> {
        (0..count).map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn test_minitest_layout_with_failure_marker_is_failed() {
        let mut lines = vec![String::new()];
        lines.extend(numbered("head", 8));
        lines.push("F".to_string());
        lines.extend(numbered("body", 3));
        lines.extend(numbered("tail", 2));
        let raw = lines.join("\n");

        let result = SummaryLayoutClassifier.classify(&raw);
        assert_eq!(result.kind, FailureKind::Failed);
        assert_eq!(result.summary, "body0\nbody1\nbody2");
    }

    #[test]
    fn test_test_unit_layout_without_marker_is_errored() {
        let mut lines = numbered("head", 4);
        lines.extend(numbered("body", 2));
        lines.extend(numbered("tail", 9));
        let raw = lines.join("\n");

        let result = SummaryLayoutClassifier.classify(&raw);
        assert_eq!(result.kind, FailureKind::Errored);
        assert_eq!(result.summary, "body0\nbody1");
    }

    #[test]
    fn test_marker_must_match_the_whole_line() {
        let raw = "Run options\nFF.\nFailure: F is not a marker here";
        let result = SummaryLayoutClassifier.classify(raw);
        assert_eq!(result.kind, FailureKind::Errored);
    }

    #[test]
    fn test_carriage_returns_do_not_hide_the_marker() {
        let raw = "\r\nline\r\nF\r\nmore\r\n";
        assert_eq!(SummaryLayoutClassifier.classify(raw).kind, FailureKind::Failed);
    }

    #[test]
    fn test_short_output_falls_back_to_the_raw_text() {
        let raw = "boom\nsomething crashed\n";
        let result = SummaryLayoutClassifier.classify(raw);
        assert_eq!(result.kind, FailureKind::Errored);
        assert_eq!(result.summary, "boom\nsomething crashed");
    }

    #[test]
    fn test_empty_output() {
        let result = SummaryLayoutClassifier.classify("");
        assert_eq!(result.kind, FailureKind::Errored);
        assert_eq!(result.summary, "");
    }
}
