//! # Run Command Module / 运行命令模块
//!
//! Discovers the tree, runs the selected nodes and streams their status to
//! the console. Ctrl-C stops scheduling further nodes; the one already
//! running is allowed to finish.
//!
//! 发现测试树，运行所选节点，并将其状态流式输出到控制台。Ctrl-C 会停止调度后续
//! 节点，已在运行的节点将被允许完成。

use anyhow::{bail, Context, Result};
use colored::*;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};

use crate::core::discovery::DiscoveryMode;
use crate::core::execution::RunReport;
use crate::core::models::{NodeId, RunRequest};
use crate::infra::t;
use crate::reporting::{generate_html_report, print_event, print_summary};

use super::{open_session, setup_signal_handler, GlobalOptions};

#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub include: Vec<NodeId>,
    pub exclude: Vec<NodeId>,
    /// `FILE:LINE` (1-based) used when no included id is known.
    pub at: Option<String>,
    pub html: Option<PathBuf>,
    pub verbose: bool,
}

/// Splits `path/to/file.rb:12` into the path and a zero-based line.
fn parse_at(at: &str) -> Result<(PathBuf, u32)> {
    let (file, line) = at
        .rsplit_once(':')
        .with_context(|| t!("run.invalid_at", at = at).to_string())?;
    let line: u32 = line
        .parse()
        .ok()
        .filter(|l| *l > 0)
        .with_context(|| t!("run.invalid_at", at = at).to_string())?;
    Ok((PathBuf::from(file), line - 1))
}

pub async fn execute(options: &GlobalOptions, args: RunArgs) -> Result<()> {
    let mut session = open_session(options).await?;

    // Examples of unexpanded files only exist after resolution.
    let needs_expansion = args.at.is_some() || args.include.iter().any(|id| !session.tree().contains(id));
    if session.mode() == DiscoveryMode::Indexed && needs_expansion {
        session.expand_all().await?;
    }

    let cancel = setup_signal_handler();
    let (tx, rx) = mpsc::unbounded_channel();
    let verbose = args.verbose;
    let printer = tokio::spawn(async move {
        let mut events = UnboundedReceiverStream::new(rx);
        while let Some(event) = events.next().await {
            print_event(&event, verbose);
        }
    });

    let report: RunReport = match &args.at {
        Some(at) => {
            let (file, line) = parse_at(at)?;
            let file = std::fs::canonicalize(&file).unwrap_or(file);
            let id = args.include.first().cloned().unwrap_or_default();
            match session
                .run_by_id(&id, Some((file.as_path(), line)), &cancel, &tx)
                .await
            {
                Some(report) => report,
                None => {
                    drop(tx);
                    let _ = printer.await;
                    bail!(t!("run.nothing_at", at = at).to_string());
                }
            }
        }
        None => {
            let mut request = RunRequest::run_all();
            for id in args.include {
                request = request.include(id);
            }
            for id in args.exclude {
                request = request.exclude(id);
            }
            session.run(&request, &cancel, &tx).await
        }
    };

    // Closing the channel lets the printer drain and finish.
    drop(tx);
    let _ = printer.await;

    print_summary(&report);

    if let Some(path) = &args.html {
        println!("\n{}", t!("html_report.generating", path = path.display()));
        if let Err(e) = generate_html_report(&report, session.tree(), path) {
            eprintln!("{} {:#}", t!("html_report.failed").red(), e);
        }
    }

    session.dispose();

    if report.has_failures() {
        bail!(t!("run.failures").to_string());
    }
    if !report.cancelled {
        println!("\n{}", t!("run.all_passed").green().bold());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_at_converts_to_zero_based_line() {
        let (file, line) = parse_at("test/models/user_test.rb:12").unwrap();
        assert_eq!(file, PathBuf::from("test/models/user_test.rb"));
        assert_eq!(line, 11);
    }

    #[test]
    fn test_parse_at_rejects_bad_input() {
        assert!(parse_at("no_line.rb").is_err());
        assert!(parse_at("a.rb:0").is_err());
        assert!(parse_at("a.rb:x").is_err());
    }
}
