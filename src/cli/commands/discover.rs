//! `discover`: builds the tree and prints it.

use anyhow::Result;
use colored::*;
use serde::Serialize;

use crate::core::models::{Capability, NodeKind};
use crate::core::tree::TestTree;
use crate::infra::t;
use crate::reporting::print_tree;

use super::{open_session, GlobalOptions};

#[derive(Debug, Serialize)]
struct NodeRow<'a> {
    id: &'a str,
    label: &'a str,
    kind: NodeKind,
    depth: usize,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    capabilities: Vec<Capability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<&'a str>,
}

fn rows(tree: &TestTree) -> Vec<NodeRow<'_>> {
    tree.walk()
        .into_iter()
        .map(|(depth, node)| NodeRow {
            id: node.id.as_str(),
            label: &node.label,
            kind: node.kind,
            depth,
            path: node.location.path.display().to_string(),
            line: node.location.range.map(|r| r.start.line + 1),
            capabilities: node.capabilities.iter().copied().collect(),
            command: tree.command(&node.id),
        })
        .collect()
}

pub async fn execute(options: &GlobalOptions, expand_all: bool, json: bool) -> Result<()> {
    let mut session = open_session(options).await?;
    if expand_all {
        session.expand_all().await?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows(session.tree()))?);
        return Ok(());
    }

    print_tree(session.tree());
    println!(
        "\n{}",
        t!("discover.total", count = session.tree().len()).dimmed()
    );
    Ok(())
}
