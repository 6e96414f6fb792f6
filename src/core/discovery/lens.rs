//! Code lens ingestion.
//!
//! Language servers that do not support structured discovery describe the
//! tests of an open file as a flat batch of code lenses. Groups carry an `id`
//! and examples point at their group through `group_id`; the batch is
//! rebuilt into a hierarchy under the file's node.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::warn;

use crate::core::discovery::scoped_id;
use crate::core::error::TreeError;
use crate::core::models::{Capability, Location, NodeId, NodeKind, Position, Range, TestNode};
use crate::core::tree::TestTree;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LensLocation {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LensData {
    /// Tag attached by the server, `"example"` for runnable examples.
    pub kind: String,
    #[serde(default)]
    pub group_id: Option<u64>,
    /// Present on groups only.
    #[serde(default)]
    pub id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeLens {
    pub name: String,
    pub command: String,
    pub location: LensLocation,
    #[serde(default)]
    pub label: Option<String>,
    pub data: LensData,
}

/// What a lens batch did to the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LensIngest {
    pub added: usize,
    /// Names of lenses dropped because their group does not exist.
    pub orphans: Vec<String>,
    /// Names of lenses the tree rejected, such as a second lens with the
    /// same name under the same parent.
    pub skipped: Vec<String>,
}

/// Replaces the lens-derived children of `file` with `lenses`.
///
/// The batch attaches under the file node when the file is in the tree and
/// at the top level otherwise. Ids are scoped by the parent group, so the same
/// example name may appear under several groups. A lens whose `group_id` names
/// no group of this batch, or that the tree rejects, is dropped and logged;
/// the rest of the batch still goes in.
pub fn ingest_code_lenses(
    tree: &mut TestTree,
    file: &Path,
    lenses: &[CodeLens],
) -> Result<LensIngest, TreeError> {
    let container = tree.find_file(file).map(|node| node.id.clone());
    match &container {
        Some(id) => tree.clear_children(Some(id))?,
        None => {
            let stale: Vec<NodeId> = tree
                .roots()
                .iter()
                .filter(|id| tree.get(id).is_some_and(|n| n.location.path == file))
                .cloned()
                .collect();
            for id in stale {
                tree.remove(&id);
            }
        }
    }

    let mut groups: HashMap<u64, NodeId> = HashMap::new();
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut ingest = LensIngest::default();

    for lens in lenses {
        let group = match lens.data.group_id {
            Some(group_id) => match groups.get(&group_id) {
                Some(group) => Some(group.clone()),
                None => {
                    warn!(
                        example = %lens.name,
                        group_id,
                        "test example is attached to a group that does not exist"
                    );
                    ingest.orphans.push(lens.name.clone());
                    continue;
                }
            },
            None => None,
        };

        let id = match &group {
            Some(group) => NodeId::new(format!("{group}::{}", lens.name)),
            None => scoped_id(file, &lens.name),
        };
        if !seen.insert(id.clone()) {
            warn!(lens = %lens.name, "duplicate lens in batch, keeping the first");
            ingest.skipped.push(lens.name.clone());
            continue;
        }

        let label = lens
            .label
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(&lens.name);
        let range = Range::new(
            Position::new(lens.location.start_line, lens.location.start_column),
            Position::new(lens.location.end_line, lens.location.end_column),
        );
        let location = Location::new(file).with_range(range);

        let mut node = if lens.data.id.is_some() {
            TestNode::new(id.clone(), label, location, NodeKind::Group)
                .with_capability(Capability::Group)
        } else {
            TestNode::new(id.clone(), label, location, NodeKind::Example)
                .with_capability(Capability::Debuggable)
        };
        if lens.data.kind == "example" {
            node = node.with_capability(Capability::Example);
        }

        let parent = group.or_else(|| container.clone());
        if let Err(e) = tree.add(node, parent.as_ref()) {
            warn!(lens = %lens.name, error = %e, "dropping code lens");
            ingest.skipped.push(lens.name.clone());
            continue;
        }
        tree.set_command(&id, lens.command.clone())?;
        if let Some(group_id) = lens.data.id {
            groups.insert(group_id, id);
        }
        ingest.added += 1;
    }

    Ok(ingest)
}
