//! Lazy, indexer-backed discovery.
//!
//! Workspaces and directories are walked for structure only; the examples
//! of a file are requested from the indexing collaborator the first time the
//! file is expanded, and again after every save.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::discovery::{
    resolve_top_level, resolve_workspace, scoped_id, Discoverer, DiscoveryMode, TestLayout,
};
use crate::core::error::{DiscoveryError, TreeError};
use crate::core::models::{Capability, Location, NodeId, NodeKind, TestNode, Workspaces};
use crate::core::tree::TestTree;
use crate::infra::fs::path_from_uri;
use crate::infra::indexer::{DiscoveredItem, Indexer};

pub struct IndexedDiscoverer {
    layout: TestLayout,
    workspaces: Workspaces,
    indexer: Arc<dyn Indexer>,
}

impl IndexedDiscoverer {
    pub fn new(layout: TestLayout, workspaces: Workspaces, indexer: Arc<dyn Indexer>) -> Self {
        Self {
            layout,
            workspaces,
            indexer,
        }
    }
}

#[async_trait]
impl Discoverer for IndexedDiscoverer {
    fn mode(&self) -> DiscoveryMode {
        DiscoveryMode::Indexed
    }

    async fn resolve(&self, tree: &mut TestTree, node: Option<&NodeId>) -> Result<(), DiscoveryError> {
        let Some(id) = node else {
            return resolve_top_level(tree, &self.layout, &self.workspaces, true).await;
        };

        let (kind, path) = tree
            .get(id)
            .map(|n| (n.kind, n.location.path.clone()))
            .ok_or_else(|| TreeError::NotFound(id.clone()))?;

        match kind {
            NodeKind::Workspace => {
                resolve_workspace(tree, &self.layout, &self.workspaces, id).await
            }
            // Groups arrive fully populated with their file
            NodeKind::Group => Ok(()),
            _ => {
                self.indexer.wait_for_indexing().await?;
                let items = self.indexer.discover_tests(&path).await?;
                debug!(node = %id, items = items.len(), "discovered");

                tree.clear_children(Some(id))?;
                insert_discovered(tree, &self.layout, id, items);
                Ok(())
            }
        }
    }
}

/// Inserts indexer items below `parent`, depth first in declaration order.
/// Items with children become groups, the rest executable examples. An item
/// the tree rejects is logged and skipped together with its children.
pub(crate) fn insert_discovered(
    tree: &mut TestTree,
    layout: &TestLayout,
    parent: &NodeId,
    items: Vec<DiscoveredItem>,
) -> usize {
    let mut inserted = 0;
    let mut stack: Vec<(NodeId, DiscoveredItem)> =
        items.into_iter().rev().map(|item| (parent.clone(), item)).collect();

    while let Some((parent_id, item)) = stack.pop() {
        let path = path_from_uri(&item.uri);
        let id = scoped_id(&path, &item.id);
        let location = Location::new(&path).with_range(item.range);

        let node = if item.children.is_empty() {
            TestNode::new(id.clone(), item.label.clone(), location, NodeKind::Example)
                .with_capability(Capability::Example)
                .with_capability(Capability::Debuggable)
        } else {
            TestNode::new(id.clone(), item.label.clone(), location, NodeKind::Group)
                .with_capability(Capability::Group)
                .with_capability(Capability::Debuggable)
        };

        if let Err(e) = tree.add(node, Some(&parent_id)) {
            warn!(item = %item.id, error = %e, "dropping discovered item");
            continue;
        }
        inserted += 1;

        let command = item.command.clone().or_else(|| {
            layout.example_command(&path, item.range.start.line, &item.label, &item.id)
        });
        if let Some(command) = command {
            // The node was just inserted, so this cannot miss.
            let _ = tree.set_command(&id, command);
        }

        stack.extend(item.children.into_iter().rev().map(|child| (id.clone(), child)));
    }

    inserted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_discovered_builds_groups_and_examples() {
        let mut tree = TestTree::new();
        let file = NodeId::from("/w/test/a_test.rb");
        tree.add(
            TestNode::new(file.clone(), "a_test.rb", Location::new("/w/test/a_test.rb"), NodeKind::File),
            None,
        )
        .unwrap();

        let uri = "file:///w/test/a_test.rb";
        let items = vec![
            DiscoveredItem::new("ATest", "ATest", uri, (0, 20)).with_children(vec![
                DiscoveredItem::new("ATest#test_one", "test_one", uri, (1, 3)),
                DiscoveredItem::new("ATest#test_two", "test_two", uri, (4, 6))
                    .with_command("ruby a_test.rb -n test_two"),
            ]),
        ];
        let layout = TestLayout {
            example_command: Some("ruby {file}:{line}".to_string()),
            ..TestLayout::default()
        };

        assert_eq!(insert_discovered(&mut tree, &layout, &file, items), 3);

        let group_id = NodeId::from("/w/test/a_test.rb::ATest");
        let group = tree.get(&group_id).unwrap();
        assert_eq!(group.kind, NodeKind::Group);
        assert!(group.has(Capability::Group));
        assert_eq!(
            group.children(),
            &[
                NodeId::from("/w/test/a_test.rb::ATest#test_one"),
                NodeId::from("/w/test/a_test.rb::ATest#test_two"),
            ]
        );

        let one = NodeId::from("/w/test/a_test.rb::ATest#test_one");
        assert!(tree.get(&one).unwrap().has(Capability::Example));
        assert_eq!(tree.command(&one), Some("ruby /w/test/a_test.rb:2"));
        assert_eq!(
            tree.command(&NodeId::from("/w/test/a_test.rb::ATest#test_two")),
            Some("ruby a_test.rb -n test_two")
        );
    }
}
