//! # Test Tree Store / 测试树存储
//!
//! An arena of `TestNode`s addressed by `NodeId`. Ownership flows strictly
//! from a parent's child list; the parent index is only used for lookups.
//! The runnable command of a node is kept in a side table whose entries are
//! dropped together with the node.
//!
//! 以 `NodeId` 寻址的 `TestNode` 集合。所有权严格沿父节点的子列表传递，
//! 父索引仅用于查找。节点的可运行命令保存在旁表中，并随节点一起删除。

use std::collections::HashMap;
use std::path::Path;

use crate::core::error::TreeError;
use crate::core::models::{Capability, NodeId, NodeKind, TestNode};

#[derive(Debug, Default)]
pub struct TestTree {
    nodes: HashMap<NodeId, TestNode>,
    roots: Vec<NodeId>,
    parents: HashMap<NodeId, NodeId>,
    commands: HashMap<NodeId, String>,
}

impl TestTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Returns `None` for unknown ids; callers pick their own fallback.
    pub fn get(&self, id: &NodeId) -> Option<&TestNode> {
        self.nodes.get(id)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Children of `parent`, or the top-level nodes when `parent` is `None`.
    pub fn children(&self, parent: Option<&NodeId>) -> &[NodeId] {
        match parent {
            Some(id) => self.nodes.get(id).map(|n| n.children()).unwrap_or(&[]),
            None => &self.roots,
        }
    }

    pub fn parent_of(&self, id: &NodeId) -> Option<&NodeId> {
        self.parents.get(id)
    }

    /// Adds `node` under `parent` (or at the top level).
    ///
    /// A node with the same id replaces the existing one, whose subtree is
    /// discarded first.
    pub fn add(&mut self, mut node: TestNode, parent: Option<&NodeId>) -> Result<(), TreeError> {
        if let Some(parent_id) = parent {
            let parent_node = self
                .nodes
                .get(parent_id)
                .ok_or_else(|| TreeError::UnknownParent(parent_id.clone()))?;
            if parent_node.kind == NodeKind::Example {
                return Err(TreeError::ExampleCannotHaveChildren(parent_id.clone()));
            }
            if parent_id == &node.id {
                return Err(TreeError::UnknownParent(parent_id.clone()));
            }
        }

        if self.nodes.contains_key(&node.id) {
            self.remove(&node.id);
            // The replaced subtree may have contained the parent.
            if let Some(parent_id) = parent.filter(|p| !self.nodes.contains_key(*p)) {
                return Err(TreeError::UnknownParent(parent_id.clone()));
            }
        }

        node.children.clear();
        let id = node.id.clone();
        match parent {
            Some(parent_id) => {
                if let Some(parent_node) = self.nodes.get_mut(parent_id) {
                    parent_node.children.push(id.clone());
                }
                self.parents.insert(id.clone(), parent_id.clone());
            }
            None => self.roots.push(id.clone()),
        }
        self.nodes.insert(id, node);
        Ok(())
    }

    /// Discards every child subtree of `parent` and inserts `new_children`
    /// in order. `None` replaces the top level.
    pub fn replace_children(
        &mut self,
        parent: Option<&NodeId>,
        new_children: Vec<TestNode>,
    ) -> Result<(), TreeError> {
        if let Some(id) = parent {
            if !self.nodes.contains_key(id) {
                return Err(TreeError::NotFound(id.clone()));
            }
        }

        let old: Vec<NodeId> = self.children(parent).to_vec();
        for child in &old {
            self.discard(child);
        }
        match parent {
            Some(id) => {
                if let Some(node) = self.nodes.get_mut(id) {
                    node.children.clear();
                }
            }
            None => self.roots.clear(),
        }

        for child in new_children {
            self.add(child, parent)?;
        }
        Ok(())
    }

    pub fn clear_children(&mut self, parent: Option<&NodeId>) -> Result<(), TreeError> {
        self.replace_children(parent, Vec::new())
    }

    /// Detaches `id` from its parent and drops its whole subtree.
    pub fn remove(&mut self, id: &NodeId) -> Option<TestNode> {
        if !self.nodes.contains_key(id) {
            return None;
        }
        match self.parents.get(id).cloned() {
            Some(parent_id) => {
                if let Some(parent) = self.nodes.get_mut(&parent_id) {
                    parent.children.retain(|c| c != id);
                }
            }
            None => self.roots.retain(|r| r != id),
        }
        self.discard(id)
    }

    /// Drops a subtree from the arena and the command table. Does not touch
    /// the parent's child list.
    fn discard(&mut self, id: &NodeId) -> Option<TestNode> {
        let removed = self.nodes.remove(id);
        self.commands.remove(id);
        self.parents.remove(id);

        let mut stack: Vec<NodeId> = removed
            .as_ref()
            .map(|n| n.children.clone())
            .unwrap_or_default();
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                stack.extend(node.children);
            }
            self.commands.remove(&next);
            self.parents.remove(&next);
        }
        removed
    }

    /// Drops every node. Used when a session is disposed.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
        self.parents.clear();
        self.commands.clear();
    }

    pub fn set_resolved(&mut self, id: &NodeId, resolved: bool) -> Result<(), TreeError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| TreeError::NotFound(id.clone()))?;
        node.resolved = resolved;
        Ok(())
    }

    pub fn set_command(&mut self, id: &NodeId, command: impl Into<String>) -> Result<(), TreeError> {
        if !self.nodes.contains_key(id) {
            return Err(TreeError::NotFound(id.clone()));
        }
        self.commands.insert(id.clone(), command.into());
        Ok(())
    }

    pub fn command(&self, id: &NodeId) -> Option<&str> {
        self.commands.get(id).map(String::as_str)
    }

    /// Whether the orchestrator runs this node's command instead of walking
    /// into its children: examples with a command, and files that have a
    /// command but no discovered examples.
    pub fn is_executable(&self, id: &NodeId) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        if !self.commands.contains_key(id) {
            return false;
        }
        node.has(Capability::Example) || (node.kind == NodeKind::File && node.children.is_empty())
    }

    /// The deepest node of `path` whose range contains `line`.
    pub fn find_by_location(&self, path: &Path, line: u32) -> Option<&TestNode> {
        let mut best: Option<(usize, &TestNode)> = None;
        let mut stack: Vec<(usize, &NodeId)> = self.roots.iter().rev().map(|id| (0, id)).collect();

        while let Some((depth, id)) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            let in_range = node.location.path == path
                && node
                    .location
                    .range
                    .is_some_and(|range| range.contains_line(line));
            if in_range && best.is_none_or(|(best_depth, _)| depth > best_depth) {
                best = Some((depth, node));
            }
            stack.extend(node.children.iter().rev().map(|c| (depth + 1, c)));
        }

        best.map(|(_, node)| node)
    }

    /// The file node currently holding `path`, wherever it sits in the tree.
    pub fn find_file(&self, path: &Path) -> Option<&TestNode> {
        self.walk()
            .into_iter()
            .map(|(_, node)| node)
            .find(|node| node.kind == NodeKind::File && node.location.path == path)
    }

    /// All nodes in declaration order, depth first, paired with their depth.
    pub fn walk(&self) -> Vec<(usize, &TestNode)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, &NodeId)> = self.roots.iter().rev().map(|id| (0, id)).collect();
        while let Some((depth, id)) = stack.pop() {
            if let Some(node) = self.nodes.get(id) {
                out.push((depth, node));
                stack.extend(node.children.iter().rev().map(|c| (depth + 1, c)));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Location, Range};
    use std::path::PathBuf;

    fn group(id: &str, path: &str, start: u32, end: u32) -> TestNode {
        TestNode::new(
            id,
            id,
            Location::new(path).with_range(Range::lines(start, end)),
            NodeKind::Group,
        )
        .with_capability(Capability::Group)
    }

    fn example(id: &str, path: &str, start: u32, end: u32) -> TestNode {
        TestNode::new(
            id,
            id,
            Location::new(path).with_range(Range::lines(start, end)),
            NodeKind::Example,
        )
        .with_capability(Capability::Example)
    }

    fn file(id: &str) -> TestNode {
        TestNode::new(id, id, Location::new(id), NodeKind::File)
            .with_capability(Capability::Resolvable)
    }

    #[test]
    fn test_add_and_get() {
        let mut tree = TestTree::new();
        tree.add(file("/w/test/a_test.rb"), None).unwrap();
        tree.add(
            example("ex", "/w/test/a_test.rb", 1, 3),
            Some(&NodeId::from("/w/test/a_test.rb")),
        )
        .unwrap();

        assert_eq!(tree.len(), 2);
        assert_eq!(tree.roots(), &[NodeId::from("/w/test/a_test.rb")]);
        assert_eq!(
            tree.parent_of(&NodeId::from("ex")),
            Some(&NodeId::from("/w/test/a_test.rb"))
        );
        assert!(tree.get(&NodeId::from("missing")).is_none());
    }

    #[test]
    fn test_examples_never_acquire_children() {
        let mut tree = TestTree::new();
        tree.add(example("ex", "/f.rb", 1, 2), None).unwrap();
        let err = tree
            .add(example("inner", "/f.rb", 1, 1), Some(&NodeId::from("ex")))
            .unwrap_err();
        assert_eq!(err, TreeError::ExampleCannotHaveChildren(NodeId::from("ex")));
    }

    #[test]
    fn test_add_under_unknown_parent_fails() {
        let mut tree = TestTree::new();
        let err = tree
            .add(file("/f.rb"), Some(&NodeId::from("nope")))
            .unwrap_err();
        assert_eq!(err, TreeError::UnknownParent(NodeId::from("nope")));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_re_adding_an_id_replaces_the_node() {
        let mut tree = TestTree::new();
        tree.add(group("g", "/f.rb", 0, 10), None).unwrap();
        tree.add(example("e", "/f.rb", 1, 2), Some(&NodeId::from("g")))
            .unwrap();
        tree.add(group("g", "/f.rb", 0, 12), None).unwrap();

        assert_eq!(tree.roots().len(), 1);
        assert!(tree.get(&NodeId::from("e")).is_none());
        assert!(tree.get(&NodeId::from("g")).unwrap().children().is_empty());
    }

    #[test]
    fn test_replace_children_discards_subtree_and_commands() {
        let mut tree = TestTree::new();
        let f = NodeId::from("/f.rb");
        tree.add(file("/f.rb"), None).unwrap();
        tree.add(group("g", "/f.rb", 0, 10), Some(&f)).unwrap();
        tree.add(example("e", "/f.rb", 1, 2), Some(&NodeId::from("g")))
            .unwrap();
        tree.set_command(&NodeId::from("e"), "ruby e").unwrap();

        tree.replace_children(Some(&f), vec![example("e2", "/f.rb", 3, 4)])
            .unwrap();

        assert!(tree.get(&NodeId::from("g")).is_none());
        assert!(tree.get(&NodeId::from("e")).is_none());
        assert!(tree.command(&NodeId::from("e")).is_none());
        assert!(tree.parent_of(&NodeId::from("e")).is_none());
        assert_eq!(tree.children(Some(&f)), &[NodeId::from("e2")]);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_replace_children_of_unknown_node_fails() {
        let mut tree = TestTree::new();
        let err = tree
            .replace_children(Some(&NodeId::from("x")), Vec::new())
            .unwrap_err();
        assert_eq!(err, TreeError::NotFound(NodeId::from("x")));
    }

    #[test]
    fn test_find_by_location_returns_innermost_match() {
        let mut tree = TestTree::new();
        let path = "/w/test/a_test.rb";
        tree.add(file(path), None).unwrap();
        tree.add(group("outer", path, 0, 20), Some(&NodeId::from(path)))
            .unwrap();
        tree.add(group("inner", path, 5, 15), Some(&NodeId::from("outer")))
            .unwrap();
        tree.add(example("ex", path, 6, 8), Some(&NodeId::from("inner")))
            .unwrap();
        tree.add(example("other", path, 16, 18), Some(&NodeId::from("outer")))
            .unwrap();

        let p = PathBuf::from(path);
        assert_eq!(tree.find_by_location(&p, 7).unwrap().id.as_str(), "ex");
        assert_eq!(tree.find_by_location(&p, 10).unwrap().id.as_str(), "inner");
        assert_eq!(tree.find_by_location(&p, 17).unwrap().id.as_str(), "other");
        assert_eq!(tree.find_by_location(&p, 2).unwrap().id.as_str(), "outer");
        assert!(tree.find_by_location(&p, 30).is_none());
        assert!(tree
            .find_by_location(Path::new("/w/test/b_test.rb"), 7)
            .is_none());
    }

    #[test]
    fn test_find_file_looks_through_the_hierarchy() {
        let mut tree = TestTree::new();
        let dir = TestNode::new("/w/test", "test", Location::new("/w/test"), NodeKind::Directory);
        tree.add(dir, None).unwrap();
        tree.add(file("/w/test/a_test.rb"), Some(&NodeId::from("/w/test")))
            .unwrap();

        let found = tree.find_file(Path::new("/w/test/a_test.rb")).unwrap();
        assert_eq!(found.kind, NodeKind::File);
        assert!(tree.find_file(Path::new("/w/test")).is_none());
    }

    #[test]
    fn test_is_executable() {
        let mut tree = TestTree::new();
        let f = NodeId::from("/f.rb");
        tree.add(file("/f.rb"), None).unwrap();
        assert!(!tree.is_executable(&f));

        tree.set_command(&f, "ruby /f.rb").unwrap();
        assert!(tree.is_executable(&f));

        tree.add(example("e", "/f.rb", 1, 1), Some(&f)).unwrap();
        assert!(!tree.is_executable(&f));
        assert!(!tree.is_executable(&NodeId::from("e")));

        tree.set_command(&NodeId::from("e"), "ruby /f.rb:2").unwrap();
        assert!(tree.is_executable(&NodeId::from("e")));
    }

    #[test]
    fn test_walk_is_depth_first_in_declaration_order() {
        let mut tree = TestTree::new();
        tree.add(group("a", "/f.rb", 0, 9), None).unwrap();
        tree.add(example("a1", "/f.rb", 1, 1), Some(&NodeId::from("a")))
            .unwrap();
        tree.add(example("a2", "/f.rb", 2, 2), Some(&NodeId::from("a")))
            .unwrap();
        tree.add(group("b", "/f.rb", 10, 19), None).unwrap();

        let order: Vec<(usize, &str)> = tree
            .walk()
            .into_iter()
            .map(|(d, n)| (d, n.id.as_str()))
            .collect();
        assert_eq!(order, vec![(0, "a"), (1, "a1"), (1, "a2"), (0, "b")]);
    }

    #[test]
    fn test_remove_detaches_from_parent() {
        let mut tree = TestTree::new();
        tree.add(group("g", "/f.rb", 0, 9), None).unwrap();
        tree.add(example("e", "/f.rb", 1, 1), Some(&NodeId::from("g")))
            .unwrap();

        let removed = tree.remove(&NodeId::from("e")).unwrap();
        assert_eq!(removed.id.as_str(), "e");
        assert!(tree.get(&NodeId::from("g")).unwrap().children().is_empty());

        tree.remove(&NodeId::from("g"));
        assert!(tree.is_empty());
        assert!(tree.roots().is_empty());
    }
}
