//! # Execution Queue Module / 执行队列模块
//!
//! The work list a run is driven by. It is a stack: nodes selected together
//! are popped in reverse, so siblings execute last-selected first, and the
//! children of a walked-into node are pushed on top of what is already
//! waiting.
//!
//! 一次运行所依据的工作列表。它是一个栈：一起选中的节点按相反顺序弹出，
//! 因此兄弟节点以最后选中者优先的顺序执行。

use tracing::warn;

use crate::core::models::{NodeId, RunRequest};
use crate::core::tree::TestTree;

#[derive(Debug, Default)]
pub struct ExecutionQueue {
    stack: Vec<NodeId>,
}

impl ExecutionQueue {
    /// Seeds the queue from the request. An empty selection means every
    /// top-level node; ids that are no longer in the tree are dropped.
    pub fn plan(tree: &TestTree, request: &RunRequest) -> Self {
        let seed: Vec<NodeId> = if request.included.is_empty() {
            tree.roots().to_vec()
        } else {
            request
                .included
                .iter()
                .filter(|id| {
                    let known = tree.contains(id);
                    if !known {
                        warn!(node = %id, "requested node is not in the tree, ignoring");
                    }
                    known
                })
                .cloned()
                .collect()
        };
        Self { stack: seed }
    }

    pub fn extend(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        self.stack.extend(ids);
    }

    pub fn pop(&mut self) -> Option<NodeId> {
        self.stack.pop()
    }

    pub(crate) fn len(&self) -> usize {
        self.stack.len()
    }

    /// Pending ids, next to run first.
    pub fn pending(&self) -> impl Iterator<Item = &NodeId> {
        self.stack.iter().rev()
    }
}
