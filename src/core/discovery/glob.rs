//! Filesystem glob discovery.
//!
//! The whole directory/file hierarchy is built in one pass. Files stay
//! tagged resolvable but this strategy never loads their examples; they run
//! through their file command, or through examples ingested from code lenses.

use async_trait::async_trait;
use tracing::debug;

use crate::core::discovery::{
    resolve_top_level, resolve_workspace, Discoverer, DiscoveryMode, TestLayout,
};
use crate::core::error::{DiscoveryError, TreeError};
use crate::core::models::{NodeId, NodeKind, Workspaces};
use crate::core::tree::TestTree;

pub struct GlobDiscoverer {
    layout: TestLayout,
    workspaces: Workspaces,
}

impl GlobDiscoverer {
    pub fn new(layout: TestLayout, workspaces: Workspaces) -> Self {
        Self { layout, workspaces }
    }
}

#[async_trait]
impl Discoverer for GlobDiscoverer {
    fn mode(&self) -> DiscoveryMode {
        DiscoveryMode::Glob
    }

    async fn resolve(&self, tree: &mut TestTree, node: Option<&NodeId>) -> Result<(), DiscoveryError> {
        let Some(id) = node else {
            return resolve_top_level(tree, &self.layout, &self.workspaces, false).await;
        };

        let kind = tree
            .get(id)
            .map(|n| n.kind)
            .ok_or_else(|| TreeError::NotFound(id.clone()))?;
        match kind {
            NodeKind::Workspace => {
                resolve_workspace(tree, &self.layout, &self.workspaces, id).await
            }
            _ => {
                debug!(node = %id, "glob discovery does not load examples");
                Ok(())
            }
        }
    }
}
