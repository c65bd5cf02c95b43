//! Per-build render state

use kube::core::DynamicObject;
use tokio_util::sync::CancellationToken;

use crate::dao::{ResourceAccessor, Selector};
use crate::models::ResourceKind;
use crate::xray::XrayError;
use crate::xray::tree::{NodeId, Tree};

/// State threaded through one build pass
///
/// Holds the tree being grown, the node new children attach to, and the
/// budget every accessor call is raced against.
pub struct RenderContext<'a> {
    accessor: &'a dyn ResourceAccessor,
    tree: &'a mut Tree,
    parent: Option<NodeId>,
    budget: CancellationToken,
    automount: Option<bool>,
}

impl<'a> RenderContext<'a> {
    /// Start a pass that attaches to the tree root
    pub fn new(
        accessor: &'a dyn ResourceAccessor,
        tree: &'a mut Tree,
        budget: CancellationToken,
    ) -> Self {
        let parent = Some(tree.root());
        Self {
            accessor,
            tree,
            parent,
            budget,
            automount: None,
        }
    }

    pub fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    /// Context for rendering below `parent`
    pub fn child(&mut self, parent: NodeId) -> RenderContext<'_> {
        RenderContext {
            accessor: self.accessor,
            tree: &mut *self.tree,
            parent: Some(parent),
            budget: self.budget.clone(),
            automount: None,
        }
    }

    /// Pod-level token automount override for a service account render
    pub fn with_automount(mut self, automount: Option<bool>) -> Self {
        self.automount = automount;
        self
    }

    pub fn automount(&self) -> Option<bool> {
        self.automount
    }

    /// The node new children attach to
    pub fn parent(&self) -> Result<NodeId, XrayError> {
        self.parent
            .filter(|p| self.tree.contains(*p))
            .ok_or(XrayError::MissingParent)
    }

    pub fn tree(&self) -> &Tree {
        self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        self.tree
    }

    pub fn budget(&self) -> &CancellationToken {
        &self.budget
    }

    pub async fn get(
        &self,
        kind: &ResourceKind,
        fqn: &str,
        wait: bool,
    ) -> Result<Option<DynamicObject>, XrayError> {
        tokio::select! {
            biased;
            _ = self.budget.cancelled() => Err(XrayError::Cancelled),
            res = self.accessor.get(kind, fqn, wait) => res.map_err(XrayError::Access),
        }
    }

    pub async fn list(
        &self,
        kind: &ResourceKind,
        ns: &str,
        wait: bool,
        selector: &Selector,
    ) -> Result<Vec<DynamicObject>, XrayError> {
        tokio::select! {
            biased;
            _ = self.budget.cancelled() => Err(XrayError::Cancelled),
            res = self.accessor.list(kind, ns, wait, selector) => res.map_err(XrayError::Access),
        }
    }
}
