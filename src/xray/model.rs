//! Refresh model
//!
//! Builds a fresh tree for one root kind on every refresh and only
//! publishes it when it differs from the last one.

use tokio_util::sync::CancellationToken;

use super::XrayError;
use super::filter::filter_tree;
use super::render::{RenderContext, RenderInput, Renderer};
use super::spec::NodeSpec;
use super::status::Status;
use super::tree::{Tree, diff_trees};
use crate::dao::{ResourceAccessor, Selector};
use crate::models::ResourceKind;

#[derive(Debug, Clone)]
pub struct XrayModel {
    kind: ResourceKind,
    namespace: String,
    query: Option<String>,
    show_completed: bool,
    last: Option<Tree>,
}

impl XrayModel {
    pub fn new(kind: ResourceKind, namespace: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            query: None,
            show_completed: true,
            last: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.set_query(query);
        self
    }

    pub fn with_show_completed(mut self, show: bool) -> Self {
        self.show_completed = show;
        self
    }

    /// Set the search query; a blank query clears it
    pub fn set_query(&mut self, query: impl Into<String>) {
        let q = query.into();
        self.query = if q.trim().is_empty() { None } else { Some(q) };
    }

    pub fn clear_query(&mut self) {
        self.query = None;
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Last published tree
    pub fn tree(&self) -> Option<&Tree> {
        self.last.as_ref()
    }

    /// Build a sorted, unfiltered tree for the root kind
    pub async fn build(
        &self,
        accessor: &dyn ResourceAccessor,
        budget: CancellationToken,
    ) -> Result<Tree, XrayError> {
        let mut tree = Tree::new(self.kind.clone(), self.kind.resource());
        let renderer = Renderer::for_kind(&self.kind);
        let objects = {
            let cx = RenderContext::new(accessor, &mut tree, budget.clone());
            cx.list(&self.kind, &self.namespace, true, &Selector::everything())
                .await?
        };
        tracing::debug!("Rendering {} {} objects", objects.len(), self.kind);

        let mut cx = RenderContext::new(accessor, &mut tree, budget);
        for obj in objects {
            let ns = obj.metadata.namespace.clone().unwrap_or_default();
            renderer.render(&mut cx, &ns, RenderInput::Object(obj)).await?;
        }
        drop(cx);
        tree.sort();
        Ok(tree)
    }

    /// Rebuild and publish; returns whether the published tree changed
    ///
    /// On error the previous tree stays published.
    pub async fn refresh(
        &mut self,
        accessor: &dyn ResourceAccessor,
        budget: CancellationToken,
    ) -> Result<bool, XrayError> {
        let tree = self.build(accessor, budget).await?;
        let tree = if self.show_completed {
            tree
        } else {
            hide_completed(&tree)
        };
        let next = match self.query.as_deref() {
            Some(q) => filter_tree(&tree, q),
            None => Some(tree),
        };
        if !diff_trees(self.last.as_ref(), next.as_ref()) {
            return Ok(false);
        }
        self.last = next;
        Ok(true)
    }
}

/// Drop every branch that runs through a completed node
fn hide_completed(tree: &Tree) -> Tree {
    let specs: Vec<NodeSpec> = tree
        .flatten()
        .into_iter()
        .filter(|s| !s.statuses().contains(&Status::Completed.as_str()))
        .collect();
    if specs.is_empty() {
        return tree.shallow_clone();
    }
    Tree::hydrate(&specs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::MemoryAccessor;
    use serde_json::json;

    fn store() -> MemoryAccessor {
        let mut store = MemoryAccessor::new();
        let running = json!({"running": {}});
        let done = json!({"terminated": {"exitCode": 0, "reason": "Completed"}});
        for (name, phase, ready, state) in [
            ("p1", "Running", true, running),
            ("p2", "Succeeded", false, done),
        ] {
            store
                .insert_value(json!({
                    "apiVersion": "v1", "kind": "Pod",
                    "metadata": {"name": name, "namespace": "default"},
                    "spec": {"containers": [{"name": "c1"}]},
                    "status": {
                        "phase": phase,
                        "containerStatuses": [{
                            "name": "c1", "ready": ready,
                            "restartCount": 0, "image": "nginx", "imageID": "",
                            "state": state
                        }]
                    }
                }))
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_refresh_publishes_once() {
        let store = store();
        let mut model = XrayModel::new(ResourceKind::POD, "default");
        assert!(model.refresh(&store, CancellationToken::new()).await.unwrap());
        assert!(!model.refresh(&store, CancellationToken::new()).await.unwrap());
        let tree = model.tree().unwrap();
        assert_eq!(tree.count(&ResourceKind::POD), 2);
    }

    #[tokio::test]
    async fn test_refresh_hides_completed() {
        let store = store();
        let mut model = XrayModel::new(ResourceKind::POD, "default").with_show_completed(false);
        model.refresh(&store, CancellationToken::new()).await.unwrap();
        let tree = model.tree().unwrap();
        assert_eq!(tree.count(&ResourceKind::POD), 1);
    }

    #[tokio::test]
    async fn test_refresh_cancelled_keeps_previous() {
        let store = store();
        let mut model = XrayModel::new(ResourceKind::POD, "default");
        model.refresh(&store, CancellationToken::new()).await.unwrap();

        let budget = CancellationToken::new();
        budget.cancel();
        let err = model.refresh(&store, budget).await.unwrap_err();
        assert!(matches!(err, XrayError::Cancelled));
        assert!(model.tree().is_some());
    }

    #[tokio::test]
    async fn test_refresh_query_without_match() {
        let store = store();
        let mut model = XrayModel::new(ResourceKind::POD, "default").with_query("bozo");
        model.refresh(&store, CancellationToken::new()).await.unwrap();
        assert!(model.tree().is_none());
    }
}
