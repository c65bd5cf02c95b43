//! Kind renderers
//!
//! A closed set of renderers, one per supported kind, each turning one input
//! into tree nodes and recursing into the renderers of related kinds.

mod argo;
mod cluster;
mod context;
mod pod;
mod section;
mod workload;

pub use argo::AppResource;
pub use context::RenderContext;
pub use section::{SectionInput, TableRow};

use futures::future::{BoxFuture, FutureExt};
use k8s_openapi::api::core::v1::Container;
use kube::core::DynamicObject;
use serde::de::DeserializeOwned;

use super::XrayError;
use super::status::ref_status;
use super::tree::{NodeId, Tree};
use crate::dao::Selector;
use crate::models::{CLUSTER_SCOPE, RefName, ResourceKind, fqn};

/// Input handed to a renderer
#[derive(Debug, Clone)]
pub enum RenderInput {
    /// A cluster object as returned by the accessor
    Object(DynamicObject),
    /// A container spec; its namespace is the render namespace
    Container(Box<Container>),
    Section(SectionInput),
    ApplicationResource(AppResource),
    Row(TableRow),
}

impl RenderInput {
    /// Short description used in contract errors
    pub fn describe(&self) -> String {
        match self {
            RenderInput::Object(obj) => match obj.types.as_ref() {
                Some(t) => format!("{} object", t.kind),
                None => "untyped object".to_string(),
            },
            RenderInput::Container(_) => "Container".to_string(),
            RenderInput::Section(_) => "Section".to_string(),
            RenderInput::ApplicationResource(_) => "ApplicationResource".to_string(),
            RenderInput::Row(_) => "TableRow".to_string(),
        }
    }
}

/// The closed set of kind renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Renderer {
    Pod,
    Deployment,
    DaemonSet,
    StatefulSet,
    ReplicaSet,
    Service,
    Node,
    Namespace,
    ServiceAccount,
    Container,
    Section,
    Application,
    AppProject,
    ApplicationResource,
    Generic,
}

impl Renderer {
    /// Pick the renderer for a root kind, falling back to a generic row
    pub fn for_kind(kind: &ResourceKind) -> Renderer {
        match kind {
            k if *k == ResourceKind::POD => Renderer::Pod,
            k if *k == ResourceKind::DEPLOYMENT => Renderer::Deployment,
            k if *k == ResourceKind::DAEMON_SET => Renderer::DaemonSet,
            k if *k == ResourceKind::STATEFUL_SET => Renderer::StatefulSet,
            k if *k == ResourceKind::REPLICA_SET => Renderer::ReplicaSet,
            k if *k == ResourceKind::SERVICE => Renderer::Service,
            k if *k == ResourceKind::NODE => Renderer::Node,
            k if *k == ResourceKind::NAMESPACE => Renderer::Namespace,
            k if *k == ResourceKind::SERVICE_ACCOUNT => Renderer::ServiceAccount,
            k if *k == ResourceKind::CONTAINER => Renderer::Container,
            k if *k == ResourceKind::SECTION => Renderer::Section,
            k if *k == ResourceKind::APPLICATION => Renderer::Application,
            k if *k == ResourceKind::APP_PROJECT => Renderer::AppProject,
            k if *k == ResourceKind::APPLICATION_RESOURCE => Renderer::ApplicationResource,
            _ => Renderer::Generic,
        }
    }

    /// Render `input` below the context's parent node
    pub fn render<'a>(
        self,
        cx: &'a mut RenderContext<'_>,
        ns: &'a str,
        input: RenderInput,
    ) -> BoxFuture<'a, Result<(), XrayError>> {
        async move {
            match self {
                Renderer::Pod => pod::render_pod(cx, ns, input).await,
                Renderer::Container => pod::render_container(cx, ns, input).await,
                Renderer::Deployment => workload::render_deployment(cx, input).await,
                Renderer::DaemonSet => workload::render_daemon_set(cx, input).await,
                Renderer::StatefulSet => workload::render_stateful_set(cx, input).await,
                Renderer::ReplicaSet => workload::render_replica_set(cx, input).await,
                Renderer::Service => cluster::render_service(cx, input).await,
                Renderer::Node => cluster::render_node(cx, input).await,
                Renderer::Namespace => cluster::render_namespace(cx, input).await,
                Renderer::ServiceAccount => cluster::render_service_account(cx, input).await,
                Renderer::Section => section::render_section(cx, ns, input).await,
                Renderer::Generic => section::render_row(cx, input).await,
                Renderer::Application => argo::render_application(cx, input).await,
                Renderer::AppProject => argo::render_app_project(cx, input).await,
                Renderer::ApplicationResource => argo::render_app_resource(cx, input).await,
            }
        }
        .boxed()
    }
}

/// Unwrap an object input and decode it into its typed form
///
/// Fails when the input is not an object, or is an object of another kind.
fn decode_object<K: DeserializeOwned>(
    input: RenderInput,
    expected: &'static str,
) -> Result<K, XrayError> {
    let RenderInput::Object(obj) = input else {
        return Err(XrayError::UnexpectedInput {
            expected,
            actual: input.describe(),
        });
    };
    if let Some(types) = obj.types.as_ref() {
        if types.kind != expected {
            return Err(XrayError::UnexpectedInput {
                expected,
                actual: format!("{} object", types.kind),
            });
        }
    }
    let value = serde_json::to_value(&obj).map_err(|source| XrayError::Decode {
        kind: expected,
        source,
    })?;
    serde_json::from_value(value).map_err(|source| XrayError::Decode {
        kind: expected,
        source,
    })
}

/// Attach `node` to `parent`, through a namespace node when the parent chain
/// is not already inside that namespace
fn attach_namespaced(tree: &mut Tree, parent: NodeId, node: NodeId, ns: &str) {
    if ns.is_empty() {
        tree.add(parent, node);
        return;
    }
    let ns_id = fqn(CLUSTER_SCOPE, ns);
    if tree.in_namespace(parent, &ns_id) {
        tree.add(parent, node);
        return;
    }
    let ns_node = tree.find_or_add(parent, ResourceKind::NAMESPACE, &ns_id);
    tree.add(ns_node, node);
}

/// Add a reference leaf under `parent` unless one already exists
///
/// The referenced object is looked up once; a failed lookup counts as
/// missing. Returns the leaf and whether the object was found.
async fn add_ref(
    cx: &mut RenderContext<'_>,
    parent: NodeId,
    kind: ResourceKind,
    id: String,
    optional: Option<bool>,
) -> Result<Option<(NodeId, Option<DynamicObject>)>, XrayError> {
    if cx.tree().find(parent, &kind, &id).is_some() {
        return Ok(None);
    }
    let found = match cx.get(&kind, &id, false).await {
        Ok(found) => found,
        Err(XrayError::Cancelled) => return Err(XrayError::Cancelled),
        Err(e) => {
            tracing::debug!("Reference check failed for {} {}: {}", kind, id, e);
            None
        }
    };
    let status = ref_status(found.is_some(), optional);
    let tree = cx.tree_mut();
    let node = tree.add_new(parent, kind, id);
    if let Some(n) = tree.get_mut(node) {
        n.set_status(status);
    }
    Ok(Some((node, found)))
}

/// Render every pod matching `selector` below `parent`
async fn render_pods(
    cx: &mut RenderContext<'_>,
    parent: NodeId,
    ns: &str,
    selector: &Selector,
) -> Result<(), XrayError> {
    let pods = cx.list(&ResourceKind::POD, ns, false, selector).await?;
    let mut child = cx.child(parent);
    for po in pods {
        let pod_ns = po.metadata.namespace.clone().unwrap_or_default();
        Renderer::Pod
            .render(&mut child, &pod_ns, RenderInput::Object(po))
            .await?;
    }
    Ok(())
}

/// Namespace and name of an object, empty when unset
fn object_key(meta: &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta) -> (String, String) {
    (
        meta.namespace.clone().unwrap_or_default(),
        meta.name.clone().unwrap_or_default(),
    )
}
