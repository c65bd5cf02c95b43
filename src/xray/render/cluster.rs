use k8s_openapi::api::core::v1::{Namespace, Node, Service, ServiceAccount};

use super::{
    RefName, RenderContext, RenderInput, add_ref, attach_namespaced, decode_object, object_key,
    render_pods,
};
use crate::dao::Selector;
use crate::models::{CLUSTER_SCOPE, NAMESPACE_ALL, ResourceKind, fqn};
use crate::xray::XrayError;
use crate::xray::status::Status;

const NODE_READY: &str = "Ready";
const FIELD_NODE_NAME: &str = "spec.nodeName";

pub(super) async fn render_service(
    cx: &mut RenderContext<'_>,
    input: RenderInput,
) -> Result<(), XrayError> {
    let svc: Service = decode_object(input, "Service")?;
    let parent = cx.parent()?;
    let (ns, name) = object_key(&svc.metadata);

    let tree = cx.tree_mut();
    let node = tree.new_node(ResourceKind::SERVICE, fqn(&ns, &name));
    attach_namespaced(tree, parent, node, &ns);

    // Selector-less services front manually managed endpoints
    let labels = svc.spec.as_ref().and_then(|s| s.selector.as_ref());
    if let Some(labels) = labels.filter(|l| !l.is_empty()) {
        render_pods(cx, node, &ns, &Selector::from_labels(labels)).await?;
    }

    if let Some(n) = cx.tree_mut().get_mut(node) {
        n.set_status(Status::Ok);
    }
    Ok(())
}

pub(super) async fn render_node(
    cx: &mut RenderContext<'_>,
    input: RenderInput,
) -> Result<(), XrayError> {
    let no: Node = decode_object(input, "Node")?;
    let parent = cx.parent()?;
    let name = no.metadata.name.clone().unwrap_or_default();

    let node = cx
        .tree_mut()
        .add_new(parent, ResourceKind::NODE, name.as_str());
    let sel = Selector::everything().with_field(FIELD_NODE_NAME, name.as_str());
    render_pods(cx, node, NAMESPACE_ALL, &sel).await?;

    let ready = no
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .and_then(|conds| conds.iter().find(|c| c.type_ == NODE_READY))
        .is_some_and(|c| c.status == "True");
    if let Some(n) = cx.tree_mut().get_mut(node) {
        n.set_status(if ready { Status::Ok } else { Status::Toast });
    }
    Ok(())
}

pub(super) async fn render_namespace(
    cx: &mut RenderContext<'_>,
    input: RenderInput,
) -> Result<(), XrayError> {
    let ns: Namespace = decode_object(input, "Namespace")?;
    let parent = cx.parent()?;
    let name = ns.metadata.name.clone().unwrap_or_default();

    let tree = cx.tree_mut();
    let node = tree.find_or_add(parent, ResourceKind::NAMESPACE, &fqn(CLUSTER_SCOPE, &name));
    if let Some(n) = tree.get_mut(node) {
        n.set_status(Status::Ok);
        if let Some(phase) = ns.status.as_ref().and_then(|s| s.phase.as_deref()) {
            n.set_info(phase);
        }
    }
    Ok(())
}

pub(super) async fn render_service_account(
    cx: &mut RenderContext<'_>,
    input: RenderInput,
) -> Result<(), XrayError> {
    let sa: ServiceAccount = decode_object(input, "ServiceAccount")?;
    let parent = cx.parent()?;
    let (ns, name) = object_key(&sa.metadata);
    let id = fqn(&ns, &name);
    if cx
        .tree()
        .find(parent, &ResourceKind::SERVICE_ACCOUNT, &id)
        .is_some()
    {
        return Ok(());
    }

    let tree = cx.tree_mut();
    let node = tree.new_node(ResourceKind::SERVICE_ACCOUNT, id);
    attach_namespaced(tree, parent, node, &ns);

    for sec in sa.secrets.iter().flatten() {
        if let Some(secret) = sec.name.ref_name() {
            add_ref(cx, node, ResourceKind::SECRET, fqn(&ns, secret), None).await?;
        }
    }
    for sec in sa.image_pull_secrets.iter().flatten() {
        if let Some(secret) = sec.name.ref_name() {
            add_ref(cx, node, ResourceKind::SECRET, fqn(&ns, secret), None).await?;
        }
    }

    // The pod level setting overrides the account's own
    let automount = cx
        .automount()
        .or(sa.automount_service_account_token)
        .unwrap_or(true);
    if let Some(n) = cx.tree_mut().get_mut(node) {
        n.set_status(Status::Ok);
        n.set_info(format!("automount:{}", automount));
    }
    Ok(())
}
