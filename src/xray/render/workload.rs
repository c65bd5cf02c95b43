use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

use super::{RenderContext, RenderInput, attach_namespaced, decode_object, object_key, render_pods};
use crate::dao::Selector;
use crate::models::{ResourceKind, fqn};
use crate::xray::XrayError;
use crate::xray::status::{Status, replica_status};
use crate::xray::tree::NodeId;

/// Shared shape of the pod-owning workloads: own node, pods by selector
async fn render_workload(
    cx: &mut RenderContext<'_>,
    kind: ResourceKind,
    meta: &ObjectMeta,
    selector: Option<&LabelSelector>,
) -> Result<NodeId, XrayError> {
    let parent = cx.parent()?;
    let (ns, name) = object_key(meta);
    let id = fqn(&ns, &name);

    let tree = cx.tree_mut();
    let node = tree.new_node(kind, id.as_str());
    attach_namespaced(tree, parent, node, &ns);

    if let Some(sel) = selector {
        let sel = Selector::from_label_selector(sel).map_err(|e| XrayError::InvalidSelector {
            fqn: id,
            reason: e.to_string(),
        })?;
        render_pods(cx, node, &ns, &sel).await?;
    }
    Ok(node)
}

fn stamp(cx: &mut RenderContext<'_>, node: NodeId, status: Status, info: Option<String>) {
    if let Some(n) = cx.tree_mut().get_mut(node) {
        n.set_status(status);
        if let Some(info) = info {
            n.set_info(info);
        }
    }
}

pub(super) async fn render_deployment(
    cx: &mut RenderContext<'_>,
    input: RenderInput,
) -> Result<(), XrayError> {
    let dp: Deployment = decode_object(input, "Deployment")?;
    let spec = dp.spec.as_ref();
    let node = render_workload(
        cx,
        ResourceKind::DEPLOYMENT,
        &dp.metadata,
        spec.map(|s| &s.selector),
    )
    .await?;

    let desired = spec.and_then(|s| s.replicas);
    let available = dp.status.as_ref().and_then(|s| s.available_replicas);
    stamp(cx, node, replica_status(desired, available), None);
    Ok(())
}

pub(super) async fn render_stateful_set(
    cx: &mut RenderContext<'_>,
    input: RenderInput,
) -> Result<(), XrayError> {
    let sts: StatefulSet = decode_object(input, "StatefulSet")?;
    let spec = sts.spec.as_ref();
    let node = render_workload(
        cx,
        ResourceKind::STATEFUL_SET,
        &sts.metadata,
        spec.map(|s| &s.selector),
    )
    .await?;

    let desired = spec.and_then(|s| s.replicas);
    let available = sts.status.as_ref().and_then(|s| s.available_replicas);
    stamp(cx, node, replica_status(desired, available), None);
    Ok(())
}

pub(super) async fn render_daemon_set(
    cx: &mut RenderContext<'_>,
    input: RenderInput,
) -> Result<(), XrayError> {
    let ds: DaemonSet = decode_object(input, "DaemonSet")?;
    let node = render_workload(
        cx,
        ResourceKind::DAEMON_SET,
        &ds.metadata,
        ds.spec.as_ref().map(|s| &s.selector),
    )
    .await?;

    let status = ds.status.as_ref();
    let desired = status.map(|s| s.desired_number_scheduled);
    let available = status.and_then(|s| s.number_available);
    stamp(cx, node, replica_status(desired, available), None);
    Ok(())
}

pub(super) async fn render_replica_set(
    cx: &mut RenderContext<'_>,
    input: RenderInput,
) -> Result<(), XrayError> {
    let rs: ReplicaSet = decode_object(input, "ReplicaSet")?;
    let spec = rs.spec.as_ref();
    let node = render_workload(
        cx,
        ResourceKind::REPLICA_SET,
        &rs.metadata,
        spec.map(|s| &s.selector),
    )
    .await?;

    let desired = spec.and_then(|s| s.replicas);
    let available = rs.status.as_ref().and_then(|s| s.available_replicas);
    let info = format!("{}/{}", available.unwrap_or(0), desired.unwrap_or(0));
    stamp(cx, node, replica_status(desired, available), Some(info));
    Ok(())
}
