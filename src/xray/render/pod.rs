use k8s_openapi::api::core::v1::{
    Container, EphemeralContainer, PersistentVolumeClaim, Pod, PodSpec, Volume,
};

use super::{
    RefName, RenderContext, RenderInput, Renderer, add_ref, attach_namespaced, decode_object,
    object_key,
};
use crate::dao::decode;
use crate::models::{CLUSTER_SCOPE, ResourceKind, fqn};
use crate::xray::XrayError;
use crate::xray::status::{Status, pod_status};
use crate::xray::tree::NodeId;

pub(super) async fn render_pod(
    cx: &mut RenderContext<'_>,
    ns: &str,
    input: RenderInput,
) -> Result<(), XrayError> {
    let po: Pod = decode_object(input, "Pod")?;
    let parent = cx.parent()?;

    let (pod_ns, name) = object_key(&po.metadata);
    let ns = if pod_ns.is_empty() { ns.to_string() } else { pod_ns };
    let tree = cx.tree_mut();
    let node = tree.new_node(ResourceKind::POD, fqn(&ns, &name));
    attach_namespaced(tree, parent, node, &ns);

    let spec = po.spec.clone().unwrap_or_default();
    render_containers(cx, node, &ns, &spec).await?;
    render_pull_secrets(cx, node, &ns, &spec).await?;
    if let Some(volumes) = spec.volumes.as_ref() {
        render_volumes(cx, node, &ns, volumes).await?;
    }
    render_service_account(cx, node, &ns, &spec).await?;

    let (status, info) = pod_status(&po);
    if let Some(n) = cx.tree_mut().get_mut(node) {
        n.set_status(status);
        n.set_info(info);
    }
    Ok(())
}

async fn render_containers(
    cx: &mut RenderContext<'_>,
    pod: NodeId,
    ns: &str,
    spec: &PodSpec,
) -> Result<(), XrayError> {
    let mut child = cx.child(pod);
    let regular = spec
        .init_containers
        .iter()
        .flatten()
        .chain(spec.containers.iter())
        .cloned();
    let ephemeral = spec
        .ephemeral_containers
        .iter()
        .flatten()
        .map(ephemeral_container);
    for co in regular.chain(ephemeral) {
        Renderer::Container
            .render(&mut child, ns, RenderInput::Container(Box::new(co)))
            .await?;
    }
    Ok(())
}

/// Ephemeral containers carry the same reference fields as regular ones
fn ephemeral_container(ec: &EphemeralContainer) -> Container {
    Container {
        name: ec.name.clone(),
        image: ec.image.clone(),
        env: ec.env.clone(),
        env_from: ec.env_from.clone(),
        volume_mounts: ec.volume_mounts.clone(),
        ..Default::default()
    }
}

async fn render_pull_secrets(
    cx: &mut RenderContext<'_>,
    pod: NodeId,
    ns: &str,
    spec: &PodSpec,
) -> Result<(), XrayError> {
    for sec in spec.image_pull_secrets.iter().flatten() {
        if let Some(name) = sec.name.ref_name() {
            add_ref(cx, pod, ResourceKind::SECRET, fqn(ns, name), None).await?;
        }
    }
    Ok(())
}

async fn render_volumes(
    cx: &mut RenderContext<'_>,
    pod: NodeId,
    ns: &str,
    volumes: &[Volume],
) -> Result<(), XrayError> {
    for v in volumes {
        if let Some(sec) = v.secret.as_ref() {
            if let Some(name) = sec.secret_name.ref_name() {
                add_ref(cx, pod, ResourceKind::SECRET, fqn(ns, name), sec.optional).await?;
            }
        }
        if let Some(cm) = v.config_map.as_ref() {
            if let Some(name) = cm.name.ref_name() {
                add_ref(cx, pod, ResourceKind::CONFIG_MAP, fqn(ns, name), cm.optional).await?;
            }
        }
        if let Some(pvc) = v.persistent_volume_claim.as_ref() {
            if let Some(name) = pvc.claim_name.ref_name() {
                render_claim(cx, pod, fqn(ns, name)).await?;
            }
        }
    }
    Ok(())
}

/// PVC leaf, expanded to its volume once the claim is bound
async fn render_claim(
    cx: &mut RenderContext<'_>,
    pod: NodeId,
    id: String,
) -> Result<(), XrayError> {
    let Some((node, Some(obj))) = add_ref(cx, pod, ResourceKind::PVC, id, None).await? else {
        return Ok(());
    };
    let pvc: PersistentVolumeClaim = match decode(&obj) {
        Ok(pvc) => pvc,
        Err(e) => {
            tracing::debug!("Skipping volume lookup for claim: {:#}", e);
            return Ok(());
        }
    };
    // Expand on volumeName alone; claim status may lag behind the binding
    let volume = pvc.spec.as_ref().and_then(|s| s.volume_name.ref_name());
    if let Some(pv) = volume {
        add_ref(cx, node, ResourceKind::PV, fqn(CLUSTER_SCOPE, pv), None).await?;
    }
    Ok(())
}

async fn render_service_account(
    cx: &mut RenderContext<'_>,
    pod: NodeId,
    ns: &str,
    spec: &PodSpec,
) -> Result<(), XrayError> {
    let Some(name) = spec.service_account_name.ref_name() else {
        return Ok(());
    };
    let id = fqn(ns, name);
    if cx.tree().find(pod, &ResourceKind::SERVICE_ACCOUNT, &id).is_some() {
        return Ok(());
    }
    let found = match cx.get(&ResourceKind::SERVICE_ACCOUNT, &id, true).await {
        Ok(found) => found,
        Err(XrayError::Cancelled) => return Err(XrayError::Cancelled),
        Err(e) => {
            tracing::debug!("Service account lookup failed for {}: {}", id, e);
            None
        }
    };
    match found {
        Some(sa) => {
            let mut child = cx.child(pod).with_automount(spec.automount_service_account_token);
            Renderer::ServiceAccount
                .render(&mut child, ns, RenderInput::Object(sa))
                .await
        }
        None => {
            let tree = cx.tree_mut();
            let leaf = tree.add_new(pod, ResourceKind::SERVICE_ACCOUNT, id);
            if let Some(n) = tree.get_mut(leaf) {
                n.set_status(Status::MissingRef);
            }
            Ok(())
        }
    }
}

pub(super) async fn render_container(
    cx: &mut RenderContext<'_>,
    ns: &str,
    input: RenderInput,
) -> Result<(), XrayError> {
    let RenderInput::Container(co) = input else {
        return Err(XrayError::UnexpectedInput {
            expected: "Container",
            actual: input.describe(),
        });
    };
    let parent = cx.parent()?;
    let node = cx
        .tree_mut()
        .find_or_add(parent, ResourceKind::CONTAINER, &co.name);

    for env in co.env.iter().flatten() {
        let Some(src) = env.value_from.as_ref() else {
            continue;
        };
        if let Some(r) = src.config_map_key_ref.as_ref() {
            if let Some(name) = r.name.ref_name() {
                add_ref(cx, node, ResourceKind::CONFIG_MAP, fqn(ns, name), r.optional).await?;
            }
        }
        if let Some(r) = src.secret_key_ref.as_ref() {
            if let Some(name) = r.name.ref_name() {
                add_ref(cx, node, ResourceKind::SECRET, fqn(ns, name), r.optional).await?;
            }
        }
    }
    for src in co.env_from.iter().flatten() {
        if let Some(r) = src.config_map_ref.as_ref() {
            if let Some(name) = r.name.ref_name() {
                add_ref(cx, node, ResourceKind::CONFIG_MAP, fqn(ns, name), r.optional).await?;
            }
        }
        if let Some(r) = src.secret_ref.as_ref() {
            if let Some(name) = r.name.ref_name() {
                add_ref(cx, node, ResourceKind::SECRET, fqn(ns, name), r.optional).await?;
            }
        }
    }

    if let Some(n) = cx.tree_mut().get_mut(node) {
        n.set_status(Status::Ok);
        if let Some(image) = co.image.as_deref() {
            n.set_info(image);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ephemeral_container_keeps_refs() {
        let ec: EphemeralContainer = serde_json::from_value(serde_json::json!({
            "name": "debugger",
            "image": "busybox",
            "envFrom": [{"configMapRef": {"name": "cm1"}}]
        }))
        .unwrap();
        let co = ephemeral_container(&ec);
        assert_eq!(co.name, "debugger");
        assert_eq!(co.image.as_deref(), Some("busybox"));
        assert_eq!(co.env_from.map(|e| e.len()), Some(1));
    }
}
