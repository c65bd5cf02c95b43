//! Argo CD applications and projects
//!
//! Neither kind ships in `k8s-openapi`, so only the fields the tree needs
//! are modelled here.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Deserialize;
use std::collections::BTreeMap;

use super::{
    RenderContext, RenderInput, Renderer, SectionInput, attach_namespaced, decode_object,
    object_key,
};
use crate::dao::Selector;
use crate::models::{ResourceKind, fqn};
use crate::xray::XrayError;
use crate::xray::status::Status;

#[derive(Debug, Default, Deserialize)]
struct Application {
    #[serde(default)]
    metadata: ObjectMeta,
    #[serde(default)]
    spec: ApplicationSpec,
    #[serde(default)]
    status: ApplicationStatus,
}

#[derive(Debug, Default, Deserialize)]
struct ApplicationSpec {
    #[serde(default)]
    project: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApplicationStatus {
    #[serde(default)]
    sync: Condition,
    #[serde(default)]
    health: Condition,
    #[serde(default)]
    resources: Vec<ResourceStatus>,
}

#[derive(Debug, Default, Deserialize)]
struct Condition {
    #[serde(default)]
    status: String,
}

#[derive(Debug, Default, Deserialize)]
struct ResourceStatus {
    #[serde(default)]
    group: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    kind: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    health: Option<Condition>,
}

#[derive(Debug, Default, Deserialize)]
struct AppProject {
    #[serde(default)]
    metadata: ObjectMeta,
}

/// One resource managed by an application
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppResource {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub sync: String,
    pub health: String,
}

impl ResourceStatus {
    fn into_resource(self) -> AppResource {
        AppResource {
            group: self.group,
            version: self.version,
            kind: self.kind,
            namespace: self.namespace,
            name: self.name,
            sync: self.status,
            health: self.health.map(|h| h.status).unwrap_or_default(),
        }
    }
}

fn sync_health(sync: &str, health: &str) -> String {
    format!("{}/{}", sync, health)
}

pub(super) async fn render_application(
    cx: &mut RenderContext<'_>,
    input: RenderInput,
) -> Result<(), XrayError> {
    let app: Application = decode_object(input, "Application")?;
    let parent = cx.parent()?;
    let (ns, name) = object_key(&app.metadata);
    let id = fqn(&ns, &name);
    if cx.tree().find(parent, &ResourceKind::APPLICATION, &id).is_some() {
        return Ok(());
    }

    let tree = cx.tree_mut();
    let node = tree.new_node(ResourceKind::APPLICATION, id);
    attach_namespaced(tree, parent, node, &ns);

    let info = sync_health(&app.status.sync.status, &app.status.health.status);
    let mut by_kind: BTreeMap<String, Vec<RenderInput>> = BTreeMap::new();
    for res in app.status.resources {
        by_kind
            .entry(res.kind.clone())
            .or_default()
            .push(RenderInput::ApplicationResource(res.into_resource()));
    }
    let mut child = cx.child(node);
    for (title, items) in by_kind {
        let section = SectionInput {
            title,
            kind: ResourceKind::APPLICATION_RESOURCE,
            items,
        };
        Renderer::Section
            .render(&mut child, &ns, RenderInput::Section(section))
            .await?;
    }
    drop(child);

    if let Some(n) = cx.tree_mut().get_mut(node) {
        n.set_status(Status::Ok);
        n.set_info(info);
    }
    Ok(())
}

pub(super) async fn render_app_project(
    cx: &mut RenderContext<'_>,
    input: RenderInput,
) -> Result<(), XrayError> {
    let proj: AppProject = decode_object(input, "AppProject")?;
    let parent = cx.parent()?;
    let (ns, name) = object_key(&proj.metadata);

    let tree = cx.tree_mut();
    let node = tree.new_node(ResourceKind::APP_PROJECT, fqn(&ns, &name));
    attach_namespaced(tree, parent, node, &ns);

    let apps = cx
        .list(&ResourceKind::APPLICATION, &ns, false, &Selector::everything())
        .await?;
    let mut child = cx.child(node);
    for obj in apps {
        let project = obj
            .data
            .pointer("/spec/project")
            .and_then(|p| p.as_str())
            .unwrap_or_default();
        if project != name {
            continue;
        }
        Renderer::Application
            .render(&mut child, &ns, RenderInput::Object(obj))
            .await?;
    }
    drop(child);

    if let Some(n) = cx.tree_mut().get_mut(node) {
        n.set_status(Status::Ok);
    }
    Ok(())
}

pub(super) async fn render_app_resource(
    cx: &mut RenderContext<'_>,
    input: RenderInput,
) -> Result<(), XrayError> {
    let RenderInput::ApplicationResource(res) = input else {
        return Err(XrayError::UnexpectedInput {
            expected: "ApplicationResource",
            actual: input.describe(),
        });
    };
    let parent = cx.parent()?;
    let tree = cx.tree_mut();
    let node = tree.find_or_add(
        parent,
        ResourceKind::APPLICATION_RESOURCE,
        &fqn(&res.namespace, &res.name),
    );
    if let Some(n) = tree.get_mut(node) {
        n.set_status(Status::Ok);
        n.set_info(sync_health(&res.sync, &res.health));
    }
    Ok(())
}
