use kube::core::DynamicObject;

use super::{RenderContext, RenderInput, Renderer, attach_namespaced, object_key};
use crate::dao::kind_for;
use crate::models::{ResourceKind, fqn};
use crate::xray::XrayError;
use crate::xray::status::Status;

/// A titled group of items rendered by one kind renderer
#[derive(Debug, Clone)]
pub struct SectionInput {
    pub title: String,
    /// Kind of every item; picks the renderer they go through
    pub kind: ResourceKind,
    pub items: Vec<RenderInput>,
}

/// One row of a generic resource table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
    /// Raw status string, one of the node status values when known
    pub status: Option<String>,
}

impl TableRow {
    pub fn from_object(obj: &DynamicObject) -> Self {
        let kind = obj
            .types
            .as_ref()
            .map(|t| kind_for(&t.api_version, &t.kind))
            .unwrap_or(ResourceKind::NONE);
        let (namespace, name) = object_key(&obj.metadata);
        Self {
            kind,
            namespace,
            name,
            status: None,
        }
    }
}

pub(super) async fn render_section(
    cx: &mut RenderContext<'_>,
    ns: &str,
    input: RenderInput,
) -> Result<(), XrayError> {
    let RenderInput::Section(section) = input else {
        return Err(XrayError::UnexpectedInput {
            expected: "Section",
            actual: input.describe(),
        });
    };
    let parent = cx.parent()?;
    let node = cx
        .tree_mut()
        .find_or_add(parent, ResourceKind::SECTION, &section.title);

    let renderer = Renderer::for_kind(&section.kind);
    let mut child = cx.child(node);
    for item in section.items {
        renderer.render(&mut child, ns, item).await?;
    }
    drop(child);

    if let Some(n) = cx.tree_mut().get_mut(node) {
        n.set_status(Status::Ok);
    }
    Ok(())
}

pub(super) async fn render_row(
    cx: &mut RenderContext<'_>,
    input: RenderInput,
) -> Result<(), XrayError> {
    let row = match input {
        RenderInput::Row(row) => row,
        RenderInput::Object(obj) => TableRow::from_object(&obj),
        other => {
            return Err(XrayError::UnexpectedInput {
                expected: "TableRow",
                actual: other.describe(),
            });
        }
    };
    let parent = cx.parent()?;
    let id = fqn(&row.namespace, &row.name);

    let tree = cx.tree_mut();
    if tree.find(parent, &row.kind, &id).is_some() {
        return Ok(());
    }
    let node = tree.new_node(row.kind, id);
    attach_namespaced(tree, parent, node, &row.namespace);
    let status = row
        .status
        .as_deref()
        .and_then(Status::parse_optional)
        .unwrap_or(Status::Ok);
    if let Some(n) = tree.get_mut(node) {
        n.set_status(status);
    }
    Ok(())
}
