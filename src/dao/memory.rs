//! In-memory resource store
//!
//! Holds a fixed set of objects and answers get/list locally. Used by the
//! test suites and by the binary when rendering from a manifest dump.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use kube::core::DynamicObject;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use super::{ResourceAccessor, Selector};
use crate::models::{KINDS, ResourceKind, is_all_namespaces, namespaced};

#[derive(Debug, Clone, Default)]
pub struct MemoryAccessor {
    objects: HashMap<ResourceKind, Vec<DynamicObject>>,
}

impl MemoryAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ResourceKind, obj: DynamicObject) {
        self.objects.entry(kind).or_default().push(obj);
    }

    /// Builder form of [`MemoryAccessor::insert`]
    pub fn with(mut self, kind: ResourceKind, obj: DynamicObject) -> Self {
        self.insert(kind, obj);
        self
    }

    /// Insert a raw JSON object, inferring its kind from `apiVersion`/`kind`
    pub fn insert_value(&mut self, value: Value) -> Result<()> {
        let obj: DynamicObject =
            serde_json::from_value(value).context("Failed to decode object")?;
        let types = obj
            .types
            .as_ref()
            .ok_or_else(|| anyhow!("Object is missing apiVersion/kind"))?;
        let kind = kind_for(&types.api_version, &types.kind);
        self.insert(kind, obj);
        Ok(())
    }

    /// Load a multi-document YAML or JSON stream; `List` documents are expanded
    pub fn from_manifests(contents: &str) -> Result<Self> {
        let mut store = Self::new();
        for doc in serde_yaml::Deserializer::from_str(contents) {
            let value = Value::deserialize(doc).context("Failed to parse manifest document")?;
            if value.is_null() {
                continue;
            }
            match value.get("items").and_then(Value::as_array) {
                Some(items) => {
                    for item in items {
                        store.insert_value(item.clone())?;
                    }
                }
                None => store.insert_value(value)?,
            }
        }
        Ok(store)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest file: {}", path.display()))?;
        Self::from_manifests(&contents)
            .with_context(|| format!("Failed to load manifests from {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.objects.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Map an object's `apiVersion`/`kind` onto a resource kind
pub fn kind_for(api_version: &str, kind: &str) -> ResourceKind {
    KINDS
        .iter()
        .find(|e| e.kind_name == kind && e.kind().api_version() == api_version)
        .map(|e| e.kind())
        .unwrap_or_else(|| ResourceKind::new(format!("{}/{}s", api_version, kind.to_lowercase())))
}

fn same_namespace(obj: &DynamicObject, ns: &str) -> bool {
    obj.metadata.namespace.as_deref().unwrap_or("") == ns
}

#[async_trait]
impl ResourceAccessor for MemoryAccessor {
    async fn get(
        &self,
        kind: &ResourceKind,
        fqn: &str,
        _wait: bool,
    ) -> Result<Option<DynamicObject>> {
        let (ns, name) = namespaced(fqn);
        Ok(self.objects.get(kind).and_then(|objs| {
            objs.iter()
                .find(|o| o.metadata.name.as_deref() == Some(name) && same_namespace(o, ns))
                .cloned()
        }))
    }

    async fn list(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        _wait: bool,
        selector: &Selector,
    ) -> Result<Vec<DynamicObject>> {
        Ok(self
            .objects
            .get(kind)
            .map(|objs| {
                objs.iter()
                    .filter(|o| is_all_namespaces(namespace) || same_namespace(o, namespace))
                    .filter(|o| selector.matches(o))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
