//! Resource access layer
//!
//! The graph engine and the scanners only read the cluster through the
//! [`ResourceAccessor`] trait. Two implementations ship with the crate: a
//! live one over `kube::Api<DynamicObject>` and an in-memory store used by
//! tests and the offline `--from-file` mode.

mod kube_accessor;
mod memory;
mod selector;

pub use kube_accessor::KubeAccessor;
pub use memory::{MemoryAccessor, kind_for};
pub use selector::{FieldRequirement, Selector};

use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::core::DynamicObject;
use serde::de::DeserializeOwned;

use crate::models::ResourceKind;

/// Read access to cluster objects
///
/// `wait` asks for a fresh read rather than a possibly stale cache.
/// A missing object is `Ok(None)`, never an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceAccessor: Send + Sync {
    /// Fetch one object by `namespace/name` (or bare name when cluster scoped)
    async fn get(
        &self,
        kind: &ResourceKind,
        fqn: &str,
        wait: bool,
    ) -> Result<Option<DynamicObject>>;

    /// List objects of a kind; an empty or `all` namespace means every namespace
    async fn list(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        wait: bool,
        selector: &Selector,
    ) -> Result<Vec<DynamicObject>>;
}

/// Decode an untyped object into its typed form
pub fn decode<K: DeserializeOwned>(obj: &DynamicObject) -> Result<K> {
    let value = serde_json::to_value(obj).context("Failed to serialize object to JSON")?;
    serde_json::from_value(value).with_context(|| {
        format!(
            "Failed to decode {}",
            obj.metadata.name.as_deref().unwrap_or("<unnamed>")
        )
    })
}
