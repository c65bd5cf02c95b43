//! Shared domain types
//!
//! Resource kinds, object keys and the references discovered by scans.

mod resource_kind;

pub use resource_kind::{KINDS, KindEntry, ResourceKind};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace marker for cluster-scoped objects
pub const CLUSTER_SCOPE: &str = "-";

/// Fictional namespace meaning every namespace
pub const NAMESPACE_ALL: &str = "all";

/// Build an object key: `namespace/name`, or bare `name` when unnamespaced
pub fn fqn(ns: &str, name: &str) -> String {
    if ns.is_empty() {
        return name.to_string();
    }
    format!("{}/{}", ns, name)
}

/// Split an object key into namespace and name
///
/// The cluster-scope marker maps back to an empty namespace.
pub fn namespaced(path: &str) -> (&str, &str) {
    match path.split_once('/') {
        Some((CLUSTER_SCOPE, n)) => ("", n),
        Some((ns, n)) => (ns, n),
        None => ("", path),
    }
}

/// Whether a namespace argument designates all namespaces
pub fn is_all_namespaces(ns: &str) -> bool {
    ns.is_empty() || ns == NAMESPACE_ALL
}

/// One outbound reference from a scanned workload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ref {
    pub kind: ResourceKind,
    pub fqn: String,
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.fqn)
    }
}

/// Discovered references, in no particular order
pub type Refs = Vec<Ref>;

/// Name carried by an object reference
///
/// Reference types disagree on whether the name is optional, so both
/// shapes resolve to `None` when absent or empty.
pub trait RefName {
    fn ref_name(&self) -> Option<&str>;
}

impl RefName for String {
    fn ref_name(&self) -> Option<&str> {
        Some(self.as_str()).filter(|s| !s.is_empty())
    }
}

impl RefName for Option<String> {
    fn ref_name(&self) -> Option<&str> {
        self.as_deref().filter(|s| !s.is_empty())
    }
}
