//! Flattened branch representation

use super::status::Status;
use super::tree::{Extras, STATUS_KEY};
use crate::models::ResourceKind;

/// Separator used when joining branch components
pub const PATH_SEPARATOR: &str = "::";

static NO_KIND: ResourceKind = ResourceKind::NONE;

/// One branch of a tree, leaf first
///
/// Index 0 is the leaf, the last index is the tree root. The three vectors
/// are always the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeSpec {
    pub kinds: Vec<ResourceKind>,
    pub ids: Vec<String>,
    pub extras: Vec<Extras>,
}

impl NodeSpec {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn kind(&self) -> &ResourceKind {
        self.kinds.first().unwrap_or(&NO_KIND)
    }

    pub fn path(&self) -> &str {
        self.ids.first().map(String::as_str).unwrap_or("")
    }

    pub fn parent_kind(&self) -> Option<&ResourceKind> {
        self.kinds.get(1)
    }

    pub fn parent_path(&self) -> Option<&str> {
        self.ids.get(1).map(String::as_str)
    }

    /// Status of the leaf
    pub fn status(&self) -> Option<Status> {
        self.statuses().first().and_then(|s| Status::parse_optional(s))
    }

    pub fn statuses(&self) -> Vec<&str> {
        self.extras
            .iter()
            .map(|e| e.get(STATUS_KEY).map(String::as_str).unwrap_or(""))
            .collect()
    }

    pub fn as_path(&self) -> String {
        self.ids.join(PATH_SEPARATOR)
    }

    pub fn as_kind(&self) -> String {
        self.kinds
            .iter()
            .map(ResourceKind::as_str)
            .collect::<Vec<_>>()
            .join(PATH_SEPARATOR)
    }

    pub fn as_status(&self) -> String {
        self.statuses().join(PATH_SEPARATOR)
    }

    /// Text handed to filter predicates: ids then statuses
    pub fn search_key(&self) -> String {
        format!("{}{}{}", self.as_path(), PATH_SEPARATOR, self.as_status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceKind as K;

    fn extras(status: &str) -> Extras {
        let mut e = Extras::new();
        e.insert(STATUS_KEY.to_string(), status.to_string());
        e
    }

    fn spec() -> NodeSpec {
        NodeSpec {
            kinds: vec![K::CONFIG_MAP, K::POD, K::POD],
            ids: vec!["default/cm1".into(), "default/p1".into(), "pods".into()],
            extras: vec![extras("noref"), extras("ok"), extras("ok")],
        }
    }

    #[test]
    fn test_accessors() {
        let s = spec();
        assert_eq!(s.len(), 3);
        assert_eq!(s.kind(), &K::CONFIG_MAP);
        assert_eq!(s.path(), "default/cm1");
        assert_eq!(s.parent_kind(), Some(&K::POD));
        assert_eq!(s.parent_path(), Some("default/p1"));
        assert_eq!(s.status(), Some(Status::MissingRef));
    }

    #[test]
    fn test_joined_forms() {
        let s = spec();
        assert_eq!(s.as_path(), "default/cm1::default/p1::pods");
        assert_eq!(s.as_kind(), "v1/configmaps::v1/pods::v1/pods");
        assert_eq!(s.as_status(), "noref::ok::ok");
        assert_eq!(s.search_key(), "default/cm1::default/p1::pods::noref::ok::ok");
    }

    #[test]
    fn test_empty_spec() {
        let s = NodeSpec::default();
        assert!(s.is_empty());
        assert_eq!(s.kind(), &K::NONE);
        assert_eq!(s.path(), "");
        assert_eq!(s.status(), None);
    }
}
