//! Label and field selectors
//!
//! Label matching is delegated to `kube::core::Selector`; field requirements
//! are kept alongside because the in-memory accessor has to evaluate them
//! locally.

use anyhow::Result;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::core::{DynamicObject, Expression, SelectorExt};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Field equality requirement on a dotted object path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRequirement {
    pub path: String,
    pub value: String,
}

impl FieldRequirement {
    fn matches(&self, obj: &DynamicObject) -> bool {
        let actual = match self.path.as_str() {
            "metadata.name" => obj.metadata.name.clone(),
            "metadata.namespace" => obj.metadata.namespace.clone(),
            path => lookup(&obj.data, path).and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            }),
        };
        actual.unwrap_or_default() == self.value
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |v, key| v.get(key))
}

/// Combined label and field selector; the empty selector matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    labels: kube::core::Selector,
    fields: Vec<FieldRequirement>,
}

impl Selector {
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.selects_all() && self.fields.is_empty()
    }

    /// Equality requirements for every entry of a label map
    pub fn from_labels(labels: &BTreeMap<String, String>) -> Self {
        labels
            .iter()
            .map(|(k, v)| Expression::Equal(k.clone(), v.clone()))
            .collect::<kube::core::Selector>()
            .into()
    }

    /// Convert a workload's `spec.selector`
    pub fn from_label_selector(sel: &LabelSelector) -> Result<Self> {
        let labels = kube::core::Selector::try_from(sel.clone())?;
        Ok(labels.into())
    }

    /// Add a field equality requirement
    pub fn with_field(mut self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(FieldRequirement {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    pub fn label_selector(&self) -> &kube::core::Selector {
        &self.labels
    }

    pub fn fields(&self) -> &[FieldRequirement] {
        &self.fields
    }

    /// Label selector query string, if any
    pub fn label_query(&self) -> Option<String> {
        (!self.labels.selects_all()).then(|| self.labels.to_string())
    }

    /// Field selector query string, if any
    pub fn field_query(&self) -> Option<String> {
        if self.fields.is_empty() {
            return None;
        }
        Some(
            self.fields
                .iter()
                .map(|f| format!("{}={}", f.path, f.value))
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    pub fn matches_labels(&self, labels: &BTreeMap<String, String>) -> bool {
        self.labels.matches(labels)
    }

    /// Evaluate both label and field requirements against an object
    pub fn matches(&self, obj: &DynamicObject) -> bool {
        let empty = BTreeMap::new();
        let labels = obj.metadata.labels.as_ref().unwrap_or(&empty);
        self.matches_labels(labels) && self.fields.iter().all(|f| f.matches(obj))
    }
}

impl From<kube::core::Selector> for Selector {
    fn from(labels: kube::core::Selector) -> Self {
        Self {
            labels,
            fields: Vec::new(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .label_query()
            .into_iter()
            .chain(self.field_query())
            .collect();
        if parts.is_empty() {
            return f.write_str("<everything>");
        }
        f.write_str(&parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_label_selector() {
        let sel: LabelSelector = serde_json::from_value(json!({
            "matchLabels": {"app": "nginx"},
            "matchExpressions": [
                {"key": "tier", "operator": "In", "values": ["web", "api"]},
                {"key": "canary", "operator": "DoesNotExist"}
            ]
        }))
        .unwrap();
        let s = Selector::from_label_selector(&sel).unwrap();
        assert_eq!(
            s.label_query().as_deref(),
            Some("app=nginx,tier in (api,web),!canary")
        );
        assert!(s.matches_labels(&labels(&[("app", "nginx"), ("tier", "web")])));
        assert!(!s.matches_labels(&labels(&[("app", "nginx"), ("tier", "db")])));
        assert!(!s.matches_labels(&labels(&[
            ("app", "nginx"),
            ("tier", "web"),
            ("canary", "true")
        ])));
    }

    #[test]
    fn test_bad_operator() {
        let sel: LabelSelector = serde_json::from_value(json!({
            "matchExpressions": [{"key": "tier", "operator": "Near", "values": ["web"]}]
        }))
        .unwrap();
        assert!(Selector::from_label_selector(&sel).is_err());
    }

    #[test]
    fn test_from_labels() {
        let s = Selector::from_labels(&labels(&[("app", "nginx"), ("tier", "web")]));
        assert_eq!(s.label_query().as_deref(), Some("app=nginx,tier=web"));
        assert!(s.matches_labels(&labels(&[("app", "nginx"), ("tier", "web"), ("x", "y")])));
        assert!(!s.matches_labels(&labels(&[("app", "nginx")])));
    }

    #[test]
    fn test_field_selector() {
        let obj: DynamicObject = serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": "p1", "namespace": "default", "labels": {"app": "nginx"}},
            "spec": {"nodeName": "minikube"}
        }))
        .unwrap();
        let s = Selector::everything().with_field("spec.nodeName", "minikube");
        assert_eq!(s.field_query().as_deref(), Some("spec.nodeName=minikube"));
        assert!(s.matches(&obj));
        assert!(!Selector::everything().with_field("spec.nodeName", "kind").matches(&obj));
        assert!(Selector::everything().with_field("metadata.name", "p1").matches(&obj));

        let both = Selector::from_labels(&labels(&[("app", "nginx")]))
            .with_field("metadata.namespace", "default");
        assert_eq!(both.to_string(), "app=nginx metadata.namespace=default");
        assert!(both.matches(&obj));
    }

    #[test]
    fn test_everything() {
        let s = Selector::everything();
        assert!(s.is_empty());
        assert!(s.label_query().is_none());
        assert!(s.matches_labels(&BTreeMap::new()));
        assert_eq!(s.to_string(), "<everything>");
    }
}
