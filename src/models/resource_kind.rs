//! Resource kind identifiers
//!
//! A [`ResourceKind`] is the `group/version/resource` string the rest of the
//! crate uses as a dispatch key and as half of a tree node's identity. Core
//! kinds drop the group (`v1/pods`), synthetic kinds are a bare resource
//! name (`containers`).

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Opaque `group/version/resource` identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKind(Cow<'static, str>);

impl ResourceKind {
    pub const NONE: ResourceKind = ResourceKind::from_static("");
    pub const POD: ResourceKind = ResourceKind::from_static("v1/pods");
    pub const SERVICE: ResourceKind = ResourceKind::from_static("v1/services");
    pub const NODE: ResourceKind = ResourceKind::from_static("v1/nodes");
    pub const NAMESPACE: ResourceKind = ResourceKind::from_static("v1/namespaces");
    pub const SERVICE_ACCOUNT: ResourceKind = ResourceKind::from_static("v1/serviceaccounts");
    pub const CONFIG_MAP: ResourceKind = ResourceKind::from_static("v1/configmaps");
    pub const SECRET: ResourceKind = ResourceKind::from_static("v1/secrets");
    pub const PVC: ResourceKind = ResourceKind::from_static("v1/persistentvolumeclaims");
    pub const PV: ResourceKind = ResourceKind::from_static("v1/persistentvolumes");
    pub const DEPLOYMENT: ResourceKind = ResourceKind::from_static("apps/v1/deployments");
    pub const STATEFUL_SET: ResourceKind = ResourceKind::from_static("apps/v1/statefulsets");
    pub const DAEMON_SET: ResourceKind = ResourceKind::from_static("apps/v1/daemonsets");
    pub const REPLICA_SET: ResourceKind = ResourceKind::from_static("apps/v1/replicasets");
    pub const JOB: ResourceKind = ResourceKind::from_static("batch/v1/jobs");
    pub const CRON_JOB: ResourceKind = ResourceKind::from_static("batch/v1/cronjobs");
    pub const PRIORITY_CLASS: ResourceKind =
        ResourceKind::from_static("scheduling.k8s.io/v1/priorityclasses");
    pub const APPLICATION: ResourceKind =
        ResourceKind::from_static("argoproj.io/v1alpha1/applications");
    pub const APP_PROJECT: ResourceKind =
        ResourceKind::from_static("argoproj.io/v1alpha1/appprojects");
    pub const APPLICATION_RESOURCE: ResourceKind =
        ResourceKind::from_static("argoproj.io/v1alpha1/applicationresources");
    pub const CONTAINER: ResourceKind = ResourceKind::from_static("containers");
    pub const SECTION: ResourceKind = ResourceKind::from_static("sections");

    pub const fn from_static(s: &'static str) -> Self {
        ResourceKind(Cow::Borrowed(s))
    }

    pub fn new(s: impl Into<String>) -> Self {
        ResourceKind(Cow::Owned(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }

    fn tokens(&self) -> (&str, &str, &str) {
        let mut parts = self.0.rsplitn(3, '/');
        let r = parts.next().unwrap_or_default();
        let v = parts.next().unwrap_or_default();
        let g = parts.next().unwrap_or_default();
        (g, v, r)
    }

    /// API group, empty for the core group
    pub fn group(&self) -> &str {
        self.tokens().0
    }

    pub fn version(&self) -> &str {
        self.tokens().1
    }

    /// Plural resource name
    pub fn resource(&self) -> &str {
        self.tokens().2
    }

    /// `apiVersion` as it appears on objects of this kind
    pub fn api_version(&self) -> String {
        match self.group() {
            "" => self.version().to_string(),
            g => format!("{}/{}", g, self.version()),
        }
    }

    /// Object `kind` for this resource
    ///
    /// Known resources come from the registry, anything else gets a
    /// capitalized singular guess.
    pub fn kind_name(&self) -> String {
        if let Some(entry) = KINDS.iter().find(|e| e.gvr == self.as_str()) {
            return entry.kind_name.to_string();
        }
        let r = self.resource();
        let singular = r.strip_suffix('s').unwrap_or(r);
        let mut chars = singular.chars();
        match chars.next() {
            Some(c) => c.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// Whether objects of this kind live in a namespace
    pub fn is_namespaced(&self) -> bool {
        KINDS
            .iter()
            .find(|e| e.gvr == self.as_str())
            .map(|e| e.namespaced)
            .unwrap_or(true)
    }

    /// Resolve a command alias, a plural name or a full GVR string
    pub fn from_alias(alias: &str) -> Option<Self> {
        let alias = alias.trim().to_lowercase();
        KINDS
            .iter()
            .find(|e| {
                let kind = e.kind();
                kind.as_str() == alias
                    || kind.resource() == alias
                    || e.aliases.contains(&alias.as_str())
            })
            .map(KindEntry::kind)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceKind {
    fn from(s: &str) -> Self {
        ResourceKind::new(s)
    }
}

impl From<String> for ResourceKind {
    fn from(s: String) -> Self {
        ResourceKind::new(s)
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        kind.0.into_owned()
    }
}

/// Registry entry for a well-known resource kind
#[derive(Debug, Clone)]
pub struct KindEntry {
    pub gvr: &'static str,
    pub kind_name: &'static str,
    pub namespaced: bool,
    pub aliases: &'static [&'static str],
}

impl KindEntry {
    pub fn kind(&self) -> ResourceKind {
        ResourceKind::from_static(self.gvr)
    }
}

/// Well-known kinds the engine renders or references
pub const KINDS: &[KindEntry] = &[
    KindEntry {
        gvr: "v1/pods",
        kind_name: "Pod",
        namespaced: true,
        aliases: &["po", "pod"],
    },
    KindEntry {
        gvr: "v1/services",
        kind_name: "Service",
        namespaced: true,
        aliases: &["svc", "service"],
    },
    KindEntry {
        gvr: "v1/nodes",
        kind_name: "Node",
        namespaced: false,
        aliases: &["no", "node"],
    },
    KindEntry {
        gvr: "v1/namespaces",
        kind_name: "Namespace",
        namespaced: false,
        aliases: &["ns", "namespace"],
    },
    KindEntry {
        gvr: "v1/serviceaccounts",
        kind_name: "ServiceAccount",
        namespaced: true,
        aliases: &["sa", "serviceaccount"],
    },
    KindEntry {
        gvr: "v1/configmaps",
        kind_name: "ConfigMap",
        namespaced: true,
        aliases: &["cm", "configmap"],
    },
    KindEntry {
        gvr: "v1/secrets",
        kind_name: "Secret",
        namespaced: true,
        aliases: &["sec", "secret"],
    },
    KindEntry {
        gvr: "v1/persistentvolumeclaims",
        kind_name: "PersistentVolumeClaim",
        namespaced: true,
        aliases: &["pvc", "persistentvolumeclaim"],
    },
    KindEntry {
        gvr: "v1/persistentvolumes",
        kind_name: "PersistentVolume",
        namespaced: false,
        aliases: &["pv", "persistentvolume"],
    },
    KindEntry {
        gvr: "apps/v1/deployments",
        kind_name: "Deployment",
        namespaced: true,
        aliases: &["dp", "deploy", "deployment"],
    },
    KindEntry {
        gvr: "apps/v1/statefulsets",
        kind_name: "StatefulSet",
        namespaced: true,
        aliases: &["sts", "statefulset"],
    },
    KindEntry {
        gvr: "apps/v1/daemonsets",
        kind_name: "DaemonSet",
        namespaced: true,
        aliases: &["ds", "daemonset"],
    },
    KindEntry {
        gvr: "apps/v1/replicasets",
        kind_name: "ReplicaSet",
        namespaced: true,
        aliases: &["rs", "replicaset"],
    },
    KindEntry {
        gvr: "batch/v1/jobs",
        kind_name: "Job",
        namespaced: true,
        aliases: &["job"],
    },
    KindEntry {
        gvr: "batch/v1/cronjobs",
        kind_name: "CronJob",
        namespaced: true,
        aliases: &["cj", "cronjob"],
    },
    KindEntry {
        gvr: "scheduling.k8s.io/v1/priorityclasses",
        kind_name: "PriorityClass",
        namespaced: false,
        aliases: &["pc", "priorityclass"],
    },
    KindEntry {
        gvr: "argoproj.io/v1alpha1/applications",
        kind_name: "Application",
        namespaced: true,
        aliases: &["app", "apps", "application"],
    },
    KindEntry {
        gvr: "argoproj.io/v1alpha1/appprojects",
        kind_name: "AppProject",
        namespaced: true,
        aliases: &["appproj", "appproject"],
    },
];
