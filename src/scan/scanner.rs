//! Per-kind reference scanners

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{PodSpec, ServiceAccount};
use kube::core::DynamicObject;
use std::sync::Arc;

use super::refs::{
    has_config_map, has_pvc, has_priority_class, has_secret, service_account_matches,
};
use super::ScanError;
use crate::dao::{ResourceAccessor, Selector, decode};
use crate::models::{RefName, Ref, Refs, ResourceKind, fqn, namespaced};

/// What a scan is looking for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub kind: ResourceKind,
    /// `namespace/name` of the target, or bare name when cluster scoped
    pub fqn: String,
    pub wait: bool,
}

impl Target {
    pub fn new(kind: ResourceKind, fqn: impl Into<String>, wait: bool) -> Self {
        Self {
            kind,
            fqn: fqn.into(),
            wait,
        }
    }
}

/// A kind that can report its outbound references
#[async_trait]
pub trait RefScanner: Send + Sync {
    /// Kind of the objects this scanner lists
    fn kind(&self) -> ResourceKind;

    /// Objects of this kind that reference the target
    async fn scan(
        &self,
        accessor: &dyn ResourceAccessor,
        target: &Target,
    ) -> Result<Refs, ScanError>;

    /// Objects of this kind running as the target service account
    async fn scan_sa(
        &self,
        accessor: &dyn ResourceAccessor,
        target: &Target,
    ) -> Result<Refs, ScanError>;
}

/// Workload kinds carrying a pod template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    DaemonSet,
    Job,
    CronJob,
}

impl WorkloadKind {
    pub fn all() -> &'static [Self] {
        &[
            Self::Deployment,
            Self::StatefulSet,
            Self::DaemonSet,
            Self::Job,
            Self::CronJob,
        ]
    }

    pub fn resource_kind(&self) -> ResourceKind {
        match self {
            Self::Deployment => ResourceKind::DEPLOYMENT,
            Self::StatefulSet => ResourceKind::STATEFUL_SET,
            Self::DaemonSet => ResourceKind::DAEMON_SET,
            Self::Job => ResourceKind::JOB,
            Self::CronJob => ResourceKind::CRON_JOB,
        }
    }

    /// Pod template spec of a workload object
    pub fn pod_spec(&self, obj: &DynamicObject) -> anyhow::Result<Option<PodSpec>> {
        let spec = match self {
            Self::Deployment => decode::<Deployment>(obj)?
                .spec
                .and_then(|s| s.template.spec),
            Self::StatefulSet => decode::<StatefulSet>(obj)?
                .spec
                .and_then(|s| s.template.spec),
            Self::DaemonSet => decode::<DaemonSet>(obj)?
                .spec
                .and_then(|s| s.template.spec),
            Self::Job => decode::<Job>(obj)?.spec.and_then(|s| s.template.spec),
            Self::CronJob => decode::<CronJob>(obj)?
                .spec
                .and_then(|s| s.job_template.spec)
                .and_then(|s| s.template.spec),
        };
        Ok(spec)
    }
}

/// Scans one workload kind by walking its pod templates
#[derive(Debug, Clone, Copy)]
pub struct WorkloadScanner {
    workload: WorkloadKind,
}

impl WorkloadScanner {
    pub fn new(workload: WorkloadKind) -> Self {
        Self { workload }
    }

    async fn list(
        &self,
        accessor: &dyn ResourceAccessor,
        target: &Target,
    ) -> Result<Vec<(String, PodSpec)>, ScanError> {
        let (ns, _) = namespaced(&target.fqn);
        let objs = accessor
            .list(&self.workload.resource_kind(), ns, target.wait, &Selector::everything())
            .await?;
        let mut specs = Vec::with_capacity(objs.len());
        for obj in &objs {
            if let Some(spec) = self.workload.pod_spec(obj)? {
                let obj_ns = obj.metadata.namespace.as_deref().unwrap_or_default();
                let name = obj.metadata.name.as_deref().unwrap_or_default();
                specs.push((fqn(obj_ns, name), spec));
            }
        }
        Ok(specs)
    }

    fn to_ref(&self, path: String) -> Ref {
        Ref {
            kind: self.workload.resource_kind(),
            fqn: path,
        }
    }
}

/// Whether the named service account lists the secret
async fn sa_has_secret(
    accessor: &dyn ResourceAccessor,
    sa_fqn: &str,
    name: &str,
    wait: bool,
) -> Result<bool, ScanError> {
    let Some(obj) = accessor
        .get(&ResourceKind::SERVICE_ACCOUNT, sa_fqn, wait)
        .await?
    else {
        return Ok(false);
    };
    let sa: ServiceAccount = decode(&obj)?;
    Ok(sa
        .secrets
        .iter()
        .flatten()
        .any(|s| s.name.ref_name() == Some(name)))
}

#[async_trait]
impl RefScanner for WorkloadScanner {
    fn kind(&self) -> ResourceKind {
        self.workload.resource_kind()
    }

    async fn scan(
        &self,
        accessor: &dyn ResourceAccessor,
        target: &Target,
    ) -> Result<Refs, ScanError> {
        let (_, name) = namespaced(&target.fqn);
        let mut refs = Refs::new();
        for (path, spec) in self.list(accessor, target).await? {
            let hit = match &target.kind {
                k if *k == ResourceKind::CONFIG_MAP => has_config_map(&spec, name),
                k if *k == ResourceKind::SECRET => {
                    if has_secret(&spec, name) {
                        true
                    } else if let Some(sa) = spec.service_account_name.ref_name() {
                        let (ns, _) = namespaced(&path);
                        let sa_fqn = fqn(ns, sa);
                        match sa_has_secret(accessor, &sa_fqn, name, target.wait).await {
                            Ok(hit) => hit,
                            Err(e) => {
                                tracing::warn!("Skipping {}: {}", path, e);
                                continue;
                            }
                        }
                    } else {
                        false
                    }
                }
                k if *k == ResourceKind::PVC => has_pvc(&spec, name),
                k if *k == ResourceKind::PRIORITY_CLASS => has_priority_class(&spec, name),
                _ => false,
            };
            if hit {
                refs.push(self.to_ref(path));
            }
        }
        Ok(refs)
    }

    async fn scan_sa(
        &self,
        accessor: &dyn ResourceAccessor,
        target: &Target,
    ) -> Result<Refs, ScanError> {
        let (_, name) = namespaced(&target.fqn);
        Ok(self
            .list(accessor, target)
            .await?
            .into_iter()
            .filter(|(_, spec)| service_account_matches(spec, name))
            .map(|(path, _)| self.to_ref(path))
            .collect())
    }
}

/// Registry of every scanner-capable kind
pub fn scanners() -> Vec<Arc<dyn RefScanner>> {
    WorkloadKind::all()
        .iter()
        .map(|w| Arc::new(WorkloadScanner::new(*w)) as Arc<dyn RefScanner>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_covers_workloads() {
        let kinds: Vec<ResourceKind> = scanners().iter().map(|s| s.kind()).collect();
        assert_eq!(kinds.len(), 5);
        assert!(kinds.contains(&ResourceKind::CRON_JOB));
        assert!(kinds.contains(&ResourceKind::DAEMON_SET));
    }

    #[test]
    fn test_cron_job_pod_spec() {
        let obj: DynamicObject = serde_json::from_value(json!({
            "apiVersion": "batch/v1", "kind": "CronJob",
            "metadata": {"name": "cj", "namespace": "default"},
            "spec": {
                "schedule": "* * * * *",
                "jobTemplate": {"spec": {"template": {"spec": {
                    "containers": [{"name": "c1"}],
                    "priorityClassName": "high"
                }}}}
            }
        }))
        .unwrap();
        let spec = WorkloadKind::CronJob.pod_spec(&obj).unwrap().unwrap();
        assert!(has_priority_class(&spec, "high"));
    }

    #[tokio::test]
    async fn test_scan_list_failure() {
        let mut accessor = crate::dao::MockResourceAccessor::new();
        accessor
            .expect_list()
            .returning(|_, _, _, _| Err(anyhow::anyhow!("connection refused")));
        let scanner = WorkloadScanner::new(WorkloadKind::Job);
        let target = Target::new(ResourceKind::CONFIG_MAP, "default/cm1", true);
        let err = scanner.scan(&accessor, &target).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_service_account_failure_skips_workload() {
        let deployment = |name: &str, spec: serde_json::Value| -> DynamicObject {
            serde_json::from_value(json!({
                "apiVersion": "apps/v1", "kind": "Deployment",
                "metadata": {"name": name, "namespace": "default"},
                "spec": {
                    "selector": {"matchLabels": {"app": name}},
                    "template": {"metadata": {"labels": {"app": name}}, "spec": spec}
                }
            }))
            .unwrap()
        };
        let objs = vec![
            deployment(
                "direct",
                json!({"containers": [{"name": "c1", "envFrom": [{"secretRef": {"name": "s1"}}]}]}),
            ),
            deployment(
                "other",
                json!({"containers": [{"name": "c1"}], "serviceAccountName": "builder"}),
            ),
        ];

        let mut accessor = crate::dao::MockResourceAccessor::new();
        accessor
            .expect_list()
            .returning(move |_, _, _, _| Ok(objs.clone()));
        accessor
            .expect_get()
            .withf(|kind, fqn, _| *kind == ResourceKind::SERVICE_ACCOUNT && fqn == "default/builder")
            .times(1)
            .returning(|_, _, _| Err(anyhow::anyhow!("transient sa get failure")));

        let scanner = WorkloadScanner::new(WorkloadKind::Deployment);
        let target = Target::new(ResourceKind::SECRET, "default/s1", true);
        let refs = scanner.scan(&accessor, &target).await.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].fqn, "default/direct");
    }
}
