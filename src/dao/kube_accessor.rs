//! Live accessor over the Kubernetes API
//!
//! Every call goes straight to the API server, so reads are always fresh and
//! the wait flag has nothing to wait for.

use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::Api;
use kube::api::ListParams;
use kube::core::{ApiResource, DynamicObject};

use super::{ResourceAccessor, Selector};
use crate::models::{ResourceKind, is_all_namespaces, namespaced};

/// Resource accessor backed by a `kube::Client`
#[derive(Clone)]
pub struct KubeAccessor {
    client: kube::Client,
}

impl KubeAccessor {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &kube::Client {
        &self.client
    }

    fn api(&self, kind: &ResourceKind, namespace: &str) -> Api<DynamicObject> {
        let ar = api_resource(kind);
        if !kind.is_namespaced() || is_all_namespaces(namespace) {
            Api::all_with(self.client.clone(), &ar)
        } else {
            Api::namespaced_with(self.client.clone(), namespace, &ar)
        }
    }
}

/// Build the dynamic API descriptor for a resource kind
pub fn api_resource(kind: &ResourceKind) -> ApiResource {
    ApiResource {
        group: kind.group().to_string(),
        version: kind.version().to_string(),
        api_version: kind.api_version(),
        kind: kind.kind_name(),
        plural: kind.resource().to_string(),
    }
}

#[async_trait]
impl ResourceAccessor for KubeAccessor {
    async fn get(
        &self,
        kind: &ResourceKind,
        fqn: &str,
        wait: bool,
    ) -> Result<Option<DynamicObject>> {
        tracing::trace!("get {} {} (wait={})", kind, fqn, wait);
        let (ns, name) = namespaced(fqn);
        self.api(kind, ns)
            .get_opt(name)
            .await
            .with_context(|| format!("Failed to fetch {} {}", kind, fqn))
    }

    async fn list(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        wait: bool,
        selector: &Selector,
    ) -> Result<Vec<DynamicObject>> {
        tracing::trace!(
            "list {} in {:?} matching {} (wait={})",
            kind,
            namespace,
            selector,
            wait
        );
        let mut lp = ListParams::default().labels_from(selector.label_selector());
        if let Some(fields) = selector.field_query() {
            lp = lp.fields(&fields);
        }
        let list = self
            .api(kind, namespace)
            .list(&lp)
            .await
            .with_context(|| format!("Failed to list {} in {:?}", kind, namespace))?;
        Ok(list.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_resource_core() {
        let ar = api_resource(&ResourceKind::POD);
        assert_eq!(ar.group, "");
        assert_eq!(ar.version, "v1");
        assert_eq!(ar.api_version, "v1");
        assert_eq!(ar.kind, "Pod");
        assert_eq!(ar.plural, "pods");
    }

    #[test]
    fn test_api_resource_grouped() {
        let ar = api_resource(&ResourceKind::CRON_JOB);
        assert_eq!(ar.group, "batch");
        assert_eq!(ar.api_version, "batch/v1");
        assert_eq!(ar.kind, "CronJob");
        assert_eq!(ar.plural, "cronjobs");
    }
}
