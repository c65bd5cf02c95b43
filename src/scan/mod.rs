//! Cluster-wide reference scanning
//!
//! Answers "who points at this object" by running every registered scanner
//! concurrently and merging what they find. Results come back in no
//! particular order. A scanner that fails contributes nothing, and a
//! cancelled budget yields whatever was gathered so far.

mod refs;
mod scanner;

pub use refs::{
    DEFAULT_SERVICE_ACCOUNT, has_config_map, has_priority_class, has_pvc, has_secret,
    service_account_matches, service_account_name,
};
pub use scanner::{RefScanner, Target, WorkloadKind, WorkloadScanner, scanners};

use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::dao::ResourceAccessor;
use crate::models::{Ref, Refs, ResourceKind};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("missing required scan parameter: {0}")]
    MissingParam(&'static str),

    #[error(transparent)]
    Access(#[from] anyhow::Error),
}

/// Inputs of a scan, checked once at entry
#[derive(Debug, Clone, Default)]
pub struct ScanParams {
    pub target_kind: Option<ResourceKind>,
    pub target_path: Option<String>,
    pub wait: Option<bool>,
}

impl ScanParams {
    pub fn new(kind: ResourceKind, path: impl Into<String>) -> Self {
        Self {
            target_kind: Some(kind),
            target_path: Some(path.into()),
            wait: None,
        }
    }

    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = Some(wait);
        self
    }

    fn target(&self, require_wait: bool) -> Result<Target, ScanError> {
        let kind = self
            .target_kind
            .clone()
            .ok_or(ScanError::MissingParam("target kind"))?;
        let path = self
            .target_path
            .clone()
            .filter(|p| !p.is_empty())
            .ok_or(ScanError::MissingParam("target path"))?;
        let wait = match self.wait {
            Some(wait) => wait,
            None if require_wait => return Err(ScanError::MissingParam("wait flag")),
            None => {
                tracing::warn!("No wait flag given for {} scan, reading from cache", kind);
                false
            }
        };
        Ok(Target::new(kind, path, wait))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    References,
    ServiceAccount,
}

/// Find every workload referencing the target
pub async fn scan_for_refs(
    accessor: Arc<dyn ResourceAccessor>,
    params: &ScanParams,
    budget: &CancellationToken,
) -> Result<Refs, ScanError> {
    let target = params.target(false)?;
    Ok(run_scan(accessor, scanners(), target, Lookup::References, budget).await)
}

/// Find every workload running as the target service account
pub async fn scan_for_sa_refs(
    accessor: Arc<dyn ResourceAccessor>,
    params: &ScanParams,
    budget: &CancellationToken,
) -> Result<Refs, ScanError> {
    let target = params.target(true)?;
    Ok(run_scan(accessor, scanners(), target, Lookup::ServiceAccount, budget).await)
}

/// Reference scan over a caller supplied scanner set
pub async fn scan_with(
    accessor: Arc<dyn ResourceAccessor>,
    scanners: Vec<Arc<dyn RefScanner>>,
    params: &ScanParams,
    budget: &CancellationToken,
) -> Result<Refs, ScanError> {
    let target = params.target(false)?;
    Ok(run_scan(accessor, scanners, target, Lookup::References, budget).await)
}

async fn run_scan(
    accessor: Arc<dyn ResourceAccessor>,
    scanners: Vec<Arc<dyn RefScanner>>,
    target: Target,
    lookup: Lookup,
    budget: &CancellationToken,
) -> Refs {
    let started = Instant::now();
    let (tx, mut rx) = mpsc::channel::<Ref>(scanners.len().max(1));

    let mut handles = Vec::with_capacity(scanners.len());
    for scanner in scanners {
        let tx = tx.clone();
        let accessor = accessor.clone();
        let target = target.clone();
        let budget = budget.clone();
        handles.push(tokio::spawn(async move {
            if budget.is_cancelled() {
                return;
            }
            let scan = async {
                match lookup {
                    Lookup::References => scanner.scan(accessor.as_ref(), &target).await,
                    Lookup::ServiceAccount => scanner.scan_sa(accessor.as_ref(), &target).await,
                }
            };
            let found = tokio::select! {
                biased;
                _ = budget.cancelled() => return,
                res = scan => res,
            };
            let refs = match found {
                Ok(refs) => refs,
                Err(e) => {
                    tracing::warn!("{} scan for {} failed: {}", scanner.kind(), target.fqn, e);
                    return;
                }
            };
            for r in refs {
                tokio::select! {
                    biased;
                    _ = budget.cancelled() => return,
                    sent = tx.send(r) => {
                        if sent.is_err() {
                            return;
                        }
                    }
                }
            }
        }));
    }
    // Only the producers hold senders now, so the queue closes once they return
    drop(tx);

    let barrier = tokio::spawn(async move {
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("Scan task aborted: {}", e);
            }
        }
    });

    let mut refs = Refs::new();
    while let Some(r) = rx.recv().await {
        refs.push(r);
    }
    if let Err(e) = barrier.await {
        tracing::warn!("Scan completion task aborted: {}", e);
    }

    tracing::debug!(
        "Scanned {} {} refs in {:?}",
        refs.len(),
        target.kind,
        started.elapsed()
    );
    refs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_validation() {
        let err = ScanParams::default().target(false).unwrap_err();
        assert_eq!(err.to_string(), "missing required scan parameter: target kind");

        let params = ScanParams {
            target_kind: Some(ResourceKind::SECRET),
            ..Default::default()
        };
        let err = params.target(false).unwrap_err();
        assert_eq!(err.to_string(), "missing required scan parameter: target path");

        let params = ScanParams::new(ResourceKind::SECRET, "default/s1");
        assert!(!params.target(false).unwrap().wait);
        assert!(matches!(
            params.target(true),
            Err(ScanError::MissingParam("wait flag"))
        ));
        assert!(params.with_wait(true).target(true).unwrap().wait);
    }
}
