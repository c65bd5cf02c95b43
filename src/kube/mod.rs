//! Kubernetes client construction
//!
//! Loads kubeconfig (or in-cluster config), optionally switching context,
//! and keeps traffic to internal API servers off corporate proxies.

use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use url::Url;

use crate::models::NAMESPACE_ALL;

/// Build a client for the given kubeconfig context, or the current one
///
/// Loading order when no context is given:
/// 1. In-cluster config (if running in a pod)
/// 2. KUBECONFIG environment variable
/// 3. ~/.kube/config
pub async fn create_client(context: Option<&str>) -> Result<Client> {
    let mut config = match context {
        Some(ctx) => {
            let options = KubeConfigOptions {
                context: Some(ctx.to_string()),
                ..Default::default()
            };
            Config::from_kubeconfig(&options)
                .await
                .with_context(|| format!("Failed to load kubeconfig context {}", ctx))?
        }
        None => Config::infer().await.context("Failed to infer kube config")?,
    };

    if let Ok(url) = Url::parse(&config.cluster_url.to_string()) {
        if let Some(host) = url.host_str() {
            if config.proxy_url.is_some() && bypass_proxy(host, &no_proxy_env()) {
                tracing::debug!("Bypassing proxy for internal API server {}", host);
                config.proxy_url = None;
            }
        }
    }

    Client::try_from(config).context("Failed to create Kubernetes client")
}

/// Name of the current kubeconfig context, if any
pub fn current_context() -> Option<String> {
    Kubeconfig::read()
        .ok()
        .and_then(|kc| kc.current_context)
        .filter(|c| !c.is_empty())
}

/// Pick the namespace to render: explicit flag, then configured default
///
/// Returns an empty string for all namespaces.
pub fn resolve_namespace(flag: Option<&str>, default: &str) -> String {
    let ns = flag.unwrap_or(default);
    if ns == NAMESPACE_ALL || ns == "-A" {
        return String::new();
    }
    ns.to_string()
}

fn no_proxy_env() -> String {
    std::env::var("NO_PROXY")
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| std::env::var("no_proxy").ok())
        .unwrap_or_default()
}

/// Whether a proxied connection to `host` should go direct instead
///
/// Internal hosts are sent direct unless NO_PROXY already covers them,
/// in which case the client honours it on its own.
fn bypass_proxy(host: &str, no_proxy: &str) -> bool {
    is_internal_host(host) && !no_proxy_contains(no_proxy, host)
}

/// Heuristic for private or corporate-internal API server hosts
fn is_internal_host(host: &str) -> bool {
    const PRIVATE_PREFIXES: &[&str] = &["10.", "172.", "192.168.", "127."];
    const INTERNAL_SUFFIXES: &[&str] = &[".local", ".internal", ".cluster.local"];
    const INTERNAL_DOMAINS: &[&str] = &["corp", "internal", "int", "local"];
    const ENV_LABELS: &[&str] = &["dev", "test", "staging", "qa", "uat", "internal"];

    if host == "localhost" || host == "::1" || PRIVATE_PREFIXES.iter().any(|p| host.starts_with(p))
    {
        return true;
    }
    if INTERNAL_SUFFIXES.iter().any(|s| host.ends_with(s)) {
        return true;
    }

    let labels: Vec<&str> = host.split('.').collect();
    let Some((_tld, rest)) = labels.split_last() else {
        return false;
    };
    if rest
        .last()
        .is_some_and(|domain| INTERNAL_DOMAINS.contains(domain))
    {
        return true;
    }
    rest.iter()
        .any(|label| ENV_LABELS.iter().any(|env| label.starts_with(env)))
}

/// Whether a NO_PROXY list already covers `host`
///
/// Entries match exactly, as a parent domain, or with a leading dot as a
/// domain suffix.
fn no_proxy_contains(no_proxy: &str, host: &str) -> bool {
    no_proxy
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .any(|entry| {
            let domain = entry.strip_prefix('.').unwrap_or(entry);
            host == domain || host.ends_with(&format!(".{}", domain))
        })
}
