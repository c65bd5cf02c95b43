//! Pod spec reference matchers

use k8s_openapi::api::core::v1::{EnvFromSource, EnvVar, PodSpec};

use crate::models::RefName;

/// Service account used when a pod names none
pub const DEFAULT_SERVICE_ACCOUNT: &str = "default";

type EnvSources<'a> = (Option<&'a Vec<EnvVar>>, Option<&'a Vec<EnvFromSource>>);

/// Env and envFrom of every init, regular and ephemeral container
fn container_env(spec: &PodSpec) -> impl Iterator<Item = EnvSources<'_>> {
    let regular = spec
        .init_containers
        .iter()
        .flatten()
        .chain(spec.containers.iter())
        .map(|co| (co.env.as_ref(), co.env_from.as_ref()));
    let ephemeral = spec
        .ephemeral_containers
        .iter()
        .flatten()
        .map(|co| (co.env.as_ref(), co.env_from.as_ref()));
    regular.chain(ephemeral)
}

fn named(name: &impl RefName, target: &str) -> bool {
    name.ref_name() == Some(target)
}

/// Whether any env var, envFrom source or volume names the config map
pub fn has_config_map(spec: &PodSpec, name: &str) -> bool {
    let in_containers = container_env(spec).any(|(env, env_from)| {
        let env = env.into_iter().flatten().any(|e| {
            e.value_from
                .as_ref()
                .and_then(|v| v.config_map_key_ref.as_ref())
                .is_some_and(|r| named(&r.name, name))
        });
        let env_from = env_from
            .into_iter()
            .flatten()
            .any(|e| e.config_map_ref.as_ref().is_some_and(|r| named(&r.name, name)));
        env || env_from
    });
    in_containers
        || spec.volumes.iter().flatten().any(|v| {
            v.config_map.as_ref().is_some_and(|cm| named(&cm.name, name))
                || v.projected.as_ref().is_some_and(|p| {
                    p.sources
                        .iter()
                        .flatten()
                        .any(|s| s.config_map.as_ref().is_some_and(|cm| named(&cm.name, name)))
                })
        })
}

/// Whether the pod spec itself names the secret; service account secrets are
/// resolved by the caller
pub fn has_secret(spec: &PodSpec, name: &str) -> bool {
    let pull = spec
        .image_pull_secrets
        .iter()
        .flatten()
        .any(|s| named(&s.name, name));
    let in_containers = container_env(spec).any(|(env, env_from)| {
        let env = env.into_iter().flatten().any(|e| {
            e.value_from
                .as_ref()
                .and_then(|v| v.secret_key_ref.as_ref())
                .is_some_and(|r| named(&r.name, name))
        });
        let env_from = env_from
            .into_iter()
            .flatten()
            .any(|e| e.secret_ref.as_ref().is_some_and(|r| named(&r.name, name)));
        env || env_from
    });
    let in_volumes = spec.volumes.iter().flatten().any(|v| {
        v.secret
            .as_ref()
            .is_some_and(|s| named(&s.secret_name, name))
            || v.projected.as_ref().is_some_and(|p| {
                p.sources
                    .iter()
                    .flatten()
                    .any(|s| s.secret.as_ref().is_some_and(|sec| named(&sec.name, name)))
            })
    });
    pull || in_containers || in_volumes
}

pub fn has_pvc(spec: &PodSpec, name: &str) -> bool {
    spec.volumes.iter().flatten().any(|v| {
        v.persistent_volume_claim
            .as_ref()
            .is_some_and(|pvc| named(&pvc.claim_name, name))
    })
}

pub fn has_priority_class(spec: &PodSpec, name: &str) -> bool {
    named(&spec.priority_class_name, name)
}

/// Effective service account of a pod spec
pub fn service_account_name(spec: &PodSpec) -> &str {
    spec.service_account_name
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SERVICE_ACCOUNT)
}

pub fn service_account_matches(spec: &PodSpec, name: &str) -> bool {
    service_account_name(spec) == name
}
