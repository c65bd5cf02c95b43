//! Node status classification
//!
//! Each renderer stamps exactly one [`Status`] on its own node. Statuses are
//! recomputed on every build and never propagate to ancestors.

use k8s_openapi::api::core::v1::{ContainerStatus, Pod};
use std::fmt;
use std::str::FromStr;

/// Health tag stored under the `status` extras key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    /// Replica or readiness mismatch
    Toast,
    /// Terminal success, e.g. a finished pod
    Completed,
    /// A referenced object does not exist and is not optional
    MissingRef,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Toast => "toast",
            Status::Completed => "completed",
            Status::MissingRef => "noref",
        }
    }

    pub fn parse_optional(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    pub fn all() -> &'static [Self] {
        &[
            Status::Ok,
            Status::Toast,
            Status::Completed,
            Status::MissingRef,
        ]
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::all()
            .iter()
            .copied()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| format!("Unknown status: {}", s))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const PHASE_COMPLETED: &str = "Completed";
pub const PHASE_RUNNING: &str = "Running";
pub const PHASE_TERMINATING: &str = "Terminating";
pub const PHASE_UNKNOWN: &str = "Unknown";
const NODE_LOST: &str = "NodeLost";
const POD_INITIALIZING: &str = "PodInitializing";

/// Derive the display phase of a pod from its container statuses
pub fn pod_phase(pod: &Pod) -> String {
    let deleting = pod.metadata.deletion_timestamp.is_some();
    let Some(st) = pod.status.as_ref() else {
        return if deleting {
            PHASE_TERMINATING.to_string()
        } else {
            String::new()
        };
    };

    let mut phase = st.phase.clone().unwrap_or_default();
    if let Some(reason) = st.reason.as_deref().filter(|r| !r.is_empty()) {
        if deleting && reason == NODE_LOST {
            return PHASE_UNKNOWN.to_string();
        }
        phase = reason.to_string();
    }

    if let Some(init) = init_container_phase(pod) {
        return init;
    }

    let (phase, running) = container_phase(
        st.container_statuses.as_deref().unwrap_or_default(),
        phase,
    );
    let phase = if running && phase == PHASE_COMPLETED {
        PHASE_RUNNING.to_string()
    } else {
        phase
    };
    if deleting {
        return PHASE_TERMINATING.to_string();
    }
    phase
}

fn init_container_phase(pod: &Pod) -> Option<String> {
    let inits = pod
        .spec
        .as_ref()
        .map(|s| s.init_containers.as_deref().unwrap_or_default())
        .unwrap_or_default();
    let statuses = pod
        .status
        .as_ref()
        .and_then(|s| s.init_container_statuses.as_deref())
        .unwrap_or_default();

    statuses.iter().enumerate().find_map(|(i, cs)| {
        let sidecar = inits
            .iter()
            .any(|c| c.name == cs.name && c.restart_policy.as_deref() == Some("Always"));
        init_container_status(cs, i, inits.len(), sidecar)
    })
}

fn init_container_status(
    cs: &ContainerStatus,
    index: usize,
    count: usize,
    sidecar: bool,
) -> Option<String> {
    let state = cs.state.as_ref();
    if let Some(t) = state.and_then(|s| s.terminated.as_ref()) {
        if t.exit_code == 0 {
            return None;
        }
        if let Some(reason) = t.reason.as_deref().filter(|r| !r.is_empty()) {
            return Some(format!("Init:{}", reason));
        }
        if let Some(sig) = t.signal.filter(|s| *s != 0) {
            return Some(format!("Init:Signal:{}", sig));
        }
        return Some(format!("Init:ExitCode:{}", t.exit_code));
    }
    if sidecar && cs.started == Some(true) {
        if cs.ready {
            return None;
        }
    } else if let Some(reason) = state
        .and_then(|s| s.waiting.as_ref())
        .and_then(|w| w.reason.as_deref())
        .filter(|r| !r.is_empty() && *r != POD_INITIALIZING)
    {
        return Some(format!("Init:{}", reason));
    }
    Some(format!("Init:{}/{}", index, count))
}

fn container_phase(statuses: &[ContainerStatus], mut phase: String) -> (String, bool) {
    let mut running = false;
    for cs in statuses.iter().rev() {
        let Some(state) = cs.state.as_ref() else {
            continue;
        };
        let waiting = state
            .waiting
            .as_ref()
            .and_then(|w| w.reason.as_deref())
            .filter(|r| !r.is_empty());
        if let Some(reason) = waiting {
            phase = reason.to_string();
        } else if let Some(t) = state.terminated.as_ref() {
            phase = match t.reason.as_deref().filter(|r| !r.is_empty()) {
                Some(reason) => reason.to_string(),
                None => match t.signal.filter(|s| *s != 0) {
                    Some(sig) => format!("Signal:{}", sig),
                    None => format!("ExitCode:{}", t.exit_code),
                },
            };
        } else if cs.ready && state.running.is_some() {
            running = true;
        }
    }
    (phase, running)
}

/// Classify a pod and produce its `ready/total` info string
pub fn pod_status(pod: &Pod) -> (Status, String) {
    let phase = pod_phase(pod);
    let statuses = pod
        .status
        .as_ref()
        .and_then(|s| s.container_statuses.as_deref())
        .unwrap_or_default();
    let total = pod
        .spec
        .as_ref()
        .map(|s| s.containers.len())
        .unwrap_or(statuses.len())
        .max(statuses.len());
    let ready = statuses.iter().filter(|cs| cs.ready).count();

    let status = if phase == PHASE_COMPLETED {
        Status::Completed
    } else if ready != total {
        Status::Toast
    } else {
        Status::Ok
    };
    (status, format!("{}/{}", ready, total))
}

/// Desired vs observed replica rule shared by the workload kinds
///
/// A missing desired count is treated as zero.
pub fn replica_status(desired: Option<i32>, observed: Option<i32>) -> Status {
    if desired.unwrap_or(0) != observed.unwrap_or(0) {
        Status::Toast
    } else {
        Status::Ok
    }
}

/// Existence check outcome for a referenced object
pub fn ref_status(found: bool, optional: Option<bool>) -> Status {
    if found || optional.unwrap_or(false) {
        Status::Ok
    } else {
        Status::MissingRef
    }
}
