//! kxray library
//!
//! Resource dependency graphs ("X-Ray" trees) and cluster-wide reference
//! scans for Kubernetes. Used by the `kxray` binary and by the test suites.

pub mod cli;
pub mod config;
pub mod dao;
pub mod kube;
pub mod models;
pub mod scan;
pub mod xray;

pub use dao::{KubeAccessor, MemoryAccessor, ResourceAccessor, Selector};
pub use models::{Ref, Refs, ResourceKind};
pub use scan::{ScanParams, scan_for_refs, scan_for_sa_refs};
pub use xray::{NodeSpec, Status, Tree, XrayError, XrayModel};
