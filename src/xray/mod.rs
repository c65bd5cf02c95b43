//! X-Ray resource dependency engine
//!
//! Given a root resource kind, renderers walk each object's relationships
//! through a [`ResourceAccessor`](crate::dao::ResourceAccessor) and grow a
//! [`Tree`] of everything it depends on, stamping a [`Status`] on every node.
//! The tree can then be flattened, filtered, re-hydrated and diffed.

pub mod filter;
mod model;
pub mod render;
mod sort;
mod spec;
pub mod status;
mod tree;

pub use filter::{Query, filter_tree};
pub use model::XrayModel;
pub use render::{AppResource, RenderContext, RenderInput, Renderer, SectionInput, TableRow};
pub use sort::{natural_cmp, natural_less};
pub use spec::{NodeSpec, PATH_SEPARATOR};
pub use status::Status;
pub use tree::{Extras, INFO_KEY, NodeId, STATUS_KEY, Tree, TreeNode, diff_trees};

use thiserror::Error;

/// Errors raised while building a tree
#[derive(Debug, Error)]
pub enum XrayError {
    /// A renderer was handed the wrong kind of input
    #[error("expected {expected} but got {actual}")]
    UnexpectedInput {
        expected: &'static str,
        actual: String,
    },

    #[error("expecting a TreeNode parent but none was set")]
    MissingParent,

    #[error("failed to decode {kind}: {source}")]
    Decode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid selector on {fqn}: {reason}")]
    InvalidSelector { fqn: String, reason: String },

    #[error("render budget exhausted")]
    Cancelled,

    #[error(transparent)]
    Access(#[from] anyhow::Error),
}
