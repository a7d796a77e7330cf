//! In-memory page tree: construction, canonical state, search and
//! visibility.
//!
//! # Overview
//!
//! - [`build`]: flat node list -> linked [`Tree`].
//! - [`store`]: [`TreeStore`], the mutable state behind every view.
//! - [`search`]: title filter extended with ancestor chains.
//! - [`visible`]: ordered, depth-annotated list of rows to render.

pub mod build;
pub mod search;
pub mod store;
pub mod visible;

pub use build::{Tree, build_tree};
pub use search::{SearchState, filter_nodes};
pub use store::TreeStore;
pub use visible::{VisibleNode, visible_nodes};

use crate::error::ErrorCode;
use crate::model::NodeId;

/// Structural command rejected by [`TreeStore`]. The store is left
/// unchanged whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("parent not found: {0}")]
    ParentNotFound(NodeId),

    #[error("moving {node_id} under {proposed_parent} would create a cycle")]
    CycleDetected {
        node_id: NodeId,
        proposed_parent: NodeId,
    },

    #[error("node already exists: {0}")]
    DuplicateNode(NodeId),
}

impl TreeError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NodeNotFound(_) => ErrorCode::NodeNotFound,
            Self::ParentNotFound(_) => ErrorCode::ParentNotFound,
            Self::CycleDetected { .. } => ErrorCode::CycleDetected,
            Self::DuplicateNode(_) => ErrorCode::DuplicateNode,
        }
    }
}
