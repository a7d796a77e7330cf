//! Drag-and-drop validation.
//!
//! The coordinator is input-agnostic: a view maps its pointer or keyboard
//! gestures onto [`DragCoordinator::start_drag`],
//! [`DragCoordinator::update_drop_target`] and
//! [`DragCoordinator::commit_drag`]. A drop target is valid unless it sits
//! inside the dragged selection, which is the only way a move can create a
//! cycle.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::error::ErrorCode;
use crate::model::{NodeId, TreeNode};
use crate::tree::Tree;

/// Where a drop lands relative to the candidate node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DropRelation {
    Before,
    After,
    Inside,
}

impl fmt::Display for DropRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Before => "before",
            Self::After => "after",
            Self::Inside => "inside",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropTarget {
    pub node_id: NodeId,
    pub relation: DropRelation,
    pub is_valid: bool,
}

/// The single active drag.
#[derive(Debug, Clone)]
pub struct DragSession {
    dragged_ids: Vec<NodeId>,
    snapshot: Vec<TreeNode>,
    drop_target: Option<DropTarget>,
}

impl DragSession {
    #[must_use]
    pub fn dragged_ids(&self) -> &[NodeId] {
        &self.dragged_ids
    }

    /// Nodes as they were when the drag started.
    #[must_use]
    pub fn snapshot(&self) -> &[TreeNode] {
        &self.snapshot
    }

    #[must_use]
    pub const fn drop_target(&self) -> Option<&DropTarget> {
        self.drop_target.as_ref()
    }
}

/// One reparent/reorder to send to the persistence port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveRequest {
    pub node_id: NodeId,
    pub new_parent_id: Option<NodeId>,
    pub new_position: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DragError {
    #[error("a drag is already in progress")]
    SessionActive,

    #[error("no drag in progress")]
    NoSession,

    #[error("nothing selected to drag")]
    EmptySelection,

    #[error("cannot drag unknown node {0}")]
    UnknownNode(NodeId),
}

impl DragError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::SessionActive => ErrorCode::DragSessionActive,
            Self::NoSession => ErrorCode::NoDragSession,
            Self::EmptySelection => ErrorCode::EmptySelection,
            Self::UnknownNode(_) => ErrorCode::NodeNotFound,
        }
    }
}

#[derive(Debug, Default)]
pub struct DragCoordinator {
    session: Option<DragSession>,
}

impl DragCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Begin dragging `ids`. Fails while another drag is active.
    pub fn start_drag(&mut self, tree: &Tree, ids: &[NodeId]) -> Result<(), DragError> {
        if self.session.is_some() {
            return Err(DragError::SessionActive);
        }
        if ids.is_empty() {
            return Err(DragError::EmptySelection);
        }

        let mut dragged_ids: Vec<NodeId> = Vec::with_capacity(ids.len());
        let mut snapshot = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(node) = tree.get(id.as_str()) else {
                return Err(DragError::UnknownNode(id.clone()));
            };
            if !dragged_ids.contains(id) {
                dragged_ids.push(id.clone());
                snapshot.push(node.clone());
            }
        }

        debug!(count = dragged_ids.len(), "drag started");
        self.session = Some(DragSession {
            dragged_ids,
            snapshot,
            drop_target: None,
        });
        Ok(())
    }

    /// Record `candidate` as the drop target and return whether a drop there
    /// is allowed. Returns `false` with no session.
    pub fn update_drop_target(
        &mut self,
        tree: &Tree,
        candidate: &str,
        relation: DropRelation,
    ) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        // Walk the tree as it is now; it may have been refetched mid-drag.
        let is_valid = tree.contains(candidate)
            && !session.dragged_ids.iter().any(|id| {
                id.as_str() == candidate || tree.is_descendant_of(candidate, id.as_str())
            });
        session.drop_target = Some(DropTarget {
            node_id: NodeId::from(candidate),
            relation,
            is_valid,
        });
        is_valid
    }

    /// Forget the current drop target without ending the drag.
    pub fn clear_drop_target(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.drop_target = None;
        }
    }

    /// Moves implied by dropping on the current target.
    ///
    /// Empty when there is no target or the target is invalid. Dragged
    /// nodes nested under another dragged node travel with their ancestor
    /// and get no request of their own.
    pub fn commit_drag(&self, tree: &Tree) -> Result<Vec<MoveRequest>, DragError> {
        let session = self.session.as_ref().ok_or(DragError::NoSession)?;
        let Some(target) = session.drop_target.as_ref().filter(|t| t.is_valid) else {
            return Ok(Vec::new());
        };
        let Some(candidate) = tree.get(target.node_id.as_str()) else {
            return Ok(Vec::new());
        };

        let (parent, base) = match target.relation {
            DropRelation::Inside => (
                Some(candidate.id.clone()),
                tree.next_position(Some(candidate.id.as_str())),
            ),
            DropRelation::Before => (candidate.parent_id.clone(), candidate.position),
            DropRelation::After => (
                candidate.parent_id.clone(),
                candidate.position.saturating_add(1),
            ),
        };

        let movers = session.dragged_ids.iter().filter(|id| {
            !session
                .dragged_ids
                .iter()
                .any(|other| tree.is_descendant_of(id.as_str(), other.as_str()))
        });

        Ok(movers
            .zip(0_i64..)
            .map(|(id, offset)| MoveRequest {
                node_id: id.clone(),
                new_parent_id: parent.clone(),
                new_position: base.saturating_add(offset),
            })
            .collect())
    }

    /// Clear the session whatever its state. Returns it for inspection.
    pub fn end_drag(&mut self) -> Option<DragSession> {
        let ended = self.session.take();
        if ended.is_some() {
            debug!("drag ended");
        }
        ended
    }
}
