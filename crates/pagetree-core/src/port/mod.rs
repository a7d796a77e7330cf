//! Persistence boundary.
//!
//! [`PersistencePort`] is everything the navigator needs from storage. Two
//! adapters ship with the crate:
//!
//! - [`sqlite::SqlitePort`]: the local workspace database used by `pt`.
//! - [`memory::MemoryPort`]: in-process, with failure injection for tests.
//!
//! Fetches take `&self`; mutations take `&mut self`. The navigator is the
//! only caller and serializes every call.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryPort;
pub use sqlite::SqlitePort;

use crate::error::ErrorCode;
use crate::model::{AccessEntry, AccessRole, NodeId, TreeNode, Version};

/// Failure reported by a persistence adapter.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("parent not found: {0}")]
    ParentNotFound(NodeId),

    #[error("moving {node_id} under {parent_id} would create a cycle")]
    Cycle { node_id: NodeId, parent_id: NodeId },

    #[error("{node_id} must keep at least one owner")]
    LastOwner { node_id: NodeId },

    #[error("title must not be empty")]
    EmptyTitle,

    #[error("{0}")]
    Rejected(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization: {0}")]
    Json(#[from] serde_json::Error),
}

impl PortError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NodeNotFound(_) => ErrorCode::NodeNotFound,
            Self::ParentNotFound(_) => ErrorCode::ParentNotFound,
            Self::Cycle { .. } => ErrorCode::CycleDetected,
            Self::LastOwner { .. } => ErrorCode::LastOwner,
            Self::EmptyTitle | Self::Rejected(_) => ErrorCode::OperationRejected,
            Self::Unavailable(_) | Self::Sqlite(_) => ErrorCode::StorageFailure,
            Self::Json(_) => ErrorCode::InternalUnexpected,
        }
    }
}

/// Storage operations consumed by the navigator.
///
/// Structural mutations return `Ok(false)` when the addressed node does not
/// exist and `Err` when the store refuses the change.
pub trait PersistencePort {
    /// Every node of `space_id`, flat, each with its `parent_id`,
    /// `position` and `child_count`.
    fn fetch_tree(&self, space_id: &str) -> Result<Vec<TreeNode>, PortError>;

    /// Create a page at the end of `parent_id`'s children (`None` = root).
    fn create_node(
        &mut self,
        space_id: &str,
        parent_id: Option<&str>,
        title: &str,
    ) -> Result<TreeNode, PortError>;

    fn move_node(
        &mut self,
        node_id: &str,
        new_parent_id: Option<&str>,
        new_position: i64,
    ) -> Result<bool, PortError>;

    /// Delete `node_id` and its whole subtree.
    fn delete_node(&mut self, node_id: &str) -> Result<bool, PortError>;

    /// Duplicate `node_id` as the sibling right after it.
    fn copy_node(&mut self, node_id: &str) -> Result<TreeNode, PortError>;

    /// Change the title and record a version.
    fn rename_node(&mut self, node_id: &str, title: &str) -> Result<TreeNode, PortError>;

    /// Newest first.
    fn fetch_version_history(&self, node_id: &str) -> Result<Vec<Version>, PortError>;

    fn restore_version(&mut self, node_id: &str, version_id: &str) -> Result<bool, PortError>;

    /// Strongest role first.
    fn fetch_access_list(&self, node_id: &str) -> Result<Vec<AccessEntry>, PortError>;

    /// Add `user` or change their role.
    fn grant_access(
        &mut self,
        node_id: &str,
        user: &str,
        role: AccessRole,
    ) -> Result<AccessEntry, PortError>;

    /// `Ok(false)` when `user` has no entry on `node_id`.
    fn update_access_role(
        &mut self,
        node_id: &str,
        user: &str,
        role: AccessRole,
    ) -> Result<bool, PortError>;

    fn revoke_access(&mut self, node_id: &str, user: &str) -> Result<bool, PortError>;
}

/// Derive a `pg-` id from `seed`. `attempt` lengthens the hash so callers
/// can retry on collision.
#[must_use]
pub fn derive_node_id(seed: &str, attempt: u32) -> NodeId {
    let hash = blake3::hash(format!("{seed}:{attempt}").as_bytes());
    let hex = hash.to_hex();
    let extra = usize::try_from(attempt).unwrap_or(usize::MAX);
    let len = 6_usize.saturating_add(extra).min(hex.len());
    NodeId::new(format!("pg-{}", &hex.as_str()[..len]))
}

/// Reject a role change that would leave `entries` without an owner.
pub(crate) fn check_last_owner(
    node_id: &str,
    entries: &[AccessEntry],
    user: &str,
    next: Option<AccessRole>,
) -> Result<(), PortError> {
    let is_owner = entries
        .iter()
        .any(|e| e.user == user && e.role == AccessRole::Owner);
    let stays_owner = next == Some(AccessRole::Owner);
    if !is_owner || stays_owner {
        return Ok(());
    }
    let owners = entries.iter().filter(|e| e.role == AccessRole::Owner).count();
    if owners <= 1 {
        return Err(PortError::LastOwner {
            node_id: NodeId::from(node_id),
        });
    }
    Ok(())
}

/// Strongest role first, then by user.
pub(crate) fn sort_access(entries: &mut [AccessEntry]) {
    entries.sort_by(|a, b| b.role.cmp(&a.role).then_with(|| a.user.cmp(&b.user)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(user: &str, role: AccessRole) -> AccessEntry {
        AccessEntry {
            user: user.into(),
            role,
            granted_at: Utc::now(),
        }
    }

    #[test]
    fn derived_ids_are_prefixed_and_grow_on_retry() {
        let first = derive_node_id("seed", 0);
        let retry = derive_node_id("seed", 1);
        assert!(first.as_str().starts_with("pg-"));
        assert_eq!(first.as_str().len(), 9);
        assert_eq!(retry.as_str().len(), 10);
        assert_eq!(first, derive_node_id("seed", 0));
    }

    #[test]
    fn last_owner_cannot_leave() {
        let roster = vec![entry("ada", AccessRole::Owner), entry("bob", AccessRole::Edit)];
        assert!(matches!(
            check_last_owner("pg-1", &roster, "ada", None),
            Err(PortError::LastOwner { .. })
        ));
        assert!(check_last_owner("pg-1", &roster, "ada", Some(AccessRole::Admin)).is_err());
        assert!(check_last_owner("pg-1", &roster, "ada", Some(AccessRole::Owner)).is_ok());
        assert!(check_last_owner("pg-1", &roster, "bob", None).is_ok());
    }

    #[test]
    fn second_owner_allows_downgrade() {
        let roster = vec![entry("ada", AccessRole::Owner), entry("bob", AccessRole::Owner)];
        assert!(check_last_owner("pg-1", &roster, "ada", Some(AccessRole::View)).is_ok());
    }

    #[test]
    fn access_sorts_strongest_first() {
        let mut roster = vec![
            entry("zed", AccessRole::View),
            entry("bob", AccessRole::Owner),
            entry("amy", AccessRole::View),
        ];
        sort_access(&mut roster);
        let users: Vec<&str> = roster.iter().map(|e| e.user.as_str()).collect();
        assert_eq!(users, vec!["bob", "amy", "zed"]);
    }

    #[test]
    fn error_codes_map() {
        assert_eq!(PortError::EmptyTitle.code(), ErrorCode::OperationRejected);
        assert_eq!(
            PortError::LastOwner {
                node_id: "pg-1".into()
            }
            .code(),
            ErrorCode::LastOwner
        );
    }
}
