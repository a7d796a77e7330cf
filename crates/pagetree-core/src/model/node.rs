use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::ops::Deref;
use std::{fmt, str::FromStr};

/// Opaque, stable node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for NodeId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Deref for NodeId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

/// Editorial status of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Draft,
    InReview,
    Approved,
    Archived,
}

impl Status {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InReview => "in_review",
            Self::Approved => "approved",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "draft" => Ok(Self::Draft),
            "in_review" | "review" => Ok(Self::InReview),
            "approved" => Ok(Self::Approved),
            "archived" => Ok(Self::Archived),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

/// A colored tag attached to a page. Order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
    pub color: String,
}

/// A page as reported by the persistence service.
///
/// Hierarchy is expressed only through `parent_id`; the ordered children of
/// a node are derived by [`crate::tree::Tree`] and never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: NodeId,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default = "default_space")]
    pub space_id: String,
    pub title: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub has_unpublished_changes: bool,
    #[serde(default)]
    pub position: i64,
    /// Server-reported child count; may exceed the number of loaded children.
    #[serde(default)]
    pub child_count: u32,
    #[serde(default)]
    pub author: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl TreeNode {
    /// Minimal node used by tests, imports and the in-memory port.
    pub fn new(id: impl Into<NodeId>, parent_id: Option<NodeId>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            parent_id,
            space_id: default_space(),
            title: title.into(),
            icon: None,
            status: Status::Draft,
            labels: Vec::new(),
            has_unpublished_changes: false,
            position: 0,
            child_count: 0,
            author: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_position(mut self, position: i64) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn in_space(mut self, space_id: impl Into<String>) -> Self {
        self.space_id = space_id.into();
        self
    }
}

/// Partial update applied by [`crate::tree::TreeStore::update_node`].
///
/// Structural fields (parent, position) are deliberately absent: those only
/// change through `move_node`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePatch {
    pub title: Option<String>,
    pub icon: Option<Option<String>>,
    pub status: Option<Status>,
    pub labels: Option<Vec<Label>>,
    pub has_unpublished_changes: Option<bool>,
}

impl NodePatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.icon.is_none()
            && self.status.is_none()
            && self.labels.is_none()
            && self.has_unpublished_changes.is_none()
    }

    /// Apply the set fields to `node`. Returns `true` if anything was set.
    pub fn apply_to(&self, node: &mut TreeNode) -> bool {
        if self.is_empty() {
            return false;
        }
        if let Some(title) = &self.title {
            node.title.clone_from(title);
        }
        if let Some(icon) = &self.icon {
            node.icon.clone_from(icon);
        }
        if let Some(status) = self.status {
            node.status = status;
        }
        if let Some(labels) = &self.labels {
            node.labels.clone_from(labels);
        }
        if let Some(flag) = self.has_unpublished_changes {
            node.has_unpublished_changes = flag;
        }
        true
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

pub(crate) fn default_space() -> String {
    "default".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_coerces_to_str() {
        fn takes_str(raw: &str) -> usize {
            raw.len()
        }
        let id = NodeId::from("pg-abc");
        assert_eq!(takes_str(&id), 6);
        assert!(id.starts_with("pg-"));
    }

    #[test]
    fn status_parses_common_spellings() {
        assert_eq!("draft".parse::<Status>(), Ok(Status::Draft));
        assert_eq!("IN_REVIEW".parse::<Status>(), Ok(Status::InReview));
        assert_eq!("in-review".parse::<Status>(), Ok(Status::InReview));
        assert_eq!(" Approved ".parse::<Status>(), Ok(Status::Approved));
        assert!("published".parse::<Status>().is_err());
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&Status::InReview).expect("serialize");
        assert_eq!(json, "\"IN_REVIEW\"");
    }

    #[test]
    fn node_deserializes_with_defaults() {
        let node: TreeNode =
            serde_json::from_str(r#"{"id":"pg-1","title":"Home"}"#).expect("parse minimal node");
        assert_eq!(node.id.as_str(), "pg-1");
        assert!(node.parent_id.is_none());
        assert_eq!(node.space_id, "default");
        assert_eq!(node.status, Status::Draft);
        assert_eq!(node.position, 0);
    }

    #[test]
    fn patch_applies_only_set_fields() {
        let mut node = TreeNode::new("pg-1", None, "Old");
        node.icon = Some("📄".into());
        let patch = NodePatch {
            title: Some("New".into()),
            status: Some(Status::Approved),
            ..NodePatch::default()
        };
        assert!(patch.apply_to(&mut node));
        assert_eq!(node.title, "New");
        assert_eq!(node.status, Status::Approved);
        assert_eq!(node.icon.as_deref(), Some("📄"));
    }

    #[test]
    fn empty_patch_is_a_no_op() {
        let mut node = TreeNode::new("pg-1", None, "Same");
        assert!(!NodePatch::default().apply_to(&mut node));
        assert_eq!(node.title, "Same");
    }
}
