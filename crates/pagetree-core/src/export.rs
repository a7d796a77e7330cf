//! Subtree export.
//!
//! The nested form is for reading; the flat form is the node list that
//! [`crate::port::SqlitePort::import_nodes`] accepts back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Label, NodeId, Status, TreeNode};
use crate::tree::Tree;

/// Bumped when the document layout changes incompatibly.
pub const EXPORT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportNode {
    pub id: NodeId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    pub position: i64,
    pub author: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Self>,
}

impl ExportNode {
    fn from_node(node: &TreeNode, children: Vec<Self>) -> Self {
        Self {
            id: node.id.clone(),
            title: node.title.clone(),
            icon: node.icon.clone(),
            status: node.status,
            labels: node.labels.clone(),
            position: node.position,
            author: node.author.clone(),
            updated_at: node.updated_at,
            children,
        }
    }

    /// Number of pages in this subtree, root included.
    #[must_use]
    pub fn page_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
    pub format_version: u32,
    pub space_id: String,
    pub exported_at: DateTime<Utc>,
    pub pages: Vec<ExportNode>,
}

/// Nested export of `root_id` and everything loaded below it.
///
/// Built bottom-up from the reversed pre-order, so depth never touches
/// the call stack.
#[must_use]
pub fn export_subtree(tree: &Tree, root_id: &str) -> Option<ExportNode> {
    tree.get(root_id)?;
    let mut order = vec![NodeId::from(root_id)];
    order.extend(tree.descendant_ids(root_id));

    let mut built: HashMap<NodeId, ExportNode> = HashMap::with_capacity(order.len());
    for id in order.iter().rev() {
        let Some(node) = tree.get(id.as_str()) else {
            continue;
        };
        let children = tree
            .children(id.as_str())
            .iter()
            .filter_map(|child| built.remove(child))
            .collect();
        built.insert(id.clone(), ExportNode::from_node(node, children));
    }
    built.remove(root_id)
}

/// Export one subtree, or every root of the tree when `root_id` is `None`.
#[must_use]
pub fn export_document(tree: &Tree, space_id: &str, root_id: Option<&str>) -> ExportDocument {
    let pages = match root_id {
        Some(id) => export_subtree(tree, id).into_iter().collect(),
        None => tree
            .root_ids()
            .iter()
            .filter_map(|id| export_subtree(tree, id.as_str()))
            .collect(),
    };
    ExportDocument {
        format_version: EXPORT_FORMAT_VERSION,
        space_id: space_id.to_string(),
        exported_at: Utc::now(),
        pages,
    }
}

/// Flat pre-order node list for `root_id` (or the whole tree), parents
/// always ahead of their children.
#[must_use]
pub fn export_flat(tree: &Tree, root_id: Option<&str>) -> Vec<TreeNode> {
    let starts: Vec<NodeId> = match root_id {
        Some(id) if tree.contains(id) => vec![NodeId::from(id)],
        Some(_) => Vec::new(),
        None => tree.root_ids().to_vec(),
    };

    let mut out = Vec::new();
    for start in starts {
        let Some(node) = tree.get(start.as_str()) else {
            continue;
        };
        let mut root = node.clone();
        if root_id.is_some() {
            // a detached subtree re-imports as a root
            root.parent_id = None;
        }
        out.push(root);
        out.extend(
            tree.descendant_ids(start.as_str())
                .iter()
                .filter_map(|id| tree.get(id.as_str()).cloned()),
        );
    }
    out
}
