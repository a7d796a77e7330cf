//! Flat node list -> linked tree.
//!
//! [`Tree`] keeps the id -> node map as the single source of truth. The
//! ordered children index and the root list are derived from `parent_id`
//! by [`Tree::relink`] and are rebuilt after every structural change, so the
//! two views of the parent/child relationship can never drift apart.
//!
//! # Malformed input
//!
//! Nodes whose `parent_id` does not resolve (or points at themselves) are
//! kept in the map but excluded from every parent's children and from the
//! roots. They are reported through [`Tree::orphan_ids`]. Every walk in this
//! module is cycle-guarded, so a cyclic input list degrades to unreachable
//! nodes instead of an infinite loop.

use std::collections::{HashMap, HashSet};

use crate::model::{NodeId, TreeNode};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Linked view over a set of nodes.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: HashMap<NodeId, TreeNode>,
    children: HashMap<NodeId, Vec<NodeId>>,
    root_ids: Vec<NodeId>,
    orphan_ids: Vec<NodeId>,
}

/// Build a linked [`Tree`] from the flat list returned by `fetch_tree`.
///
/// Pass one indexes every node by id (a later duplicate replaces an earlier
/// one). Pass two groups ids by parent, sorts every sibling group by
/// `(position, id)` and derives `child_count` for parents with loaded
/// children. Parents whose children were not part of the list keep their
/// server-reported count.
pub fn build_tree(flat: impl IntoIterator<Item = TreeNode>) -> Tree {
    let mut nodes: HashMap<NodeId, TreeNode> = HashMap::new();
    for node in flat {
        if let Some(previous) = nodes.insert(node.id.clone(), node) {
            tracing::warn!(node_id = %previous.id, "duplicate node id in tree payload; keeping the later one");
        }
    }

    let mut tree = Tree {
        nodes,
        ..Tree::default()
    };
    tree.relink();

    if !tree.orphan_ids.is_empty() {
        tracing::warn!(
            count = tree.orphan_ids.len(),
            "nodes with unresolved parents excluded from the hierarchy"
        );
    }

    tree
}

impl Tree {
    /// Rebuild the children index, roots and orphans from `parent_id`.
    pub(crate) fn relink(&mut self) {
        let mut groups: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut roots: Vec<NodeId> = Vec::new();
        let mut orphans: Vec<NodeId> = Vec::new();

        for node in self.nodes.values() {
            match &node.parent_id {
                None => roots.push(node.id.clone()),
                Some(parent) if *parent == node.id => orphans.push(node.id.clone()),
                Some(parent) if self.nodes.contains_key(parent) => {
                    groups.entry(parent.clone()).or_default().push(node.id.clone());
                }
                Some(_) => orphans.push(node.id.clone()),
            }
        }

        let order_key = |id: &NodeId| (self.nodes.get(id).map_or(0, |n| n.position), id.clone());
        roots.sort_by_key(order_key);
        for kids in groups.values_mut() {
            kids.sort_by_key(order_key);
        }
        orphans.sort();

        for (parent, kids) in &groups {
            if let Some(node) = self.nodes.get_mut(parent) {
                node.child_count = u32::try_from(kids.len()).unwrap_or(u32::MAX);
            }
        }

        self.children = groups;
        self.root_ids = roots;
        self.orphan_ids = orphans;
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.values()
    }

    /// Parentless nodes ordered by position.
    #[must_use]
    pub fn root_ids(&self) -> &[NodeId] {
        &self.root_ids
    }

    /// Nodes excluded from the hierarchy because their parent is unknown.
    #[must_use]
    pub fn orphan_ids(&self) -> &[NodeId] {
        &self.orphan_ids
    }

    /// Loaded children of `id`, ordered by position. Empty for leaves and
    /// unknown ids.
    #[must_use]
    pub fn children(&self, id: &str) -> &[NodeId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn has_children(&self, id: &str) -> bool {
        !self.children(id).is_empty()
    }

    /// Position that appends after the last loaded child of `parent`
    /// (`None` = root level).
    #[must_use]
    pub fn next_position(&self, parent: Option<&str>) -> i64 {
        let siblings = parent.map_or(self.root_ids.as_slice(), |id| self.children(id));
        siblings
            .last()
            .and_then(|id| self.nodes.get(id))
            .map_or(0, |n| n.position.saturating_add(1))
    }

    /// Ids of all nodes that currently have at least one loaded child.
    pub fn expandable_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.children
            .iter()
            .filter(|(_, kids)| !kids.is_empty())
            .map(|(id, _)| id)
    }

    // -----------------------------------------------------------------------
    // Walks
    // -----------------------------------------------------------------------

    /// Ancestor chain of `id`, nearest parent first, root last.
    ///
    /// Stops at the first unresolved parent or repeated id.
    #[must_use]
    pub fn ancestor_ids(&self, id: &str) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(id);

        let mut current = self.nodes.get(id).and_then(|n| n.parent_id.as_ref());
        while let Some(parent_id) = current {
            if !visited.insert(parent_id.as_str()) {
                break; // cycle guard
            }
            let Some(parent) = self.nodes.get(parent_id) else {
                break;
            };
            ancestors.push(parent_id.clone());
            current = parent.parent_id.as_ref();
        }

        ancestors
    }

    /// Number of ancestors above `id`; `None` for unknown ids.
    #[must_use]
    pub fn depth(&self, id: &str) -> Option<usize> {
        self.contains(id).then(|| self.ancestor_ids(id).len())
    }

    /// Root-first path ending at `id`. Empty for unknown ids.
    #[must_use]
    pub fn path(&self, id: &str) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };
        let mut path = self.ancestor_ids(id);
        path.reverse();
        path.push(node.id.clone());
        path
    }

    /// `true` when `x` is a strict ancestor of `y`.
    ///
    /// Irreflexive: a node is never its own descendant.
    #[must_use]
    pub fn is_descendant_of(&self, y: &str, x: &str) -> bool {
        if x == y {
            return false;
        }
        self.ancestor_ids(y).iter().any(|a| a.as_str() == x)
    }

    /// Every id strictly below `id`, in pre-order.
    ///
    /// Iterative (explicit stack) so deep trees cannot overflow the call
    /// stack.
    #[must_use]
    pub fn descendant_ids(&self, id: &str) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(id);

        let mut stack: Vec<&NodeId> = self.children(id).iter().rev().collect();
        while let Some(current) = stack.pop() {
            if !visited.insert(current.as_str()) {
                continue; // cycle guard
            }
            result.push(current.clone());
            stack.extend(self.children(current).iter().rev());
        }

        result
    }

    // -----------------------------------------------------------------------
    // Crate-internal mutation (callers relink afterwards)
    // -----------------------------------------------------------------------

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id)
    }

    pub(crate) fn insert(&mut self, node: TreeNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<TreeNode> {
        self.nodes.remove(id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
