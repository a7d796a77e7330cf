//! Canonical mutable navigator state.
//!
//! [`TreeStore`] owns the linked tree, the expansion set, selection, focus
//! and the active search. Every command either applies completely or
//! returns an error and leaves the store untouched. After each structural
//! change the derived state is reconciled:
//!
//! - `expanded` is intersected with the nodes that still have children;
//! - selection and focus are cleared when their node is gone;
//! - an active search filter is recomputed against the new tree.

use std::collections::HashSet;

use tracing::debug;

use super::TreeError;
use super::build::{Tree, build_tree};
use super::search::{self, SearchState};
use super::visible::{VisibleNode, visible_nodes};
use crate::model::{NodeId, NodePatch, TreeNode};

#[derive(Debug, Clone, Default)]
pub struct TreeStore {
    tree: Tree,
    expanded: HashSet<NodeId>,
    selected: Option<NodeId>,
    focused: Option<NodeId>,
    search: SearchState,
    expansion_revision: u64,
}

impl TreeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store over `flat` with everything collapsed.
    pub fn from_nodes(flat: impl IntoIterator<Item = TreeNode>) -> Self {
        Self {
            tree: build_tree(flat),
            ..Self::default()
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub const fn tree(&self) -> &Tree {
        &self.tree
    }

    #[must_use]
    pub const fn expanded_ids(&self) -> &HashSet<NodeId> {
        &self.expanded
    }

    #[must_use]
    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    #[must_use]
    pub fn selected_id(&self) -> Option<&NodeId> {
        self.selected.as_ref()
    }

    #[must_use]
    pub fn focused_id(&self) -> Option<&NodeId> {
        self.focused.as_ref()
    }

    #[must_use]
    pub const fn search(&self) -> &SearchState {
        &self.search
    }

    /// Monotonic counter bumped on every change to the expansion set.
    #[must_use]
    pub const fn expansion_revision(&self) -> u64 {
        self.expansion_revision
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Rows to render for the current expansion and filter.
    #[must_use]
    pub fn visible_nodes(&self) -> Vec<VisibleNode> {
        visible_nodes(&self.tree, &self.expanded, self.search.filtered_ids.as_ref())
    }

    /// Every id strictly below `id`.
    #[must_use]
    pub fn get_descendant_ids(&self, id: &str) -> Vec<NodeId> {
        self.tree.descendant_ids(id)
    }

    // -----------------------------------------------------------------------
    // Structural commands
    // -----------------------------------------------------------------------

    /// Replace the tree with a freshly fetched node list.
    ///
    /// Expansion survives for ids that still have children; selection and
    /// focus survive when their node is still present.
    pub fn load_nodes(&mut self, flat: impl IntoIterator<Item = TreeNode>) {
        self.tree = build_tree(flat);
        debug!(nodes = self.tree.len(), "tree loaded");
        self.reconcile();
    }

    /// Insert a single node under an existing parent (or as a root).
    pub fn add_node(&mut self, node: TreeNode) -> Result<(), TreeError> {
        if self.tree.contains(node.id.as_str()) {
            return Err(TreeError::DuplicateNode(node.id));
        }
        if let Some(parent) = &node.parent_id {
            if *parent == node.id || !self.tree.contains(parent.as_str()) {
                return Err(TreeError::ParentNotFound(parent.clone()));
            }
        }
        debug!(node_id = %node.id, "add node");
        self.tree.insert(node);
        self.tree.relink();
        self.reconcile();
        Ok(())
    }

    /// Apply a non-structural patch. Returns `false` for unknown ids or an
    /// empty patch.
    pub fn update_node(&mut self, id: &str, patch: &NodePatch) -> bool {
        let Some(node) = self.tree.node_mut(id) else {
            return false;
        };
        let changed = patch.apply_to(node);
        if changed && patch.title.is_some() && self.search.is_active() {
            self.refilter();
        }
        changed
    }

    /// Remove `id` and its whole subtree. Returns every removed id, `id`
    /// first.
    pub fn delete_node(&mut self, id: &str) -> Result<Vec<NodeId>, TreeError> {
        let Some(node) = self.tree.get(id) else {
            return Err(TreeError::NodeNotFound(NodeId::from(id)));
        };
        let parent = node.parent_id.clone();

        let mut removed = vec![node.id.clone()];
        removed.extend(self.tree.descendant_ids(id));
        for gone in &removed {
            self.tree.remove(gone.as_str());
        }
        if let Some(parent) = parent.as_ref().and_then(|p| self.tree.node_mut(p.as_str())) {
            parent.child_count = parent.child_count.saturating_sub(1);
        }

        debug!(node_id = id, removed = removed.len(), "delete node");
        self.tree.relink();
        self.reconcile();
        Ok(removed)
    }

    /// Reparent `id` under `new_parent` (`None` = root) at `new_position`.
    ///
    /// Rejected before anything changes when either node is unknown, when
    /// `new_parent == id`, or when `new_parent` sits inside `id`'s subtree.
    /// Siblings at or after `new_position` shift down by one.
    pub fn move_node(
        &mut self,
        id: &str,
        new_parent: Option<&str>,
        new_position: i64,
    ) -> Result<(), TreeError> {
        self.validate_move(id, new_parent)?;

        let old_parent = self.tree.get(id).and_then(|n| n.parent_id.clone());
        let siblings: Vec<NodeId> = new_parent
            .map_or(self.tree.root_ids(), |p| self.tree.children(p))
            .iter()
            .filter(|sib| sib.as_str() != id)
            .cloned()
            .collect();
        for sib in siblings {
            if let Some(node) = self.tree.node_mut(sib.as_str()) {
                if node.position >= new_position {
                    node.position = node.position.saturating_add(1);
                }
            }
        }

        if old_parent.as_ref().map(NodeId::as_str) != new_parent {
            if let Some(parent) = old_parent.as_ref().and_then(|p| self.tree.node_mut(p.as_str())) {
                parent.child_count = parent.child_count.saturating_sub(1);
            }
        }
        if let Some(node) = self.tree.node_mut(id) {
            node.parent_id = new_parent.map(NodeId::from);
            node.position = new_position;
        }

        debug!(node_id = id, parent = ?new_parent, position = new_position, "move node");
        self.tree.relink();
        self.reconcile();
        Ok(())
    }

    /// Check a prospective move without applying it.
    pub fn validate_move(&self, id: &str, new_parent: Option<&str>) -> Result<(), TreeError> {
        if !self.tree.contains(id) {
            return Err(TreeError::NodeNotFound(NodeId::from(id)));
        }
        let Some(parent) = new_parent else {
            return Ok(());
        };
        if !self.tree.contains(parent) {
            return Err(TreeError::ParentNotFound(NodeId::from(parent)));
        }
        if parent == id || self.tree.is_descendant_of(parent, id) {
            return Err(TreeError::CycleDetected {
                node_id: NodeId::from(id),
                proposed_parent: NodeId::from(parent),
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Expansion
    // -----------------------------------------------------------------------

    /// Flip `id` between collapsed and expanded. Leaves are ignored.
    pub fn toggle_expand(&mut self, id: &str) -> bool {
        if self.expanded.contains(id) {
            self.collapse_node(id)
        } else {
            self.expand_node(id)
        }
    }

    /// Expand `id`; a no-op for leaves and unknown ids.
    pub fn expand_node(&mut self, id: &str) -> bool {
        if !self.tree.has_children(id) || self.expanded.contains(id) {
            return false;
        }
        self.expanded.insert(NodeId::from(id));
        self.bump_expansion();
        true
    }

    pub fn collapse_node(&mut self, id: &str) -> bool {
        if !self.expanded.remove(id) {
            return false;
        }
        self.bump_expansion();
        true
    }

    /// Expand every node with children.
    pub fn expand_all(&mut self) -> bool {
        let all: HashSet<NodeId> = self.tree.expandable_ids().cloned().collect();
        self.replace_expanded(all)
    }

    pub fn collapse_all(&mut self) -> bool {
        self.replace_expanded(HashSet::new())
    }

    /// Expand `id` and every descendant that has children.
    pub fn expand_recursive(&mut self, id: &str) -> bool {
        if !self.tree.contains(id) {
            return false;
        }
        let mut next = self.expanded.clone();
        for node in std::iter::once(NodeId::from(id)).chain(self.tree.descendant_ids(id)) {
            if self.tree.has_children(node.as_str()) {
                next.insert(node);
            }
        }
        self.replace_expanded(next)
    }

    /// Collapse `id` and every descendant.
    pub fn collapse_recursive(&mut self, id: &str) -> bool {
        let mut next = self.expanded.clone();
        next.remove(id);
        for node in self.tree.descendant_ids(id) {
            next.remove(&node);
        }
        self.replace_expanded(next)
    }

    /// Seed the expansion set from persisted state, keeping only ids that
    /// can currently be expanded.
    pub fn restore_expanded(&mut self, ids: impl IntoIterator<Item = NodeId>) -> bool {
        let next: HashSet<NodeId> = ids
            .into_iter()
            .filter(|id| self.tree.has_children(id.as_str()))
            .collect();
        self.replace_expanded(next)
    }

    // -----------------------------------------------------------------------
    // Selection, focus, search
    // -----------------------------------------------------------------------

    /// Select `id`, or clear with `None`. Unknown ids are ignored.
    pub fn set_selected(&mut self, id: Option<&str>) {
        match id {
            None => self.selected = None,
            Some(id) if self.tree.contains(id) => self.selected = Some(NodeId::from(id)),
            Some(_) => {}
        }
    }

    pub fn set_focused(&mut self, id: Option<&str>) {
        match id {
            None => self.focused = None,
            Some(id) if self.tree.contains(id) => self.focused = Some(NodeId::from(id)),
            Some(_) => {}
        }
    }

    /// Set the search query, recompute the filter and expand the ancestor
    /// chain of every match so each hit is reachable.
    pub fn set_search_query(&mut self, query: &str) {
        self.search = search::search(&self.tree, query);
        if self.search.match_ids.is_empty() {
            return;
        }
        let mut next = self.expanded.clone();
        for hit in &self.search.match_ids {
            next.extend(self.tree.ancestor_ids(hit.as_str()));
        }
        self.replace_expanded(next);
    }

    pub fn clear_search(&mut self) {
        self.search = SearchState::default();
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn reconcile(&mut self) {
        let pruned: HashSet<NodeId> = self
            .expanded
            .iter()
            .filter(|id| self.tree.has_children(id.as_str()))
            .cloned()
            .collect();
        self.replace_expanded(pruned);

        if self.selected.as_ref().is_some_and(|id| !self.tree.contains(id.as_str())) {
            self.selected = None;
        }
        if self.focused.as_ref().is_some_and(|id| !self.tree.contains(id.as_str())) {
            self.focused = None;
        }
        if self.search.is_active() {
            self.refilter();
        }
    }

    fn refilter(&mut self) {
        let query = std::mem::take(&mut self.search.query);
        self.search = search::search(&self.tree, &query);
    }

    fn replace_expanded(&mut self, next: HashSet<NodeId>) -> bool {
        if next == self.expanded {
            return false;
        }
        self.expanded = next;
        self.bump_expansion();
        true
    }

    fn bump_expansion(&mut self) {
        self.expansion_revision = self.expansion_revision.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;

    /// A(root) -> B, C ; B -> D
    fn store() -> TreeStore {
        TreeStore::from_nodes(vec![
            TreeNode::new("a", None, "A"),
            TreeNode::new("b", Some("a".into()), "B").with_position(0),
            TreeNode::new("c", Some("a".into()), "C").with_position(1),
            TreeNode::new("d", Some("b".into()), "D").with_position(0),
        ])
    }

    fn visible(store: &TreeStore) -> Vec<String> {
        store.visible_nodes().into_iter().map(|r| r.id.to_string()).collect()
    }

    fn sorted(ids: impl IntoIterator<Item = NodeId>) -> Vec<String> {
        let mut v: Vec<String> = ids.into_iter().map(|id| id.to_string()).collect();
        v.sort();
        v
    }

    #[test]
    fn expanded_root_hides_grandchildren() {
        let mut s = store();
        assert!(s.expand_node("a"));
        assert_eq!(visible(&s), vec!["a", "b", "c"]);
    }

    #[test]
    fn search_auto_expands_ancestors() {
        let mut s = store();
        s.set_search_query("d");
        let filtered = s.search().filtered_ids.clone().expect("active filter");
        assert_eq!(sorted(filtered), vec!["a", "b", "d"]);
        assert_eq!(visible(&s), vec!["a", "b", "d"]);
    }

    #[test]
    fn clearing_search_keeps_auto_expansion() {
        let mut s = store();
        s.set_search_query("d");
        s.set_search_query("");
        assert!(!s.search().is_active());
        assert_eq!(visible(&s), vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn delete_cascades_and_prunes_expansion() {
        let mut s = store();
        s.expand_node("a");
        let removed = s.delete_node("b").expect("delete");
        assert_eq!(sorted(removed), vec!["b", "d"]);
        assert_eq!(sorted(s.tree().nodes().map(|n| n.id.clone())), vec!["a", "c"]);
        assert_eq!(sorted(s.expanded_ids().iter().cloned()), vec!["a"]);
        assert_eq!(s.tree().children("a").len(), 1);
    }

    #[test]
    fn delete_clears_selection_inside_subtree() {
        let mut s = store();
        s.set_selected(Some("d"));
        s.set_focused(Some("d"));
        s.delete_node("b").expect("delete");
        assert!(s.selected_id().is_none());
        assert!(s.focused_id().is_none());
    }

    #[test]
    fn delete_keeps_selection_outside_subtree() {
        let mut s = store();
        s.set_selected(Some("c"));
        s.delete_node("b").expect("delete");
        assert_eq!(s.selected_id().map(NodeId::as_str), Some("c"));
    }

    #[test]
    fn delete_last_child_drops_parent_expansion() {
        let mut s = store();
        s.expand_node("b");
        s.delete_node("d").expect("delete");
        assert!(!s.is_expanded("b"));
        assert_eq!(s.tree().get("b").map(|n| n.child_count), Some(0));
    }

    #[test]
    fn delete_unknown_is_an_error() {
        let mut s = store();
        assert_eq!(
            s.delete_node("zz"),
            Err(TreeError::NodeNotFound(NodeId::from("zz")))
        );
    }

    #[test]
    fn move_into_own_subtree_is_rejected() {
        let mut s = store();
        let err = s.move_node("b", Some("d"), 0).expect_err("cycle");
        assert!(matches!(err, TreeError::CycleDetected { .. }));
        assert_eq!(s.tree().get("b").and_then(|n| n.parent_id.clone()), Some(NodeId::from("a")));
        assert!(s.move_node("b", Some("b"), 0).is_err());
    }

    #[test]
    fn move_rejects_unknown_nodes() {
        let mut s = store();
        assert!(matches!(s.move_node("zz", None, 0), Err(TreeError::NodeNotFound(_))));
        assert!(matches!(
            s.move_node("b", Some("zz"), 0),
            Err(TreeError::ParentNotFound(_))
        ));
    }

    #[test]
    fn move_shifts_following_siblings() {
        let mut s = store();
        s.move_node("d", Some("a"), 1).expect("move");
        let kids: Vec<&str> = s.tree().children("a").iter().map(NodeId::as_str).collect();
        assert_eq!(kids, vec!["b", "d", "c"]);
        assert_eq!(s.tree().get("c").map(|n| n.position), Some(2));
        assert!(!s.tree().has_children("b"));
    }

    #[test]
    fn move_to_root() {
        let mut s = store();
        s.move_node("b", None, 5).expect("move");
        let roots: Vec<&str> = s.tree().root_ids().iter().map(NodeId::as_str).collect();
        assert_eq!(roots, vec!["a", "b"]);
        assert_eq!(s.tree().depth("d"), Some(1));
    }

    #[test]
    fn add_node_validates_parent() {
        let mut s = store();
        s.add_node(TreeNode::new("e", Some("c".into()), "E")).expect("add");
        assert!(s.tree().has_children("c"));
        assert!(matches!(
            s.add_node(TreeNode::new("e", None, "dup")),
            Err(TreeError::DuplicateNode(_))
        ));
        assert!(matches!(
            s.add_node(TreeNode::new("f", Some("ghost".into()), "F")),
            Err(TreeError::ParentNotFound(_))
        ));
        assert!(matches!(
            s.add_node(TreeNode::new("g", Some("g".into()), "G")),
            Err(TreeError::ParentNotFound(_))
        ));
    }

    #[test]
    fn update_node_patches_fields() {
        let mut s = store();
        let patch = NodePatch {
            title: Some("Renamed".into()),
            status: Some(Status::Approved),
            ..NodePatch::default()
        };
        assert!(s.update_node("c", &patch));
        assert_eq!(s.tree().get("c").map(|n| n.title.as_str()), Some("Renamed"));
        assert!(!s.update_node("zz", &patch));
    }

    #[test]
    fn rename_refreshes_active_filter() {
        let mut s = store();
        s.set_search_query("renamed");
        assert!(s.visible_nodes().is_empty());
        let patch = NodePatch {
            title: Some("Renamed".into()),
            ..NodePatch::default()
        };
        s.update_node("a", &patch);
        assert_eq!(visible(&s), vec!["a"]);
    }

    #[test]
    fn expanding_a_leaf_is_a_no_op() {
        let mut s = store();
        let before = s.expansion_revision();
        assert!(!s.expand_node("c"));
        assert!(!s.toggle_expand("missing"));
        assert_eq!(s.expansion_revision(), before);
    }

    #[test]
    fn toggle_bumps_revision() {
        let mut s = store();
        assert!(s.toggle_expand("a"));
        assert!(s.toggle_expand("a"));
        assert_eq!(s.expansion_revision(), 2);
        assert!(!s.is_expanded("a"));
    }

    #[test]
    fn recursive_expand_and_collapse() {
        let mut s = store();
        s.expand_recursive("a");
        assert_eq!(sorted(s.expanded_ids().iter().cloned()), vec!["a", "b"]);
        assert_eq!(visible(&s), vec!["a", "b", "d", "c"]);
        s.collapse_recursive("a");
        assert!(s.expanded_ids().is_empty());
    }

    #[test]
    fn expand_all_then_collapse_all() {
        let mut s = store();
        assert!(s.expand_all());
        assert_eq!(visible(&s).len(), 4);
        assert!(s.collapse_all());
        assert!(!s.collapse_all());
        assert_eq!(visible(&s), vec!["a"]);
    }

    #[test]
    fn restore_expanded_drops_leaves_and_unknown_ids() {
        let mut s = store();
        s.restore_expanded(["a", "c", "ghost"].map(NodeId::from));
        assert_eq!(sorted(s.expanded_ids().iter().cloned()), vec!["a"]);
    }

    #[test]
    fn load_preserves_expansion_and_selection_that_survive() {
        let mut s = store();
        s.expand_all();
        s.set_selected(Some("d"));
        s.load_nodes(vec![
            TreeNode::new("a", None, "A"),
            TreeNode::new("c", Some("a".into()), "C"),
        ]);
        assert_eq!(sorted(s.expanded_ids().iter().cloned()), vec!["a"]);
        assert!(s.selected_id().is_none());
    }

    #[test]
    fn selection_ignores_unknown_ids() {
        let mut s = store();
        s.set_selected(Some("b"));
        s.set_selected(Some("ghost"));
        assert_eq!(s.selected_id().map(NodeId::as_str), Some("b"));
        s.set_selected(None);
        assert!(s.selected_id().is_none());
    }
}
