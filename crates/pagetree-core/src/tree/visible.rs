//! Flattening the tree into the rows a view renders.

use std::collections::HashSet;

use serde::Serialize;

use super::build::Tree;
use crate::model::NodeId;

/// One visible row, in render order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibleNode {
    pub id: NodeId,
    pub depth: usize,
    pub has_children: bool,
    pub is_expanded: bool,
    /// Last visible row among its siblings.
    pub is_last: bool,
    /// `is_last` of every ancestor, root first. Drives the guide columns.
    pub ancestors_last: Vec<bool>,
}

/// Ordered visible rows for the given expansion set and optional filter.
///
/// A node is emitted iff `filter` is `None` or contains its id. Children are
/// walked only when the node is expanded and has loaded children, so a
/// collapsed node hides its whole subtree whatever flags its descendants
/// carry. Iterative with an explicit stack.
#[must_use]
pub fn visible_nodes(
    tree: &Tree,
    expanded: &HashSet<NodeId>,
    filter: Option<&HashSet<NodeId>>,
) -> Vec<VisibleNode> {
    let passes = |id: &NodeId| filter.is_none_or(|set| set.contains(id));

    let mut rows = Vec::new();
    let mut seen: HashSet<&NodeId> = HashSet::new();
    let mut stack: Vec<Pending<'_>> = Vec::new();

    let roots: Vec<&NodeId> = tree.root_ids().iter().filter(|id| passes(id)).collect();
    push_level(&mut stack, roots, 0, &[]);

    while let Some(entry) = stack.pop() {
        if !seen.insert(entry.id) {
            continue;
        }
        let has_children = tree.has_children(entry.id);
        let is_expanded = has_children && expanded.contains(entry.id);

        if is_expanded {
            let kids: Vec<&NodeId> = tree
                .children(entry.id)
                .iter()
                .filter(|id| passes(id))
                .collect();
            let mut chain = entry.ancestors_last.clone();
            chain.push(entry.is_last);
            push_level(&mut stack, kids, entry.depth + 1, &chain);
        }

        rows.push(VisibleNode {
            id: entry.id.clone(),
            depth: entry.depth,
            has_children,
            is_expanded,
            is_last: entry.is_last,
            ancestors_last: entry.ancestors_last,
        });
    }

    rows
}

struct Pending<'a> {
    id: &'a NodeId,
    depth: usize,
    is_last: bool,
    ancestors_last: Vec<bool>,
}

/// Push one sibling level so the first sibling pops first.
fn push_level<'a>(stack: &mut Vec<Pending<'a>>, ids: Vec<&'a NodeId>, depth: usize, ancestors_last: &[bool]) {
    let last = ids.len().saturating_sub(1);
    for (idx, id) in ids.into_iter().enumerate().rev() {
        stack.push(Pending {
            id,
            depth,
            is_last: idx == last,
            ancestors_last: ancestors_last.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TreeNode;
    use crate::tree::build::build_tree;

    fn sample() -> Tree {
        build_tree(vec![
            TreeNode::new("a", None, "A"),
            TreeNode::new("b", Some("a".into()), "B").with_position(0),
            TreeNode::new("c", Some("a".into()), "C").with_position(1),
            TreeNode::new("d", Some("b".into()), "D").with_position(0),
        ])
    }

    fn set(ids: &[&str]) -> HashSet<NodeId> {
        ids.iter().copied().map(NodeId::from).collect()
    }

    fn row_ids(rows: &[VisibleNode]) -> Vec<&str> {
        rows.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn collapsed_tree_shows_roots_only() {
        let rows = visible_nodes(&sample(), &HashSet::new(), None);
        assert_eq!(row_ids(&rows), vec!["a"]);
        assert!(rows[0].has_children);
        assert!(!rows[0].is_expanded);
    }

    #[test]
    fn expanded_root_shows_children_only() {
        let rows = visible_nodes(&sample(), &set(&["a"]), None);
        assert_eq!(row_ids(&rows), vec!["a", "b", "c"]);
        assert_eq!(rows[1].depth, 1);
        assert!(!rows[1].is_last);
        assert!(rows[2].is_last);
    }

    #[test]
    fn collapsed_ancestor_hides_expanded_descendants() {
        let rows = visible_nodes(&sample(), &set(&["b"]), None);
        assert_eq!(row_ids(&rows), vec!["a"]);
    }

    #[test]
    fn filter_excludes_non_members() {
        let rows = visible_nodes(&sample(), &set(&["a", "b"]), Some(&set(&["a", "b", "d"])));
        assert_eq!(row_ids(&rows), vec!["a", "b", "d"]);
        // c is filtered out, so b becomes the last visible sibling
        assert!(rows[1].is_last);
    }

    #[test]
    fn ancestor_last_stack_tracks_guides() {
        let rows = visible_nodes(&sample(), &set(&["a", "b"]), None);
        let d = rows.iter().find(|r| r.id.as_str() == "d").expect("d visible");
        assert_eq!(d.depth, 2);
        assert_eq!(d.ancestors_last, vec![true, false]);
        assert!(d.is_last);
    }

    #[test]
    fn expanding_a_leaf_has_no_effect() {
        let rows = visible_nodes(&sample(), &set(&["a", "c"]), None);
        let c = rows.iter().find(|r| r.id.as_str() == "c").expect("c visible");
        assert!(!c.is_expanded);
        assert!(!c.has_children);
    }

    #[test]
    fn empty_filter_shows_nothing() {
        let rows = visible_nodes(&sample(), &set(&["a"]), Some(&HashSet::new()));
        assert!(rows.is_empty());
    }

    #[test]
    fn deep_chain_does_not_recurse() {
        let mut flat = vec![TreeNode::new("n0", None, "n0")];
        let mut expanded = HashSet::new();
        for i in 1..5_000 {
            flat.push(TreeNode::new(format!("n{i}"), Some(NodeId::new(format!("n{}", i - 1))), "x"));
            expanded.insert(NodeId::new(format!("n{}", i - 1)));
        }
        let tree = build_tree(flat);
        let rows = visible_nodes(&tree, &expanded, None);
        assert_eq!(rows.len(), 5_000);
        assert_eq!(rows.last().map(|r| r.depth), Some(4_999));
    }
}
