//! Title search with ancestor closure.
//!
//! A filter result always contains the full ancestor chain of every match,
//! so the path from a root to each hit can be rendered.

use std::collections::HashSet;

use super::build::Tree;
use crate::model::NodeId;

/// Current search query plus its derived filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub query: String,
    /// `None` means "no filter": everything is visible subject to expansion.
    pub filtered_ids: Option<HashSet<NodeId>>,
    /// Direct title matches in tree pre-order (ancestors excluded).
    pub match_ids: Vec<NodeId>,
}

impl SearchState {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.filtered_ids.is_some()
    }
}

/// Ids whose title contains `query` case-insensitively, in pre-order from
/// the roots. Orphans are never reported since they cannot be shown.
#[must_use]
pub fn matching_ids(tree: &Tree, query: &str) -> Vec<NodeId> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut matches = Vec::new();
    for root in tree.root_ids() {
        let subtree = std::iter::once(root.clone()).chain(tree.descendant_ids(root));
        for id in subtree {
            let hit = tree
                .get(&id)
                .is_some_and(|node| node.title.to_lowercase().contains(&needle));
            if hit {
                matches.push(id);
            }
        }
    }
    matches
}

/// Compute the visible-id filter for `query`.
///
/// Empty or whitespace-only queries return `None`. Otherwise the result is
/// every match plus each match's ancestors up to the root.
#[must_use]
pub fn filter_nodes(tree: &Tree, query: &str) -> Option<HashSet<NodeId>> {
    if query.trim().is_empty() {
        return None;
    }
    Some(ancestor_closure(tree, &matching_ids(tree, query)))
}

/// `matches` extended with all of their ancestors.
#[must_use]
pub fn ancestor_closure(tree: &Tree, matches: &[NodeId]) -> HashSet<NodeId> {
    let mut closure: HashSet<NodeId> = HashSet::with_capacity(matches.len() * 2);
    for id in matches {
        if !closure.insert(id.clone()) {
            continue;
        }
        for ancestor in tree.ancestor_ids(id) {
            if !closure.insert(ancestor) {
                break; // the rest of the chain is already present
            }
        }
    }
    closure
}

/// Build a full [`SearchState`] for `query`.
#[must_use]
pub fn search(tree: &Tree, query: &str) -> SearchState {
    if query.trim().is_empty() {
        return SearchState {
            query: query.to_string(),
            ..SearchState::default()
        };
    }
    let match_ids = matching_ids(tree, query);
    SearchState {
        query: query.to_string(),
        filtered_ids: Some(ancestor_closure(tree, &match_ids)),
        match_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TreeNode;
    use crate::tree::build::build_tree;

    fn sample() -> Tree {
        build_tree(vec![
            TreeNode::new("a", None, "Alpha"),
            TreeNode::new("b", Some("a".into()), "Beta").with_position(0),
            TreeNode::new("c", Some("a".into()), "Gamma").with_position(1),
            TreeNode::new("d", Some("b".into()), "Delta Notes").with_position(0),
            TreeNode::new("e", None, "Epsilon").with_position(1),
        ])
    }

    fn sorted(set: &HashSet<NodeId>) -> Vec<String> {
        let mut v: Vec<String> = set.iter().map(ToString::to_string).collect();
        v.sort();
        v
    }

    #[test]
    fn empty_query_means_no_filter() {
        let tree = sample();
        assert!(filter_nodes(&tree, "").is_none());
        assert!(filter_nodes(&tree, "   ").is_none());
        assert!(!search(&tree, "\t").is_active());
    }

    #[test]
    fn match_includes_full_ancestor_chain() {
        let tree = sample();
        let set = filter_nodes(&tree, "delta").expect("filter");
        assert_eq!(sorted(&set), vec!["a", "b", "d"]);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let tree = sample();
        let set = filter_nodes(&tree, "NOTES").expect("filter");
        assert!(set.contains("d"));
    }

    #[test]
    fn unicode_titles_fold_case() {
        let tree = build_tree(vec![TreeNode::new("x", None, "Über Straße")]);
        assert!(filter_nodes(&tree, "über").is_some_and(|s| s.contains("x")));
    }

    #[test]
    fn no_match_yields_empty_filter_not_none() {
        let tree = sample();
        let set = filter_nodes(&tree, "zzz").expect("filter");
        assert!(set.is_empty());
    }

    #[test]
    fn query_is_trimmed() {
        let tree = sample();
        let set = filter_nodes(&tree, "  eps ").expect("filter");
        assert_eq!(sorted(&set), vec!["e"]);
    }

    #[test]
    fn matches_are_in_preorder() {
        let tree = sample();
        let state = search(&tree, "a");
        let ids: Vec<&str> = state.match_ids.iter().map(NodeId::as_str).collect();
        assert_eq!(ids, vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn orphans_never_match() {
        let tree = build_tree(vec![
            TreeNode::new("a", None, "Root"),
            TreeNode::new("o", Some("ghost".into()), "Root orphan"),
        ]);
        let set = filter_nodes(&tree, "root").expect("filter");
        assert_eq!(sorted(&set), vec!["a"]);
    }
}
