//! In-process [`PersistencePort`] for tests and embedding.
//!
//! Behaves like the SQLite adapter (cascade delete, sibling shifting, owner
//! bookkeeping, version history) and adds failure injection so callers can
//! exercise their error paths.

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Utc;

use super::{PersistencePort, PortError, check_last_owner, derive_node_id, sort_access};
use crate::model::{AccessEntry, AccessRole, NodeId, Status, TreeNode, Version};

#[derive(Debug)]
pub struct MemoryPort {
    actor: String,
    nodes: BTreeMap<NodeId, TreeNode>,
    versions: HashMap<NodeId, Vec<Version>>,
    access: HashMap<NodeId, Vec<AccessEntry>>,
    seq: u64,
    fail_mutations: bool,
    fail_fetch: bool,
    fetches: Cell<usize>,
    mutations: Vec<&'static str>,
}

impl Default for MemoryPort {
    fn default() -> Self {
        Self::new("tester")
    }
}

impl MemoryPort {
    /// Empty port acting as `actor` for authorship and ownership.
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            nodes: BTreeMap::new(),
            versions: HashMap::new(),
            access: HashMap::new(),
            seq: 0,
            fail_mutations: false,
            fail_fetch: false,
            fetches: Cell::new(0),
            mutations: Vec::new(),
        }
    }

    /// Seed with existing nodes. No versions or access entries are created.
    #[must_use]
    pub fn with_nodes(mut self, nodes: impl IntoIterator<Item = TreeNode>) -> Self {
        for node in nodes {
            self.nodes.insert(node.id.clone(), node);
        }
        self
    }

    /// Make every mutation fail with [`PortError::Unavailable`].
    pub fn set_fail_mutations(&mut self, fail: bool) {
        self.fail_mutations = fail;
    }

    pub fn set_fail_fetch(&mut self, fail: bool) {
        self.fail_fetch = fail;
    }

    /// Number of `fetch_tree` calls so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }

    /// Names of the mutating calls received, in order.
    #[must_use]
    pub fn mutations(&self) -> &[&'static str] {
        &self.mutations
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    fn enter(&mut self, op: &'static str) -> Result<(), PortError> {
        self.mutations.push(op);
        if self.fail_mutations {
            return Err(PortError::Unavailable(format!("{op} failed (injected)")));
        }
        Ok(())
    }

    fn children_of(&self, parent: Option<&str>) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.parent_id.as_ref().map(NodeId::as_str) == parent)
            .map(|n| n.id.clone())
            .collect()
    }

    fn next_position(&self, parent: Option<&str>) -> i64 {
        self.children_of(parent)
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .map(|n| n.position)
            .max()
            .map_or(0, |p| p.saturating_add(1))
    }

    fn shift_siblings(&mut self, parent: Option<&str>, from: i64, skip: &str) {
        for id in self.children_of(parent) {
            if id.as_str() == skip {
                continue;
            }
            if let Some(node) = self.nodes.get_mut(&id) {
                if node.position >= from {
                    node.position = node.position.saturating_add(1);
                }
            }
        }
    }

    fn fresh_id(&mut self, seed: &str) -> NodeId {
        self.seq += 1;
        let seed = format!("{seed}:{}", self.seq);
        let mut attempt = 0;
        loop {
            let id = derive_node_id(&seed, attempt);
            if !self.nodes.contains_key(&id) {
                return id;
            }
            attempt += 1;
        }
    }

    fn record_version(&mut self, node_id: &NodeId, title: &str, summary: &str) {
        let history = self.versions.entry(node_id.clone()).or_default();
        let number = u32::try_from(history.len()).unwrap_or(u32::MAX).saturating_add(1);
        history.push(Version {
            id: format!("{node_id}-v{number}"),
            version_number: number,
            author: self.actor.clone(),
            created_at: Utc::now(),
            change_summary: Some(summary.to_string()),
            title: title.to_string(),
        });
    }

    fn insert_new(&mut self, mut node: TreeNode, summary: &str) -> TreeNode {
        node.author.clone_from(&self.actor);
        let id = node.id.clone();
        let title = node.title.clone();
        self.nodes.insert(id.clone(), node.clone());
        self.record_version(&id, &title, summary);
        self.access.insert(
            id,
            vec![AccessEntry {
                user: self.actor.clone(),
                role: AccessRole::Owner,
                granted_at: Utc::now(),
            }],
        );
        node
    }

    fn require(&self, node_id: &str) -> Result<&TreeNode, PortError> {
        self.nodes
            .get(node_id)
            .ok_or_else(|| PortError::NodeNotFound(NodeId::from(node_id)))
    }
}

impl PersistencePort for MemoryPort {
    fn fetch_tree(&self, space_id: &str) -> Result<Vec<TreeNode>, PortError> {
        self.fetches.set(self.fetches.get() + 1);
        if self.fail_fetch {
            return Err(PortError::Unavailable("fetch_tree failed (injected)".into()));
        }
        let mut counts: HashMap<&NodeId, u32> = HashMap::new();
        for node in self.nodes.values() {
            if let Some(parent) = &node.parent_id {
                *counts.entry(parent).or_default() += 1;
            }
        }
        Ok(self
            .nodes
            .values()
            .filter(|n| n.space_id == space_id)
            .map(|n| {
                let mut node = n.clone();
                node.child_count = counts.get(&n.id).copied().unwrap_or(0);
                node
            })
            .collect())
    }

    fn create_node(
        &mut self,
        space_id: &str,
        parent_id: Option<&str>,
        title: &str,
    ) -> Result<TreeNode, PortError> {
        self.enter("create_node")?;
        let title = title.trim();
        if title.is_empty() {
            return Err(PortError::EmptyTitle);
        }
        if let Some(parent) = parent_id {
            if !self.nodes.contains_key(parent) {
                return Err(PortError::ParentNotFound(NodeId::from(parent)));
            }
        }
        let id = self.fresh_id(&format!("{space_id}:{parent_id:?}:{title}"));
        let node = TreeNode::new(id, parent_id.map(NodeId::from), title)
            .with_position(self.next_position(parent_id))
            .in_space(space_id);
        Ok(self.insert_new(node, "Created"))
    }

    fn move_node(
        &mut self,
        node_id: &str,
        new_parent_id: Option<&str>,
        new_position: i64,
    ) -> Result<bool, PortError> {
        self.enter("move_node")?;
        if !self.nodes.contains_key(node_id) {
            return Ok(false);
        }
        if let Some(parent) = new_parent_id {
            if !self.nodes.contains_key(parent) {
                return Err(PortError::ParentNotFound(NodeId::from(parent)));
            }
            let mut seen = HashSet::new();
            let mut cursor = Some(NodeId::from(parent));
            while let Some(current) = cursor {
                if current.as_str() == node_id {
                    return Err(PortError::Cycle {
                        node_id: NodeId::from(node_id),
                        parent_id: NodeId::from(parent),
                    });
                }
                if !seen.insert(current.clone()) {
                    break;
                }
                cursor = self.nodes.get(&current).and_then(|n| n.parent_id.clone());
            }
        }

        self.shift_siblings(new_parent_id, new_position, node_id);
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.parent_id = new_parent_id.map(NodeId::from);
            node.position = new_position;
            node.updated_at = Utc::now();
        }
        Ok(true)
    }

    fn delete_node(&mut self, node_id: &str) -> Result<bool, PortError> {
        self.enter("delete_node")?;
        if !self.nodes.contains_key(node_id) {
            return Ok(false);
        }
        let mut doomed = vec![NodeId::from(node_id)];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let kids: Vec<NodeId> = self
                .children_of(Some(doomed[cursor].as_str()))
                .into_iter()
                .filter(|k| !doomed.contains(k))
                .collect();
            doomed.extend(kids);
            cursor += 1;
        }
        for id in &doomed {
            self.nodes.remove(id);
            self.versions.remove(id);
            self.access.remove(id);
        }
        Ok(true)
    }

    fn copy_node(&mut self, node_id: &str) -> Result<TreeNode, PortError> {
        self.enter("copy_node")?;
        let source = self.require(node_id)?.clone();
        let parent = source.parent_id.as_ref().map(NodeId::as_str);
        let position = source.position.saturating_add(1);
        self.shift_siblings(parent, position, node_id);

        let id = self.fresh_id(&format!("copy:{node_id}"));
        let mut copy = TreeNode::new(id, source.parent_id.clone(), format!("{} (copy)", source.title))
            .with_position(position)
            .in_space(source.space_id.clone());
        copy.icon.clone_from(&source.icon);
        copy.labels.clone_from(&source.labels);
        copy.status = Status::Draft;
        Ok(self.insert_new(copy, &format!("Copied from {node_id}")))
    }

    fn rename_node(&mut self, node_id: &str, title: &str) -> Result<TreeNode, PortError> {
        self.enter("rename_node")?;
        let title = title.trim();
        if title.is_empty() {
            return Err(PortError::EmptyTitle);
        }
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| PortError::NodeNotFound(NodeId::from(node_id)))?;
        node.title = title.to_string();
        node.updated_at = Utc::now();
        let renamed = node.clone();
        self.record_version(&renamed.id, title, "Renamed");
        Ok(renamed)
    }

    fn fetch_version_history(&self, node_id: &str) -> Result<Vec<Version>, PortError> {
        self.require(node_id)?;
        let mut history = self.versions.get(node_id).cloned().unwrap_or_default();
        history.reverse();
        Ok(history)
    }

    fn restore_version(&mut self, node_id: &str, version_id: &str) -> Result<bool, PortError> {
        self.enter("restore_version")?;
        let Some(version) = self
            .versions
            .get(node_id)
            .and_then(|h| h.iter().find(|v| v.id == version_id))
            .cloned()
        else {
            return Ok(false);
        };
        let Some(node) = self.nodes.get_mut(node_id) else {
            return Ok(false);
        };
        node.title.clone_from(&version.title);
        node.updated_at = Utc::now();
        let id = node.id.clone();
        self.record_version(
            &id,
            &version.title,
            &format!("Restored version {}", version.version_number),
        );
        Ok(true)
    }

    fn fetch_access_list(&self, node_id: &str) -> Result<Vec<AccessEntry>, PortError> {
        self.require(node_id)?;
        let mut entries = self.access.get(node_id).cloned().unwrap_or_default();
        sort_access(&mut entries);
        Ok(entries)
    }

    fn grant_access(
        &mut self,
        node_id: &str,
        user: &str,
        role: AccessRole,
    ) -> Result<AccessEntry, PortError> {
        self.enter("grant_access")?;
        self.require(node_id)?;
        let entries = self.access.entry(NodeId::from(node_id)).or_default();
        check_last_owner(node_id, entries, user, Some(role))?;
        entries.retain(|e| e.user != user);
        let entry = AccessEntry {
            user: user.to_string(),
            role,
            granted_at: Utc::now(),
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    fn update_access_role(
        &mut self,
        node_id: &str,
        user: &str,
        role: AccessRole,
    ) -> Result<bool, PortError> {
        self.enter("update_access_role")?;
        let Some(entries) = self.access.get_mut(node_id) else {
            return Ok(false);
        };
        check_last_owner(node_id, entries, user, Some(role))?;
        let Some(entry) = entries.iter_mut().find(|e| e.user == user) else {
            return Ok(false);
        };
        entry.role = role;
        Ok(true)
    }

    fn revoke_access(&mut self, node_id: &str, user: &str) -> Result<bool, PortError> {
        self.enter("revoke_access")?;
        let Some(entries) = self.access.get_mut(node_id) else {
            return Ok(false);
        };
        check_last_owner(node_id, entries, user, None)?;
        let before = entries.len();
        entries.retain(|e| e.user != user);
        Ok(entries.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MemoryPort {
        MemoryPort::new("ada").with_nodes(vec![
            TreeNode::new("a", None, "A"),
            TreeNode::new("b", Some("a".into()), "B").with_position(0),
            TreeNode::new("c", Some("a".into()), "C").with_position(1),
            TreeNode::new("d", Some("b".into()), "D").with_position(0),
        ])
    }

    #[test]
    fn fetch_reports_child_counts() {
        let port = seeded();
        let nodes = port.fetch_tree("default").expect("fetch");
        let a = nodes.iter().find(|n| n.id.as_str() == "a").expect("a");
        assert_eq!(a.child_count, 2);
        assert_eq!(port.fetch_count(), 1);
        assert!(port.fetch_tree("other").expect("fetch").is_empty());
    }

    #[test]
    fn create_appends_and_grants_owner() {
        let mut port = seeded();
        let node = port.create_node("default", Some("a"), "  E ").expect("create");
        assert_eq!(node.title, "E");
        assert_eq!(node.position, 2);
        assert_eq!(node.author, "ada");
        let roster = port.fetch_access_list(node.id.as_str()).expect("access");
        assert_eq!(roster[0].role, AccessRole::Owner);
        assert_eq!(port.fetch_version_history(node.id.as_str()).expect("history").len(), 1);
    }

    #[test]
    fn create_rejects_empty_title_and_unknown_parent() {
        let mut port = seeded();
        assert!(matches!(port.create_node("default", None, "  "), Err(PortError::EmptyTitle)));
        assert!(matches!(
            port.create_node("default", Some("zz"), "X"),
            Err(PortError::ParentNotFound(_))
        ));
    }

    #[test]
    fn move_rejects_cycles() {
        let mut port = seeded();
        assert!(matches!(port.move_node("b", Some("d"), 0), Err(PortError::Cycle { .. })));
        assert!(matches!(port.move_node("b", Some("b"), 0), Err(PortError::Cycle { .. })));
        assert!(!port.move_node("zz", None, 0).expect("unknown node"));
    }

    #[test]
    fn move_shifts_siblings() {
        let mut port = seeded();
        assert!(port.move_node("d", Some("a"), 0).expect("move"));
        assert_eq!(port.node("b").map(|n| n.position), Some(1));
        assert_eq!(port.node("c").map(|n| n.position), Some(2));
    }

    #[test]
    fn delete_cascades() {
        let mut port = seeded();
        assert!(port.delete_node("b").expect("delete"));
        assert!(port.node("d").is_none());
        assert!(port.node("c").is_some());
        assert!(!port.delete_node("b").expect("second delete"));
    }

    #[test]
    fn copy_lands_after_source() {
        let mut port = seeded();
        let copy = port.copy_node("b").expect("copy");
        assert_eq!(copy.title, "B (copy)");
        assert_eq!(copy.position, 1);
        assert_eq!(port.node("c").map(|n| n.position), Some(2));
    }

    #[test]
    fn rename_and_restore_versions() {
        let mut port = MemoryPort::new("ada");
        let node = port.create_node("default", None, "First").expect("create");
        let id = node.id.as_str().to_string();
        port.rename_node(&id, "Second").expect("rename");

        let history = port.fetch_version_history(&id).expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].title, "Second");

        let first = history[1].id.clone();
        assert!(port.restore_version(&id, &first).expect("restore"));
        assert_eq!(port.node(&id).map(|n| n.title.as_str()), Some("First"));
        assert!(!port.restore_version(&id, "nope").expect("missing version"));
    }

    #[test]
    fn last_owner_is_protected() {
        let mut port = MemoryPort::new("ada");
        let node = port.create_node("default", None, "Doc").expect("create");
        let id = node.id.as_str().to_string();

        assert!(matches!(port.revoke_access(&id, "ada"), Err(PortError::LastOwner { .. })));
        assert!(matches!(
            port.update_access_role(&id, "ada", AccessRole::View),
            Err(PortError::LastOwner { .. })
        ));

        port.grant_access(&id, "bob", AccessRole::Owner).expect("grant");
        assert!(port.update_access_role(&id, "ada", AccessRole::Edit).expect("downgrade"));
        assert!(!port.revoke_access(&id, "carol").expect("absent user"));
    }

    #[test]
    fn injected_failures_surface() {
        let mut port = seeded();
        port.set_fail_mutations(true);
        assert!(matches!(
            port.create_node("default", None, "X"),
            Err(PortError::Unavailable(_))
        ));
        assert_eq!(port.mutations(), ["create_node"]);
        port.set_fail_fetch(true);
        assert!(port.fetch_tree("default").is_err());
    }
}
