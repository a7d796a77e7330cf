//! Flat outline: a reduced, secondary view over `fetch_tree`.
//!
//! Shows roots as a flat list and loads one level of children when a root
//! is expanded. It keeps its own expansion set, shares nothing with the
//! [`crate::tree::TreeStore`], and does not enforce the tree invariants:
//! children are whatever the last fetch reports under that parent.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::model::{NodeId, TreeNode};
use crate::port::{PersistencePort, PortError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineRow {
    pub id: NodeId,
    pub title: String,
    /// 0 for roots, 1 for loaded children.
    pub depth: u8,
    pub has_children: bool,
    pub expanded: bool,
}

#[derive(Debug, Default)]
pub struct FlatOutline {
    space_id: String,
    roots: Vec<TreeNode>,
    children: HashMap<NodeId, Vec<TreeNode>>,
    expanded: HashSet<NodeId>,
}

fn sort_siblings(nodes: &mut [TreeNode]) {
    nodes.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
}

impl FlatOutline {
    /// Fetch and show the roots of `space_id`.
    ///
    /// # Errors
    ///
    /// Returns the port's fetch error.
    pub fn load<P: PersistencePort>(port: &P, space_id: &str) -> Result<Self, PortError> {
        let mut outline = Self {
            space_id: space_id.to_string(),
            ..Self::default()
        };
        outline.reload(port)?;
        Ok(outline)
    }

    /// Refetch roots. Loaded children are dropped and reloaded on demand;
    /// the expansion set is kept.
    ///
    /// # Errors
    ///
    /// Returns the port's fetch error; the outline keeps its previous rows.
    pub fn reload<P: PersistencePort>(&mut self, port: &P) -> Result<(), PortError> {
        let mut roots: Vec<TreeNode> = port
            .fetch_tree(&self.space_id)?
            .into_iter()
            .filter(|n| n.parent_id.is_none())
            .collect();
        sort_siblings(&mut roots);
        self.roots = roots;
        self.children.clear();
        debug!(space = %self.space_id, roots = self.roots.len(), "outline reloaded");
        Ok(())
    }

    #[must_use]
    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    /// Expand or collapse a root. Children are fetched the first time a
    /// root is expanded after a reload.
    ///
    /// # Errors
    ///
    /// Returns the port's fetch error; expansion is left unchanged.
    pub fn toggle<P: PersistencePort>(&mut self, port: &P, id: &str) -> Result<bool, PortError> {
        if self.expanded.remove(id) {
            return Ok(false);
        }
        if !self.roots.iter().any(|r| r.id.as_str() == id) {
            return Ok(false);
        }
        if !self.children.contains_key(id) {
            self.load_children(port, id)?;
        }
        self.expanded.insert(NodeId::from(id));
        Ok(true)
    }

    fn load_children<P: PersistencePort>(&mut self, port: &P, id: &str) -> Result<(), PortError> {
        let mut direct: Vec<TreeNode> = port
            .fetch_tree(&self.space_id)?
            .into_iter()
            .filter(|n| n.parent_id.as_ref().is_some_and(|p| p.as_str() == id))
            .collect();
        sort_siblings(&mut direct);
        debug!(parent = id, children = direct.len(), "outline children loaded");
        self.children.insert(NodeId::from(id), direct);
        Ok(())
    }

    /// Rows in display order.
    #[must_use]
    pub fn rows(&self) -> Vec<OutlineRow> {
        let mut rows = Vec::with_capacity(self.roots.len());
        for root in &self.roots {
            let expanded = self.expanded.contains(&root.id);
            let loaded = self.children.get(&root.id);
            rows.push(OutlineRow {
                id: root.id.clone(),
                title: root.title.clone(),
                depth: 0,
                has_children: loaded.map_or(root.child_count > 0, |c| !c.is_empty()),
                expanded,
            });
            if !expanded {
                continue;
            }
            for child in loaded.into_iter().flatten() {
                rows.push(OutlineRow {
                    id: child.id.clone(),
                    title: child.title.clone(),
                    depth: 1,
                    has_children: child.child_count > 0,
                    expanded: false,
                });
            }
        }
        rows
    }
}
