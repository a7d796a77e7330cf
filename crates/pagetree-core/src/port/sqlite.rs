//! [`PersistencePort`] over the local workspace database.
//!
//! Subtree deletion relies on `ON DELETE CASCADE` from `nodes.parent_id`,
//! so every connection handed to [`SqlitePort`] must have foreign keys on
//! (both [`crate::db::open_database`] and [`crate::db::open_in_memory`] do).

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::Context as _;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use serde::Serialize;
use tracing::{debug, warn};

use super::{PersistencePort, PortError, check_last_owner, derive_node_id, sort_access};
use crate::db::{self, from_micros, to_micros};
use crate::model::{AccessEntry, AccessRole, Label, NodeId, Status, TreeNode, Version};

const NODE_COLUMNS: &str = "n.node_id, n.parent_id, n.space_id, n.title, n.icon, n.status,
    n.has_unpublished_changes, n.position, n.author, n.created_at_us, n.updated_at_us,
    (SELECT COUNT(*) FROM nodes c WHERE c.parent_id = n.node_id)";

/// Outcome of [`SqlitePort::import_nodes`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    /// Nodes whose parent is neither in the file nor in the database.
    pub skipped: Vec<NodeId>,
}

#[derive(Debug)]
pub struct SqlitePort {
    conn: Connection,
    actor: String,
}

impl SqlitePort {
    /// Open the workspace database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path, actor: impl Into<String>) -> anyhow::Result<Self> {
        let conn = db::open_database(path)
            .with_context(|| format!("open pagetree database {}", path.display()))?;
        Ok(Self::from_connection(conn, actor))
    }

    /// Fresh in-memory database with the full schema.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot allocate the database.
    pub fn in_memory(actor: impl Into<String>) -> Result<Self, PortError> {
        Ok(Self::from_connection(db::open_in_memory()?, actor))
    }

    pub fn from_connection(conn: Connection, actor: impl Into<String>) -> Self {
        Self {
            conn,
            actor: actor.into(),
        }
    }

    #[must_use]
    pub fn actor(&self) -> &str {
        &self.actor
    }

    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Look up a single node by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_node(&self, node_id: &str) -> Result<Option<TreeNode>, PortError> {
        let sql = format!("SELECT {NODE_COLUMNS} FROM nodes n WHERE n.node_id = ?1");
        let node = self
            .conn
            .query_row(&sql, [node_id], row_to_node)
            .optional()?;
        let Some(mut node) = node else {
            return Ok(None);
        };
        node.labels = self.labels_for(node_id)?;
        Ok(Some(node))
    }

    /// Distinct space ids present in the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn spaces(&self) -> Result<Vec<String>, PortError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT space_id FROM nodes ORDER BY space_id")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Change the editorial status of a page.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn set_status(&mut self, node_id: &str, status: Status) -> Result<bool, PortError> {
        let changed = self.conn.execute(
            "UPDATE nodes SET status = ?2, updated_at_us = ?3 WHERE node_id = ?1",
            params![node_id, status.as_str(), to_micros(Utc::now())],
        )?;
        Ok(changed > 0)
    }

    /// Upsert a flat node list (as produced by `pt export --flat` or another
    /// workspace). Nodes whose parent chain cannot be resolved, within the
    /// list or against the database, are skipped, as are nodes that would
    /// become their own ancestor.
    ///
    /// # Errors
    ///
    /// Returns an error if any write fails; nothing is imported in that case.
    pub fn import_nodes(&mut self, nodes: &[TreeNode]) -> Result<ImportReport, PortError> {
        let actor = self.actor.clone();
        let tx = self.conn.transaction()?;
        tx.pragma_update(None, "defer_foreign_keys", "ON")?;

        // Fixpoint: a node resolves once its parent is a root, already
        // stored, or itself resolved. `order` lists parents before children.
        let mut resolved: HashSet<&str> = HashSet::new();
        let mut order: Vec<&TreeNode> = Vec::with_capacity(nodes.len());
        let mut progress = true;
        while progress {
            progress = false;
            for node in nodes {
                if resolved.contains(node.id.as_str()) {
                    continue;
                }
                let ok = match &node.parent_id {
                    None => true,
                    Some(parent) if *parent == node.id => false,
                    Some(parent) => {
                        resolved.contains(parent.as_str()) || node_exists(&tx, parent.as_str())?
                    }
                };
                if ok {
                    resolved.insert(node.id.as_str());
                    order.push(node);
                    progress = true;
                }
            }
        }

        let mut report = ImportReport::default();
        for node in nodes {
            if !resolved.contains(node.id.as_str()) {
                warn!(node_id = %node.id, parent = ?node.parent_id, "skipping imported node with unresolved parent");
                report.skipped.push(node.id.clone());
            }
        }

        // Writes land in order, so the stored parents always describe the
        // tree built so far and each new edge is checked against it.
        for node in order {
            if let Some(parent) = node.parent_id.as_ref().map(NodeId::as_str) {
                if !node_exists(&tx, parent)? {
                    warn!(node_id = %node.id, parent, "skipping imported node whose parent was skipped");
                    report.skipped.push(node.id.clone());
                    continue;
                }
                if reaches(&tx, parent, node.id.as_str())? {
                    warn!(node_id = %node.id, parent, "skipping imported node that would form a cycle");
                    report.skipped.push(node.id.clone());
                    continue;
                }
            }
            upsert_node(&tx, node)?;
            write_labels(&tx, node.id.as_str(), &node.labels)?;
            if latest_version_number(&tx, node.id.as_str())? == 0 {
                insert_version(&tx, node.id.as_str(), &actor, &node.title, "Imported")?;
            }
            let has_access: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM node_access WHERE node_id = ?1)",
                [node.id.as_str()],
                |row| row.get(0),
            )?;
            if !has_access {
                insert_access(&tx, node.id.as_str(), &actor, AccessRole::Owner)?;
            }
            report.imported += 1;
        }

        tx.commit()?;
        debug!(imported = report.imported, skipped = report.skipped.len(), "import finished");
        Ok(report)
    }

    fn labels_for(&self, node_id: &str) -> Result<Vec<Label>, PortError> {
        let mut stmt = self.conn.prepare(
            "SELECT label_id, name, color FROM node_labels WHERE node_id = ?1 ORDER BY ord",
        )?;
        let rows = stmt.query_map([node_id], |row| {
            Ok(Label {
                id: row.get(0)?,
                name: row.get(1)?,
                color: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    fn access_entries(&self, node_id: &str) -> Result<Vec<AccessEntry>, PortError> {
        access_entries(&self.conn, node_id)
    }
}

impl PersistencePort for SqlitePort {
    fn fetch_tree(&self, space_id: &str) -> Result<Vec<TreeNode>, PortError> {
        let sql = format!(
            "SELECT {NODE_COLUMNS} FROM nodes n WHERE n.space_id = ?1
             ORDER BY n.parent_id, n.position, n.node_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut nodes: Vec<TreeNode> = stmt
            .query_map([space_id], row_to_node)?
            .collect::<Result<_, _>>()?;

        let mut labels: HashMap<String, Vec<Label>> = HashMap::new();
        let mut stmt = self.conn.prepare(
            "SELECT l.node_id, l.label_id, l.name, l.color
             FROM node_labels l JOIN nodes n ON n.node_id = l.node_id
             WHERE n.space_id = ?1
             ORDER BY l.node_id, l.ord",
        )?;
        let rows = stmt.query_map([space_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                Label {
                    id: row.get(1)?,
                    name: row.get(2)?,
                    color: row.get(3)?,
                },
            ))
        })?;
        for row in rows {
            let (node_id, label) = row?;
            labels.entry(node_id).or_default().push(label);
        }
        for node in &mut nodes {
            if let Some(list) = labels.remove(node.id.as_str()) {
                node.labels = list;
            }
        }

        debug!(space_id, nodes = nodes.len(), "fetched tree");
        Ok(nodes)
    }

    fn create_node(
        &mut self,
        space_id: &str,
        parent_id: Option<&str>,
        title: &str,
    ) -> Result<TreeNode, PortError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(PortError::EmptyTitle);
        }
        let actor = self.actor.clone();
        let tx = self.conn.transaction()?;

        if let Some(parent) = parent_id {
            let parent_space: Option<String> = tx
                .query_row("SELECT space_id FROM nodes WHERE node_id = ?1", [parent], |row| {
                    row.get(0)
                })
                .optional()?;
            match parent_space {
                None => return Err(PortError::ParentNotFound(NodeId::from(parent))),
                Some(space) if space != space_id => {
                    return Err(PortError::Rejected(format!(
                        "parent {parent} belongs to space '{space}', not '{space_id}'"
                    )));
                }
                Some(_) => {}
            }
        }

        let position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM nodes
             WHERE space_id = ?1 AND parent_id IS ?2",
            params![space_id, parent_id],
            |row| row.get(0),
        )?;

        let seed = format!(
            "{space_id}:{parent_id:?}:{title}:{}",
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        );
        let id = unused_id(&tx, &seed)?;

        let mut node = TreeNode::new(id, parent_id.map(NodeId::from), title)
            .with_position(position)
            .in_space(space_id);
        node.author.clone_from(&actor);
        upsert_node(&tx, &node)?;
        insert_version(&tx, node.id.as_str(), &actor, title, "Created")?;
        insert_access(&tx, node.id.as_str(), &actor, AccessRole::Owner)?;
        tx.commit()?;

        debug!(node_id = %node.id, "created node");
        Ok(node)
    }

    fn move_node(
        &mut self,
        node_id: &str,
        new_parent_id: Option<&str>,
        new_position: i64,
    ) -> Result<bool, PortError> {
        let tx = self.conn.transaction()?;
        let space: Option<String> = tx
            .query_row("SELECT space_id FROM nodes WHERE node_id = ?1", [node_id], |row| {
                row.get(0)
            })
            .optional()?;
        let Some(space) = space else {
            return Ok(false);
        };

        if let Some(parent) = new_parent_id {
            if !node_exists(&tx, parent)? {
                return Err(PortError::ParentNotFound(NodeId::from(parent)));
            }
            if reaches(&tx, parent, node_id)? {
                return Err(PortError::Cycle {
                    node_id: NodeId::from(node_id),
                    parent_id: NodeId::from(parent),
                });
            }
        }

        tx.execute(
            "UPDATE nodes SET position = position + 1
             WHERE space_id = ?1 AND parent_id IS ?2 AND position >= ?3 AND node_id <> ?4",
            params![space, new_parent_id, new_position, node_id],
        )?;
        tx.execute(
            "UPDATE nodes SET parent_id = ?2, position = ?3, updated_at_us = ?4 WHERE node_id = ?1",
            params![node_id, new_parent_id, new_position, to_micros(Utc::now())],
        )?;
        tx.commit()?;

        debug!(node_id, parent = ?new_parent_id, position = new_position, "moved node");
        Ok(true)
    }

    fn delete_node(&mut self, node_id: &str) -> Result<bool, PortError> {
        let removed = self
            .conn
            .execute("DELETE FROM nodes WHERE node_id = ?1", [node_id])?;
        debug!(node_id, removed, "deleted node");
        Ok(removed > 0)
    }

    fn copy_node(&mut self, node_id: &str) -> Result<TreeNode, PortError> {
        let source = self
            .get_node(node_id)?
            .ok_or_else(|| PortError::NodeNotFound(NodeId::from(node_id)))?;
        let actor = self.actor.clone();
        let tx = self.conn.transaction()?;

        let position = source.position.saturating_add(1);
        tx.execute(
            "UPDATE nodes SET position = position + 1
             WHERE space_id = ?1 AND parent_id IS ?2 AND position >= ?3 AND node_id <> ?4",
            params![
                source.space_id,
                source.parent_id.as_ref().map(NodeId::as_str),
                position,
                node_id
            ],
        )?;

        let seed = format!(
            "copy:{node_id}:{}",
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        );
        let mut copy = TreeNode::new(
            unused_id(&tx, &seed)?,
            source.parent_id.clone(),
            format!("{} (copy)", source.title),
        )
        .with_position(position)
        .in_space(source.space_id.clone());
        copy.icon.clone_from(&source.icon);
        copy.labels.clone_from(&source.labels);
        copy.author.clone_from(&actor);

        upsert_node(&tx, &copy)?;
        write_labels(&tx, copy.id.as_str(), &copy.labels)?;
        insert_version(
            &tx,
            copy.id.as_str(),
            &actor,
            &copy.title,
            &format!("Copied from {node_id}"),
        )?;
        insert_access(&tx, copy.id.as_str(), &actor, AccessRole::Owner)?;
        tx.commit()?;

        debug!(source = node_id, copy = %copy.id, "copied node");
        Ok(copy)
    }

    fn rename_node(&mut self, node_id: &str, title: &str) -> Result<TreeNode, PortError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(PortError::EmptyTitle);
        }
        let actor = self.actor.clone();
        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "UPDATE nodes SET title = ?2, updated_at_us = ?3 WHERE node_id = ?1",
            params![node_id, title, to_micros(Utc::now())],
        )?;
        if changed == 0 {
            return Err(PortError::NodeNotFound(NodeId::from(node_id)));
        }
        insert_version(&tx, node_id, &actor, title, "Renamed")?;
        tx.commit()?;

        self.get_node(node_id)?
            .ok_or_else(|| PortError::NodeNotFound(NodeId::from(node_id)))
    }

    fn fetch_version_history(&self, node_id: &str) -> Result<Vec<Version>, PortError> {
        if !node_exists(&self.conn, node_id)? {
            return Err(PortError::NodeNotFound(NodeId::from(node_id)));
        }
        let mut stmt = self.conn.prepare(
            "SELECT version_id, version_number, author, created_at_us, change_summary, title
             FROM node_versions WHERE node_id = ?1
             ORDER BY version_number DESC",
        )?;
        let rows = stmt.query_map([node_id], |row| {
            Ok(Version {
                id: row.get(0)?,
                version_number: row.get(1)?,
                author: row.get(2)?,
                created_at: from_micros(row.get(3)?),
                change_summary: row.get(4)?,
                title: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    fn restore_version(&mut self, node_id: &str, version_id: &str) -> Result<bool, PortError> {
        let actor = self.actor.clone();
        let tx = self.conn.transaction()?;
        let version: Option<(u32, String)> = tx
            .query_row(
                "SELECT version_number, title FROM node_versions
                 WHERE node_id = ?1 AND version_id = ?2",
                [node_id, version_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((number, title)) = version else {
            return Ok(false);
        };

        tx.execute(
            "UPDATE nodes SET title = ?2, updated_at_us = ?3 WHERE node_id = ?1",
            params![node_id, title, to_micros(Utc::now())],
        )?;
        insert_version(&tx, node_id, &actor, &title, &format!("Restored version {number}"))?;
        tx.commit()?;
        Ok(true)
    }

    fn fetch_access_list(&self, node_id: &str) -> Result<Vec<AccessEntry>, PortError> {
        if !node_exists(&self.conn, node_id)? {
            return Err(PortError::NodeNotFound(NodeId::from(node_id)));
        }
        self.access_entries(node_id)
    }

    fn grant_access(
        &mut self,
        node_id: &str,
        user: &str,
        role: AccessRole,
    ) -> Result<AccessEntry, PortError> {
        let user = user.trim();
        if user.is_empty() {
            return Err(PortError::Rejected("user must not be empty".into()));
        }
        if !node_exists(&self.conn, node_id)? {
            return Err(PortError::NodeNotFound(NodeId::from(node_id)));
        }
        let entries = self.access_entries(node_id)?;
        check_last_owner(node_id, &entries, user, Some(role))?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM node_access WHERE node_id = ?1 AND user_name = ?2",
            [node_id, user],
        )?;
        let granted_at = insert_access(&tx, node_id, user, role)?;
        tx.commit()?;

        Ok(AccessEntry {
            user: user.to_string(),
            role,
            granted_at,
        })
    }

    fn update_access_role(
        &mut self,
        node_id: &str,
        user: &str,
        role: AccessRole,
    ) -> Result<bool, PortError> {
        let entries = self.access_entries(node_id)?;
        if !entries.iter().any(|e| e.user == user) {
            return Ok(false);
        }
        check_last_owner(node_id, &entries, user, Some(role))?;
        let changed = self.conn.execute(
            "UPDATE node_access SET role = ?3 WHERE node_id = ?1 AND user_name = ?2",
            params![node_id, user, role.as_str()],
        )?;
        Ok(changed > 0)
    }

    fn revoke_access(&mut self, node_id: &str, user: &str) -> Result<bool, PortError> {
        let entries = self.access_entries(node_id)?;
        check_last_owner(node_id, &entries, user, None)?;
        let removed = self.conn.execute(
            "DELETE FROM node_access WHERE node_id = ?1 AND user_name = ?2",
            [node_id, user],
        )?;
        Ok(removed > 0)
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

fn row_to_node(row: &Row<'_>) -> rusqlite::Result<TreeNode> {
    let status_text: String = row.get(5)?;
    let status: Status = status_text.parse().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(error))
    })?;
    Ok(TreeNode {
        id: NodeId::new(row.get::<_, String>(0)?),
        parent_id: row.get::<_, Option<String>>(1)?.map(NodeId::new),
        space_id: row.get(2)?,
        title: row.get(3)?,
        icon: row.get(4)?,
        status,
        labels: Vec::new(),
        has_unpublished_changes: row.get(6)?,
        position: row.get(7)?,
        child_count: row.get(11)?,
        author: row.get(8)?,
        created_at: from_micros(row.get(9)?),
        updated_at: from_micros(row.get(10)?),
    })
}

/// Whether walking up the stored parents from `start` meets `target`.
/// A loop already in the data counts as a hit.
fn reaches(conn: &Connection, start: &str, target: &str) -> rusqlite::Result<bool> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut cursor = Some(start.to_string());
    while let Some(current) = cursor {
        if current == target || !seen.insert(current.clone()) {
            return Ok(true);
        }
        cursor = conn
            .query_row(
                "SELECT parent_id FROM nodes WHERE node_id = ?1",
                [current.as_str()],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten();
    }
    Ok(false)
}

fn node_exists(conn: &Connection, node_id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM nodes WHERE node_id = ?1)",
        [node_id],
        |row| row.get(0),
    )
}

fn unused_id(conn: &Connection, seed: &str) -> rusqlite::Result<NodeId> {
    let mut attempt = 0;
    loop {
        let id = derive_node_id(seed, attempt);
        if !node_exists(conn, id.as_str())? {
            return Ok(id);
        }
        attempt += 1;
    }
}

fn upsert_node(tx: &Transaction<'_>, node: &TreeNode) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO nodes (
            node_id, parent_id, space_id, title, icon, status,
            has_unpublished_changes, position, author, created_at_us, updated_at_us
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(node_id) DO UPDATE SET
            parent_id = excluded.parent_id,
            space_id = excluded.space_id,
            title = excluded.title,
            icon = excluded.icon,
            status = excluded.status,
            has_unpublished_changes = excluded.has_unpublished_changes,
            position = excluded.position,
            updated_at_us = excluded.updated_at_us",
        params![
            node.id.as_str(),
            node.parent_id.as_ref().map(NodeId::as_str),
            node.space_id,
            node.title,
            node.icon,
            node.status.as_str(),
            node.has_unpublished_changes,
            node.position,
            node.author,
            to_micros(node.created_at),
            to_micros(node.updated_at),
        ],
    )?;
    Ok(())
}

fn write_labels(tx: &Transaction<'_>, node_id: &str, labels: &[Label]) -> rusqlite::Result<()> {
    tx.execute("DELETE FROM node_labels WHERE node_id = ?1", [node_id])?;
    let mut stmt = tx.prepare(
        "INSERT OR REPLACE INTO node_labels (node_id, label_id, name, color, ord)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (ord, label) in (0_i64..).zip(labels) {
        stmt.execute(params![node_id, label.id, label.name, label.color, ord])?;
    }
    Ok(())
}

fn latest_version_number(conn: &Connection, node_id: &str) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version_number), 0) FROM node_versions WHERE node_id = ?1",
        [node_id],
        |row| row.get(0),
    )
}

fn insert_version(
    tx: &Transaction<'_>,
    node_id: &str,
    author: &str,
    title: &str,
    summary: &str,
) -> rusqlite::Result<()> {
    let number = latest_version_number(tx, node_id)?.saturating_add(1);
    tx.execute(
        "INSERT INTO node_versions (
            version_id, node_id, version_number, author, title, change_summary, created_at_us
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            format!("{node_id}-v{number}"),
            node_id,
            number,
            author,
            title,
            summary,
            to_micros(Utc::now()),
        ],
    )?;
    Ok(())
}

fn insert_access(
    tx: &Transaction<'_>,
    node_id: &str,
    user: &str,
    role: AccessRole,
) -> rusqlite::Result<chrono::DateTime<Utc>> {
    let now = Utc::now();
    tx.execute(
        "INSERT INTO node_access (node_id, user_name, role, granted_at_us) VALUES (?1, ?2, ?3, ?4)",
        params![node_id, user, role.as_str(), to_micros(now)],
    )?;
    Ok(now)
}

fn access_entries(conn: &Connection, node_id: &str) -> Result<Vec<AccessEntry>, PortError> {
    let mut stmt = conn.prepare(
        "SELECT user_name, role, granted_at_us FROM node_access WHERE node_id = ?1
         ORDER BY granted_at_us, rowid",
    )?;
    let rows = stmt.query_map([node_id], |row| {
        let role_text: String = row.get(1)?;
        let role: AccessRole = role_text.parse().map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(error))
        })?;
        Ok(AccessEntry {
            user: row.get(0)?,
            role,
            granted_at: from_micros(row.get(2)?),
        })
    })?;
    let mut entries: Vec<AccessEntry> = rows.collect::<Result<_, _>>()?;
    sort_access(&mut entries);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port() -> SqlitePort {
        SqlitePort::in_memory("ada").expect("in-memory port")
    }

    #[test]
    fn create_and_fetch_round() {
        let mut port = port();
        let root = port.create_node("default", None, "Root").expect("root");
        let child = port
            .create_node("default", Some(root.id.as_str()), "Child")
            .expect("child");
        assert!(child.id.as_str().starts_with("pg-"));

        let nodes = port.fetch_tree("default").expect("fetch");
        assert_eq!(nodes.len(), 2);
        let fetched_root = nodes.iter().find(|n| n.id == root.id).expect("root row");
        assert_eq!(fetched_root.child_count, 1);
        assert_eq!(fetched_root.author, "ada");
    }

    #[test]
    fn siblings_append_in_order() {
        let mut port = port();
        let a = port.create_node("default", None, "A").expect("a");
        let b = port.create_node("default", None, "B").expect("b");
        assert_eq!(a.position, 0);
        assert_eq!(b.position, 1);
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let mut port = port();
        assert!(matches!(
            port.create_node("default", Some("pg-missing"), "X"),
            Err(PortError::ParentNotFound(_))
        ));
    }

    #[test]
    fn cross_space_parent_is_rejected() {
        let mut port = port();
        let other = port.create_node("other", None, "Elsewhere").expect("other");
        assert!(matches!(
            port.create_node("default", Some(other.id.as_str()), "X"),
            Err(PortError::Rejected(_))
        ));
    }

    #[test]
    fn delete_cascades_through_foreign_keys() {
        let mut port = port();
        let a = port.create_node("default", None, "A").expect("a");
        let b = port.create_node("default", Some(a.id.as_str()), "B").expect("b");
        port.create_node("default", Some(b.id.as_str()), "C").expect("c");

        assert!(port.delete_node(a.id.as_str()).expect("delete"));
        assert!(port.fetch_tree("default").expect("fetch").is_empty());
        let versions: i64 = port
            .connection()
            .query_row("SELECT COUNT(*) FROM node_versions", [], |row| row.get(0))
            .expect("count versions");
        assert_eq!(versions, 0);
    }

    #[test]
    fn move_rejects_cycle_and_leaves_tree_unchanged() {
        let mut port = port();
        let a = port.create_node("default", None, "A").expect("a");
        let b = port.create_node("default", Some(a.id.as_str()), "B").expect("b");

        assert!(matches!(
            port.move_node(a.id.as_str(), Some(b.id.as_str()), 0),
            Err(PortError::Cycle { .. })
        ));
        let a_now = port.get_node(a.id.as_str()).expect("get").expect("a exists");
        assert!(a_now.parent_id.is_none());
    }

    #[test]
    fn move_shifts_target_siblings() {
        let mut port = port();
        let x = port.create_node("default", None, "X").expect("x");
        let y = port.create_node("default", None, "Y").expect("y");
        let z = port.create_node("default", Some(x.id.as_str()), "Z").expect("z");

        assert!(port.move_node(z.id.as_str(), None, 1).expect("move"));
        let y_now = port.get_node(y.id.as_str()).expect("get").expect("y");
        assert_eq!(y_now.position, 2);
        assert!(!port.move_node("pg-none", None, 0).expect("unknown"));
    }

    #[test]
    fn access_roster_protects_last_owner() {
        let mut port = port();
        let doc = port.create_node("default", None, "Doc").expect("doc");
        let id = doc.id.as_str();

        assert!(matches!(port.revoke_access(id, "ada"), Err(PortError::LastOwner { .. })));
        port.grant_access(id, "bob", AccessRole::Edit).expect("grant bob");
        let roster = port.fetch_access_list(id).expect("roster");
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].user, "ada");

        assert!(port.update_access_role(id, "bob", AccessRole::Owner).expect("promote"));
        assert!(port.revoke_access(id, "ada").expect("revoke ada"));
        assert!(!port.update_access_role(id, "carol", AccessRole::View).expect("absent"));
    }

    #[test]
    fn copy_duplicates_labels_and_records_origin() {
        let mut port = port();
        let mut source = TreeNode::new("pg-src", None, "Roadmap");
        source.labels = vec![Label {
            id: "l1".into(),
            name: "infra".into(),
            color: "blue".into(),
        }];
        port.import_nodes(&[source]).expect("import");

        let copy = port.copy_node("pg-src").expect("copy");
        assert_eq!(copy.title, "Roadmap (copy)");
        assert_eq!(copy.labels.len(), 1);
        let history = port.fetch_version_history(copy.id.as_str()).expect("history");
        assert_eq!(history[0].change_summary.as_deref(), Some("Copied from pg-src"));
    }

    #[test]
    fn import_skips_unresolved_parents() {
        let mut port = port();
        let report = port
            .import_nodes(&[
                TreeNode::new("pg-child", Some("pg-root".into()), "Child"),
                TreeNode::new("pg-root", None, "Root"),
                TreeNode::new("pg-lost", Some("pg-ghost".into()), "Lost"),
            ])
            .expect("import");
        assert_eq!(report.imported, 2);
        assert_eq!(report.skipped, vec![NodeId::from("pg-lost")]);
        assert_eq!(port.fetch_tree("default").expect("fetch").len(), 2);
    }

    #[test]
    fn import_refuses_parent_inside_own_subtree() {
        let mut port = port();
        port.import_nodes(&[
            TreeNode::new("pg-a", None, "A"),
            TreeNode::new("pg-b", Some("pg-a".into()), "B"),
        ])
        .expect("seed");

        let report = port
            .import_nodes(&[TreeNode::new("pg-a", Some("pg-b".into()), "A")])
            .expect("import");
        assert_eq!(report.imported, 0);
        assert_eq!(report.skipped, vec![NodeId::from("pg-a")]);

        let a = port.get_node("pg-a").expect("get").expect("a");
        assert_eq!(a.parent_id, None);
        let tree = crate::tree::build_tree(port.fetch_tree("default").expect("fetch"));
        assert_eq!(tree.root_ids().len(), 1);
    }

    #[test]
    fn import_can_flip_parent_and_child() {
        let mut port = port();
        port.import_nodes(&[
            TreeNode::new("pg-a", None, "A"),
            TreeNode::new("pg-b", Some("pg-a".into()), "B"),
        ])
        .expect("seed");

        let report = port
            .import_nodes(&[
                TreeNode::new("pg-b", None, "B"),
                TreeNode::new("pg-a", Some("pg-b".into()), "A"),
            ])
            .expect("import");
        assert_eq!(report.imported, 2);
        assert!(report.skipped.is_empty());
        let a = port.get_node("pg-a").expect("get").expect("a");
        assert_eq!(a.parent_id, Some(NodeId::from("pg-b")));
    }

    #[test]
    fn status_updates_persist() {
        let mut port = port();
        let doc = port.create_node("default", None, "Doc").expect("doc");
        assert!(port.set_status(doc.id.as_str(), Status::InReview).expect("status"));
        let now = port.get_node(doc.id.as_str()).expect("get").expect("doc");
        assert_eq!(now.status, Status::InReview);
    }
}
