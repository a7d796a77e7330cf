//! Persisted expansion state.
//!
//! Only the expansion set outlives a session. It is stored per tree
//! identity under [`expansion_key`], loaded once after the first fetch and
//! written whenever [`crate::tree::TreeStore::expansion_revision`] moves.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context as _;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::db;
use crate::model::NodeId;
use crate::port::PortError;

/// Storage key for the expansion set of `space_id`.
#[must_use]
pub fn expansion_key(space_id: &str) -> String {
    format!("pagetree:expanded:{space_id}")
}

/// Key-value port for expansion sets.
pub trait ExpansionStore {
    /// `None` when nothing has been saved under `key`.
    fn load(&self, key: &str) -> Result<Option<Vec<NodeId>>, PortError>;

    fn save(&mut self, key: &str, ids: &[NodeId]) -> Result<(), PortError>;
}

/// Volatile store; optionally fails every write.
#[derive(Debug, Default)]
pub struct MemoryExpansionStore {
    entries: HashMap<String, Vec<NodeId>>,
    fail_writes: bool,
    writes: usize,
}

impl MemoryExpansionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of save attempts, failed ones included.
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.writes
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[NodeId]> {
        self.entries.get(key).map(Vec::as_slice)
    }
}

impl ExpansionStore for MemoryExpansionStore {
    fn load(&self, key: &str) -> Result<Option<Vec<NodeId>>, PortError> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, ids: &[NodeId]) -> Result<(), PortError> {
        self.writes += 1;
        if self.fail_writes {
            return Err(PortError::Unavailable("expansion write failed (injected)".into()));
        }
        self.entries.insert(key.to_string(), ids.to_vec());
        Ok(())
    }
}

/// Expansion sets in the workspace database's `expansion_state` table.
#[derive(Debug)]
pub struct SqliteExpansionStore {
    conn: Connection,
}

impl SqliteExpansionStore {
    /// Open its own connection to the workspace database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = db::open_database(path)
            .with_context(|| format!("open expansion store {}", path.display()))?;
        Ok(Self { conn })
    }

    /// # Errors
    ///
    /// Returns an error if SQLite cannot allocate the database.
    pub fn in_memory() -> Result<Self, PortError> {
        Ok(Self {
            conn: db::open_in_memory()?,
        })
    }
}

impl ExpansionStore for SqliteExpansionStore {
    fn load(&self, key: &str) -> Result<Option<Vec<NodeId>>, PortError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT ids_json FROM expansion_state WHERE state_key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|json| serde_json::from_str::<Vec<NodeId>>(&json))
            .transpose()
            .map_err(PortError::from)
    }

    fn save(&mut self, key: &str, ids: &[NodeId]) -> Result<(), PortError> {
        let mut sorted = ids.to_vec();
        sorted.sort();
        let json = serde_json::to_string(&sorted)?;
        self.conn.execute(
            "INSERT INTO expansion_state (state_key, ids_json, updated_at_us)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(state_key) DO UPDATE SET
                ids_json = excluded.ids_json,
                updated_at_us = excluded.updated_at_us",
            params![key, json, db::to_micros(Utc::now())],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<NodeId> {
        raw.iter().copied().map(NodeId::from).collect()
    }

    #[test]
    fn key_is_scoped_by_space() {
        assert_eq!(expansion_key("docs"), "pagetree:expanded:docs");
    }

    #[test]
    fn sqlite_store_round_trips_and_overwrites() {
        let mut store = SqliteExpansionStore::in_memory().expect("store");
        assert_eq!(store.load("k").expect("load"), None);

        store.save("k", &ids(&["b", "a"])).expect("save");
        assert_eq!(store.load("k").expect("load"), Some(ids(&["a", "b"])));

        store.save("k", &[]).expect("overwrite");
        assert_eq!(store.load("k").expect("load"), Some(Vec::new()));
    }

    #[test]
    fn memory_store_can_fail_writes() {
        let mut store = MemoryExpansionStore::new();
        store.set_fail_writes(true);
        assert!(store.save("k", &ids(&["a"])).is_err());
        assert_eq!(store.writes(), 1);
        assert!(store.get("k").is_none());
    }
}
