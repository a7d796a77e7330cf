//! Canonical SQLite schema for a pagetree workspace.
//!
//! - `nodes` holds one row per page; hierarchy is `parent_id` only and
//!   deleting a page cascades to its subtree
//! - `node_labels`, `node_versions` and `node_access` hang off `nodes` and
//!   cascade with it
//! - `expansion_state` is the key-value store behind persisted expansion

/// Migration v1: pages plus labels, versions and access roster.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS nodes (
    node_id TEXT PRIMARY KEY,
    parent_id TEXT REFERENCES nodes(node_id) ON DELETE CASCADE,
    space_id TEXT NOT NULL DEFAULT 'default',
    title TEXT NOT NULL CHECK (length(trim(title)) > 0),
    icon TEXT,
    status TEXT NOT NULL DEFAULT 'draft'
        CHECK (status IN ('draft', 'in_review', 'approved', 'archived')),
    has_unpublished_changes INTEGER NOT NULL DEFAULT 0
        CHECK (has_unpublished_changes IN (0, 1)),
    position INTEGER NOT NULL DEFAULT 0,
    author TEXT NOT NULL DEFAULT '',
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    CHECK (parent_id IS NULL OR parent_id <> node_id)
);

CREATE TABLE IF NOT EXISTS node_labels (
    node_id TEXT NOT NULL REFERENCES nodes(node_id) ON DELETE CASCADE,
    label_id TEXT NOT NULL,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    color TEXT NOT NULL DEFAULT '',
    ord INTEGER NOT NULL,
    PRIMARY KEY (node_id, label_id)
);

CREATE TABLE IF NOT EXISTS node_versions (
    version_id TEXT PRIMARY KEY,
    node_id TEXT NOT NULL REFERENCES nodes(node_id) ON DELETE CASCADE,
    version_number INTEGER NOT NULL,
    author TEXT NOT NULL,
    title TEXT NOT NULL,
    change_summary TEXT,
    created_at_us INTEGER NOT NULL,
    UNIQUE (node_id, version_number)
);

CREATE TABLE IF NOT EXISTS node_access (
    node_id TEXT NOT NULL REFERENCES nodes(node_id) ON DELETE CASCADE,
    user_name TEXT NOT NULL CHECK (length(trim(user_name)) > 0),
    role TEXT NOT NULL
        CHECK (role IN ('owner', 'admin', 'edit', 'comment', 'view', 'restricted')),
    granted_at_us INTEGER NOT NULL,
    PRIMARY KEY (node_id, user_name)
);

CREATE INDEX IF NOT EXISTS idx_nodes_space_parent_position
    ON nodes(space_id, parent_id, position);
CREATE INDEX IF NOT EXISTS idx_nodes_parent
    ON nodes(parent_id);
CREATE INDEX IF NOT EXISTS idx_node_versions_node
    ON node_versions(node_id, version_number);
";

/// Migration v2: persisted expansion sets.
pub const MIGRATION_V2_SQL: &str = r"
CREATE TABLE IF NOT EXISTS expansion_state (
    state_key TEXT PRIMARY KEY,
    ids_json TEXT NOT NULL DEFAULT '[]',
    updated_at_us INTEGER NOT NULL
);
";

/// Indexes the migration tests assert on.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_nodes_space_parent_position",
    "idx_nodes_parent",
    "idx_node_versions_node",
];
