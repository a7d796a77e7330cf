//! `pt doctor`: database and tree health report.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use pagetree_core::db::migrations::{LATEST_SCHEMA_VERSION, current_schema_version};
use pagetree_core::model::NodeId;
use pagetree_core::port::{PersistencePort, PortError, SqlitePort};
use pagetree_core::tree::build_tree;
use serde::Serialize;

use crate::output::{port_fail, pretty_kv, pretty_section, render_mode};
use crate::workspace::{Globals, Workspace};

#[derive(Args, Debug)]
pub struct DoctorArgs {}

#[derive(Debug, Serialize)]
struct SpaceReport {
    space: String,
    pages: usize,
    roots: usize,
    orphans: Vec<NodeId>,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    ok: bool,
    schema_version: u32,
    latest_schema_version: u32,
    integrity: String,
    spaces: Vec<SpaceReport>,
}

fn integrity_check(port: &SqlitePort) -> Result<String, PortError> {
    Ok(port
        .connection()
        .query_row("PRAGMA integrity_check", [], |row| row.get(0))?)
}

/// # Errors
///
/// Returns an error if the database cannot be queried.
pub fn run_doctor(_args: &DoctorArgs, globals: Globals<'_>, project_root: &Path) -> Result<()> {
    let ws = Workspace::open(project_root, globals)?;
    let port = ws.port()?;

    let schema_version = current_schema_version(port.connection())?;
    let integrity = integrity_check(&port).map_err(|err| port_fail(ws.output, &err))?;

    let mut spaces = Vec::new();
    for space in port.spaces().map_err(|err| port_fail(ws.output, &err))? {
        let nodes = port
            .fetch_tree(&space)
            .map_err(|err| port_fail(ws.output, &err))?;
        let tree = build_tree(nodes);
        spaces.push(SpaceReport {
            pages: tree.len(),
            roots: tree.root_ids().len(),
            orphans: tree.orphan_ids().to_vec(),
            space,
        });
    }

    let report = DoctorReport {
        ok: integrity == "ok"
            && schema_version == LATEST_SCHEMA_VERSION
            && spaces.iter().all(|s| s.orphans.is_empty()),
        schema_version,
        latest_schema_version: LATEST_SCHEMA_VERSION,
        integrity,
        spaces,
    };

    render_mode(
        ws.output,
        &report,
        |r, w| {
            writeln!(w, "schema\t{}\t{}", r.schema_version, r.latest_schema_version)?;
            writeln!(w, "integrity\t{}", r.integrity)?;
            for s in &r.spaces {
                writeln!(w, "space\t{}\t{}\t{}\t{}", s.space, s.pages, s.roots, s.orphans.len())?;
            }
            Ok(())
        },
        |r, w| {
            pretty_section(w, "pagetree doctor")?;
            pretty_kv(
                w,
                "Schema",
                format!("v{} (latest v{})", r.schema_version, r.latest_schema_version),
            )?;
            pretty_kv(w, "Integrity", &r.integrity)?;
            if r.spaces.is_empty() {
                pretty_kv(w, "Spaces", "(none)")?;
            }
            for s in &r.spaces {
                pretty_kv(
                    w,
                    "Space",
                    format!("{}: {} page(s), {} root(s)", s.space, s.pages, s.roots),
                )?;
                for orphan in &s.orphans {
                    writeln!(w, "  ! orphan {orphan}: parent missing, shown as a root")?;
                }
            }
            writeln!(w)?;
            writeln!(w, "{}", if r.ok { "✓ healthy" } else { "✗ problems found" })
        },
    )
}
