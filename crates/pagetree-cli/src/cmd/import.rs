//! `pt import`: load a flat node list produced by `pt export --flat`.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;
use pagetree_core::error::ErrorCode;
use pagetree_core::model::TreeNode;

use crate::output::{CliError, fail, port_fail, render};
use crate::workspace::{Globals, Workspace};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// JSON file holding a flat node array.
    pub file: PathBuf,

    /// Keep each node's own space instead of importing into the active one.
    #[arg(long)]
    pub keep_space: bool,
}

/// Existing pages with the same id are updated in place.
///
/// # Errors
///
/// Unreadable or malformed files and write failures.
pub fn run_import(args: &ImportArgs, globals: Globals<'_>, project_root: &Path) -> Result<()> {
    let ws = Workspace::open(project_root, globals)?;
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("read {}", args.file.display()))?;
    let mut nodes: Vec<TreeNode> = serde_json::from_str(&raw).map_err(|err| {
        fail(
            ws.output,
            CliError::with_code(
                format!("{} is not a flat node list: {err}", args.file.display()),
                ErrorCode::OperationRejected,
            ),
        )
    })?;
    if !args.keep_space {
        for node in &mut nodes {
            node.space_id.clone_from(&ws.space);
        }
    }

    let mut port = ws.port()?;
    let report = port
        .import_nodes(&nodes)
        .map_err(|err| port_fail(ws.output, &err))?;

    render(ws.output, &report, |r, w| {
        writeln!(w, "✓ Imported {} page(s)", r.imported)?;
        if !r.skipped.is_empty() {
            writeln!(w, "  skipped {} with unknown parents:", r.skipped.len())?;
            for id in &r.skipped {
                writeln!(w, "    {id}")?;
            }
        }
        Ok(())
    })
}
