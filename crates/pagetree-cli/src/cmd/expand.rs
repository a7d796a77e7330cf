//! `pt expand` and `pt collapse`: edit the saved expansion state that
//! `pt tree` and the TUI start from.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::output::render;
use crate::workspace::{Globals, Workspace};

#[derive(Args, Debug)]
pub struct ExpandArgs {
    /// Page ID. Required unless --all is given.
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub id: Option<String>,

    /// Apply to the whole subtree of ID.
    #[arg(long, short)]
    pub recursive: bool,

    /// Apply to every page in the space.
    #[arg(long)]
    pub all: bool,
}

/// `collapse == false` expands, `true` collapses.
///
/// # Errors
///
/// Unknown pages or database failures.
pub fn run_expand(
    args: &ExpandArgs,
    collapse: bool,
    globals: Globals<'_>,
    project_root: &Path,
) -> Result<()> {
    let ws = Workspace::open(project_root, globals)?;
    let mut nav = ws.navigator()?;
    if let Some(id) = &args.id {
        ws.require_node(&nav, id)?;
    }
    if !ws.project.tree.persist_expansion {
        tracing::warn!("persist_expansion is off; the change will not be saved");
    }

    let changed = nav.update(|store| match (&args.id, args.all, collapse) {
        (_, true, false) => store.expand_all(),
        (_, true, true) => store.collapse_all(),
        (Some(id), false, false) if args.recursive => store.expand_recursive(id),
        (Some(id), false, true) if args.recursive => store.collapse_recursive(id),
        (Some(id), false, false) => store.expand_node(id),
        (Some(id), false, true) => store.collapse_node(id),
        (None, false, _) => false,
    });
    let expanded = nav.store().expanded_ids().len();

    let verb = if collapse { "collapse" } else { "expand" };
    let value = json!({
        "ok": true,
        "action": verb,
        "target": args.id,
        "changed": changed,
        "expanded": expanded,
    });
    render(ws.output, &value, |_, w| {
        let target = args.id.as_deref().unwrap_or("all pages");
        if changed {
            writeln!(w, "✓ {verb}: {target} ({expanded} expanded)")
        } else {
            writeln!(w, "{verb}: {target} unchanged")
        }
    })
}
