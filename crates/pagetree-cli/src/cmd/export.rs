//! `pt export`: nested or flat JSON of a subtree.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;
use pagetree_core::export::{export_document, export_flat};
use serde_json::json;

use crate::output::render;
use crate::workspace::{Globals, Workspace};

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Root page of the export; omit to export the whole space.
    pub id: Option<String>,

    /// Write to FILE instead of stdout.
    #[arg(long, short, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Emit the flat node list accepted by `pt import`.
    #[arg(long)]
    pub flat: bool,
}

/// # Errors
///
/// Unknown pages or I/O failures.
pub fn run_export(args: &ExportArgs, globals: Globals<'_>, project_root: &Path) -> Result<()> {
    let ws = Workspace::open(project_root, globals)?;
    let nav = ws.navigator()?;
    if let Some(id) = &args.id {
        ws.require_node(&nav, id)?;
    }
    let tree = nav.store().tree();
    let root = args.id.as_deref();

    let (body, pages) = if args.flat {
        let nodes = export_flat(tree, root);
        (serde_json::to_string_pretty(&nodes)?, nodes.len())
    } else {
        let doc = export_document(tree, &ws.space, root);
        let pages = doc.pages.iter().map(|p| p.page_count()).sum();
        (serde_json::to_string_pretty(&doc)?, pages)
    };

    let Some(out) = &args.out else {
        // the export itself is the output, whatever the mode
        println!("{body}");
        return Ok(());
    };
    std::fs::write(out, format!("{body}\n"))
        .with_context(|| format!("write export to {}", out.display()))?;
    tracing::info!(path = %out.display(), pages, flat = args.flat, "export written");

    let value = json!({
        "ok": true,
        "path": out.display().to_string(),
        "pages": pages,
        "flat": args.flat,
    });
    render(ws.output, &value, |_, w| {
        writeln!(w, "✓ Exported {pages} page(s) to {}", out.display())
    })
}
