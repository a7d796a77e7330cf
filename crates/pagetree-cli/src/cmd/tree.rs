//! `pt tree`: print the visible tree with guide lines.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use clap::Args;
use pagetree_core::model::NodeId;
use pagetree_core::render::{RenderedRow, render_rows};
use pagetree_core::tree::search::search;
use pagetree_core::tree::visible_nodes;
use serde::Serialize;

use crate::output::render_mode;
use crate::workspace::{Globals, Workspace};

#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Only show pages whose title contains QUERY, with their ancestors.
    #[arg(long, short)]
    pub query: Option<String>,

    /// Show every page regardless of the saved expansion state.
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
struct TreeView {
    space: String,
    rows: Vec<RenderedRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    matches: Vec<NodeId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    orphans: Vec<NodeId>,
}

/// A one-shot view: neither `--all` nor `--query` changes the saved
/// expansion state.
///
/// # Errors
///
/// Returns an error if the workspace cannot be opened or loaded.
pub fn run_tree(args: &TreeArgs, globals: Globals<'_>, project_root: &Path) -> Result<()> {
    let ws = Workspace::open(project_root, globals)?;
    let nav = ws.navigator()?;
    let store = nav.store();
    let tree = store.tree();

    let mut expanded: HashSet<NodeId> = if args.all {
        tree.expandable_ids().cloned().collect()
    } else {
        store.expanded_ids().clone()
    };
    let state = args.query.as_deref().map(|q| search(tree, q));
    if let Some(state) = &state {
        for hit in &state.match_ids {
            expanded.extend(tree.ancestor_ids(hit.as_str()));
        }
    }
    let filter = state.as_ref().and_then(|s| s.filtered_ids.as_ref());
    let rows = visible_nodes(tree, &expanded, filter);

    let view = TreeView {
        space: ws.space.clone(),
        rows: render_rows(tree, &rows, &ws.project.render),
        matches: state.map(|s| s.match_ids).unwrap_or_default(),
        orphans: tree.orphan_ids().to_vec(),
    };

    render_mode(
        ws.output,
        &view,
        |v, w| {
            for row in &v.rows {
                writeln!(w, "{}\t{}\t{}", row.id, row.depth, row.title)?;
            }
            Ok(())
        },
        |v, w| {
            if v.rows.is_empty() {
                writeln!(w, "(no pages in space '{}')", v.space)?;
            }
            for row in &v.rows {
                writeln!(w, "{}  {}", row.to_line(), row.id)?;
            }
            if !v.orphans.is_empty() {
                writeln!(w)?;
                writeln!(w, "{} orphaned page(s); run `pt doctor`", v.orphans.len())?;
            }
            Ok(())
        },
    )
}
