//! `pt ls`: flat outline of root pages.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use pagetree_core::satellite::FlatOutline;

use crate::output::{port_fail, render_mode};
use crate::workspace::{Globals, Workspace};

#[derive(Args, Debug)]
pub struct LsArgs {
    /// Also list the direct children of this root page. Repeatable.
    #[arg(long, value_name = "ID")]
    pub expand: Vec<String>,
}

/// # Errors
///
/// Returns an error if the workspace cannot be opened or a fetch fails.
pub fn run_ls(args: &LsArgs, globals: Globals<'_>, project_root: &Path) -> Result<()> {
    let ws = Workspace::open(project_root, globals)?;
    let port = ws.port()?;
    let mut outline = FlatOutline::load(&port, &ws.space)
        .map_err(|err| port_fail(ws.output, &err))?;
    for id in &args.expand {
        outline
            .toggle(&port, id)
            .map_err(|err| port_fail(ws.output, &err))?;
    }
    let rows = outline.rows();

    render_mode(
        ws.output,
        &rows,
        |rows, w| {
            for row in rows {
                writeln!(w, "{}\t{}\t{}", row.id, row.depth, row.title)?;
            }
            Ok(())
        },
        |rows, w| {
            for row in rows {
                let marker = match (row.has_children, row.expanded) {
                    (false, _) => " ",
                    (true, true) => "▾",
                    (true, false) => "▸",
                };
                let indent = if row.depth == 0 { "" } else { "    " };
                writeln!(w, "{indent}{marker} {}  {}", row.title, row.id)?;
            }
            Ok(())
        },
    )
}
