use std::path::Path;

use anyhow::Result;
use clap::Args;

use crate::output::{nav_fail, render_mode};
use crate::workspace::{Globals, Workspace};

#[derive(Args, Debug)]
pub struct CopyArgs {
    /// Page ID to duplicate. The copy lands right after the original.
    pub id: String,
}

/// # Errors
///
/// Unknown pages or write failures.
pub fn run_copy(args: &CopyArgs, globals: Globals<'_>, project_root: &Path) -> Result<()> {
    let ws = Workspace::open(project_root, globals)?;
    let mut nav = ws.navigator()?;
    let copy = nav
        .copy_page(&args.id)
        .map_err(|err| nav_fail(ws.output, &err))?;

    render_mode(
        ws.output,
        &copy,
        |n, w| writeln!(w, "{}", n.id),
        |n, w| writeln!(w, "✓ Copied {} to {} \"{}\"", args.id, n.id, n.title),
    )
}
