use std::path::Path;

use anyhow::Result;
use clap::Args;

use crate::output::{nav_fail, render_mode};
use crate::workspace::{Globals, Workspace};

#[derive(Args, Debug)]
pub struct RenameArgs {
    /// Page ID.
    pub id: String,

    /// New title. Recorded as a new version.
    #[arg(long, short)]
    pub title: String,
}

/// # Errors
///
/// Unknown pages, empty titles or write failures.
pub fn run_rename(args: &RenameArgs, globals: Globals<'_>, project_root: &Path) -> Result<()> {
    let ws = Workspace::open(project_root, globals)?;
    let mut nav = ws.navigator()?;
    let node = nav
        .rename_page(&args.id, &args.title)
        .map_err(|err| nav_fail(ws.output, &err))?;

    render_mode(
        ws.output,
        &node,
        |n, w| writeln!(w, "{}\t{}", n.id, n.title),
        |n, w| writeln!(w, "✓ Renamed {} to \"{}\"", n.id, n.title),
    )
}
