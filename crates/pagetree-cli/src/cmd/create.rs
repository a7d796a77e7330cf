use std::path::Path;

use anyhow::Result;
use clap::Args;

use crate::output::{nav_fail, pretty_kv, render_mode};
use crate::workspace::{Globals, Workspace};

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Page title.
    #[arg(long, short)]
    pub title: String,

    /// Parent page ID; omit to create a root page.
    #[arg(long, short)]
    pub parent: Option<String>,
}

/// Create a page at the end of its parent's children.
///
/// # Errors
///
/// Returns an error if the parent does not exist or the write fails.
pub fn run_create(args: &CreateArgs, globals: Globals<'_>, project_root: &Path) -> Result<()> {
    let ws = Workspace::open(project_root, globals)?;
    let mut nav = ws.navigator()?;
    let node = nav
        .create_page(args.parent.as_deref(), &args.title)
        .map_err(|err| nav_fail(ws.output, &err))?;

    render_mode(
        ws.output,
        &node,
        |n, w| writeln!(w, "{}", n.id),
        |n, w| {
            writeln!(w, "✓ Created {}", n.id)?;
            pretty_kv(w, "Title", &n.title)?;
            pretty_kv(
                w,
                "Parent",
                n.parent_id.as_ref().map_or("(root)", |p| p.as_str()),
            )?;
            pretty_kv(w, "Space", &n.space_id)
        },
    )
}
