use std::path::Path;

use anyhow::Result;
use clap::Args;
use pagetree_core::error::ErrorCode;
use serde_json::json;

use crate::output::{CliError, fail, nav_fail, render};
use crate::workspace::{Globals, Workspace};

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Page ID to delete, together with everything below it.
    pub id: String,

    /// Required when the page has sub-pages.
    #[arg(long, short)]
    pub force: bool,
}

/// # Errors
///
/// Unknown pages, a non-empty subtree without `--force`, or write failures.
pub fn run_delete(args: &DeleteArgs, globals: Globals<'_>, project_root: &Path) -> Result<()> {
    let ws = Workspace::open(project_root, globals)?;
    let mut nav = ws.navigator()?;
    ws.require_node(&nav, &args.id)?;

    let below = nav.store().get_descendant_ids(&args.id);
    if !below.is_empty() && !args.force {
        return Err(fail(
            ws.output,
            CliError::with_code(
                format!("{} has {} sub-page(s); pass --force to delete them too", args.id, below.len()),
                ErrorCode::OperationRejected,
            ),
        ));
    }

    nav.delete_page(&args.id)
        .map_err(|err| nav_fail(ws.output, &err))?;

    let value = json!({
        "ok": true,
        "id": args.id,
        "deleted": below.len() + 1,
    });
    render(ws.output, &value, |_, w| {
        writeln!(w, "✓ Deleted {} ({} page(s))", args.id, below.len() + 1)
    })
}
