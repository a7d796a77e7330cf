//! `pt move`: reparent or reorder a page.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::output::{nav_fail, render};
use crate::workspace::{Globals, Workspace};

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Page ID to move.
    pub id: String,

    /// New parent page ID. Use "--parent none" to make it a root page.
    #[arg(long)]
    pub parent: String,

    /// Sibling position; defaults to the end of the new parent's children.
    #[arg(long)]
    pub position: Option<i64>,
}

/// Parse the `--parent` value: `none` (any case) means root.
fn parse_parent(raw: &str) -> Option<&str> {
    if raw.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(raw)
    }
}

/// # Errors
///
/// Unknown pages, moves into the page's own subtree, or write failures.
pub fn run_move(args: &MoveArgs, globals: Globals<'_>, project_root: &Path) -> Result<()> {
    let ws = Workspace::open(project_root, globals)?;
    let mut nav = ws.navigator()?;
    let parent = parse_parent(&args.parent);
    let position = args
        .position
        .unwrap_or_else(|| nav.store().tree().next_position(parent));

    nav.move_page(&args.id, parent, position)
        .map_err(|err| nav_fail(ws.output, &err))?;

    let value = json!({
        "ok": true,
        "id": args.id,
        "parent_id": parent,
        "position": position,
    });
    render(ws.output, &value, |_, w| match parent {
        Some(p) => writeln!(w, "✓ Moved {} under {p} at position {position}", args.id),
        None => writeln!(w, "✓ Moved {} to the root at position {position}", args.id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_means_root() {
        assert_eq!(parse_parent("none"), None);
        assert_eq!(parse_parent("NONE"), None);
        assert_eq!(parse_parent("pg-abc"), Some("pg-abc"));
    }
}
