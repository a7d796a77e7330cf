//! `pt history` and `pt restore`.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use pagetree_core::error::ErrorCode;
use pagetree_core::model::Version;
use serde_json::json;

use crate::output::{CliError, fail, nav_fail, pretty_section, render, render_mode};
use crate::workspace::{Globals, Workspace};

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Page ID.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Page ID.
    pub id: String,

    /// Version ID, or a version number as shown by `pt history`.
    pub version: String,
}

/// # Errors
///
/// Unknown pages or read failures.
pub fn run_history(args: &HistoryArgs, globals: Globals<'_>, project_root: &Path) -> Result<()> {
    let ws = Workspace::open(project_root, globals)?;
    let mut nav = ws.navigator()?;
    ws.require_node(&nav, &args.id)?;
    let versions = nav
        .version_history(&args.id)
        .map_err(|err| nav_fail(ws.output, &err))?;

    render_mode(
        ws.output,
        &versions,
        |versions, w| {
            for v in versions {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}\t{}",
                    v.version_number,
                    v.id,
                    v.author,
                    v.created_at.to_rfc3339(),
                    v.title
                )?;
            }
            Ok(())
        },
        |versions, w| {
            pretty_section(w, &format!("History of {}", args.id))?;
            if versions.is_empty() {
                writeln!(w, "(no versions recorded)")?;
            }
            for v in versions {
                write!(
                    w,
                    "v{:<4} {}  {:<12} \"{}\"",
                    v.version_number,
                    v.created_at.format("%Y-%m-%d %H:%M"),
                    v.author,
                    v.title
                )?;
                match &v.change_summary {
                    Some(summary) => writeln!(w, "  ({summary})")?,
                    None => writeln!(w)?,
                }
            }
            Ok(())
        },
    )
}

/// Match `wanted` against version ids first, then version numbers.
fn find_version<'a>(versions: &'a [Version], wanted: &str) -> Option<&'a Version> {
    let wanted = wanted.trim();
    versions.iter().find(|v| v.id == wanted).or_else(|| {
        let number: u32 = wanted.trim_start_matches(['v', 'V']).parse().ok()?;
        versions.iter().find(|v| v.version_number == number)
    })
}

/// # Errors
///
/// Unknown pages or versions, or write failures.
pub fn run_restore(args: &RestoreArgs, globals: Globals<'_>, project_root: &Path) -> Result<()> {
    let ws = Workspace::open(project_root, globals)?;
    let mut nav = ws.navigator()?;
    ws.require_node(&nav, &args.id)?;
    let versions = nav
        .version_history(&args.id)
        .map_err(|err| nav_fail(ws.output, &err))?;
    let Some(version) = find_version(&versions, &args.version) else {
        return Err(fail(
            ws.output,
            CliError::with_code(
                format!("{} has no version '{}'", args.id, args.version),
                ErrorCode::NodeNotFound,
            ),
        ));
    };
    let version = version.clone();

    nav.restore_version(&args.id, &version.id)
        .map_err(|err| nav_fail(ws.output, &err))?;

    let value = json!({
        "ok": true,
        "id": args.id,
        "version_id": version.id,
        "version_number": version.version_number,
        "title": version.title,
    });
    render(ws.output, &value, |_, w| {
        writeln!(
            w,
            "✓ Restored {} to v{} \"{}\"",
            args.id, version.version_number, version.title
        )
    })
}
