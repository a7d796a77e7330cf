use std::path::Path;

use anyhow::Result;
use clap::Args;
use pagetree_core::error::ErrorCode;
use pagetree_core::model::Status;
use serde_json::json;

use crate::output::{CliError, fail, port_fail, render};
use crate::workspace::{Globals, Workspace};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Page ID.
    pub id: String,

    /// One of: draft, in_review, approved, archived.
    pub status: String,
}

/// # Errors
///
/// Unknown status names, unknown pages or write failures.
pub fn run_status(args: &StatusArgs, globals: Globals<'_>, project_root: &Path) -> Result<()> {
    let ws = Workspace::open(project_root, globals)?;
    let status: Status = args
        .status
        .parse()
        .map_err(|err: pagetree_core::model::ParseEnumError| {
            fail(ws.output, CliError::with_code(err.to_string(), ErrorCode::InvalidEnumValue))
        })?;

    let mut port = ws.port()?;
    let changed = port
        .set_status(&args.id, status)
        .map_err(|err| port_fail(ws.output, &err))?;
    if !changed {
        return Err(fail(
            ws.output,
            CliError::with_code(format!("page not found: {}", args.id), ErrorCode::NodeNotFound),
        ));
    }

    let value = json!({ "ok": true, "id": args.id, "status": status });
    render(ws.output, &value, |_, w| writeln!(w, "✓ {} is now {status}", args.id))
}
