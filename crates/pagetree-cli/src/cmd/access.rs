//! `pt access`: page access roster.

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use pagetree_core::error::ErrorCode;
use pagetree_core::model::{AccessRole, ParseEnumError};
use serde_json::json;

use crate::output::{CliError, OutputMode, fail, nav_fail, pretty_section, render, render_mode};
use crate::workspace::{Globals, Workspace};

#[derive(Args, Debug)]
pub struct AccessArgs {
    #[command(subcommand)]
    pub command: AccessCommand,
}

#[derive(Subcommand, Debug)]
pub enum AccessCommand {
    /// Show who can access a page, strongest role first.
    List {
        /// Page ID.
        id: String,
    },
    /// Give a user a role on a page (or change it).
    Grant {
        id: String,
        #[arg(value_name = "USER")]
        member: String,
        /// owner, admin, edit, comment, view or restricted.
        role: String,
    },
    /// Change the role of a user who already has an entry.
    Update {
        id: String,
        #[arg(value_name = "USER")]
        member: String,
        role: String,
    },
    /// Remove a user's entry.
    Revoke {
        id: String,
        #[arg(value_name = "USER")]
        member: String,
    },
}

fn parse_role(output: OutputMode, raw: &str) -> Result<AccessRole> {
    raw.parse().map_err(|err: ParseEnumError| {
        fail(
            output,
            CliError::with_code(err.to_string(), ErrorCode::InvalidEnumValue),
        )
    })
}

fn no_entry(output: OutputMode, id: &str, user: &str) -> anyhow::Error {
    fail(
        output,
        CliError::with_code(
            format!("{user} has no access entry on {id}"),
            ErrorCode::NodeNotFound,
        ),
    )
}

/// # Errors
///
/// Unknown pages, roles or users, last-owner violations and write failures.
pub fn run_access(args: &AccessArgs, globals: Globals<'_>, project_root: &Path) -> Result<()> {
    let ws = Workspace::open(project_root, globals)?;
    let mut nav = ws.navigator()?;

    match &args.command {
        AccessCommand::List { id } => {
            ws.require_node(&nav, id)?;
            let entries = nav
                .access_list(id)
                .map_err(|err| nav_fail(ws.output, &err))?;
            render_mode(
                ws.output,
                &entries,
                |entries, w| {
                    for e in entries {
                        writeln!(w, "{}\t{}\t{}", e.user, e.role, e.granted_at.to_rfc3339())?;
                    }
                    Ok(())
                },
                |entries, w| {
                    pretty_section(w, &format!("Access to {id}"))?;
                    for e in entries {
                        writeln!(
                            w,
                            "{:<20} {:<10} since {}",
                            e.user,
                            e.role,
                            e.granted_at.format("%Y-%m-%d")
                        )?;
                    }
                    Ok(())
                },
            )
        }
        AccessCommand::Grant { id, member, role } => {
            let role = parse_role(ws.output, role)?;
            ws.require_node(&nav, id)?;
            let entry = nav
                .grant_access(id, member, role)
                .map_err(|err| nav_fail(ws.output, &err))?;
            render(ws.output, &entry, |e, w| {
                writeln!(w, "✓ Granted {} to {} on {id}", e.role, e.user)
            })
        }
        AccessCommand::Update { id, member, role } => {
            let role = parse_role(ws.output, role)?;
            ws.require_node(&nav, id)?;
            let changed = nav
                .update_access_role(id, member, role)
                .map_err(|err| nav_fail(ws.output, &err))?;
            if !changed {
                return Err(no_entry(ws.output, id, member));
            }
            let value = json!({ "ok": true, "id": id, "user": member, "role": role });
            render(ws.output, &value, |_, w| {
                writeln!(w, "✓ {member} is now {role} on {id}")
            })
        }
        AccessCommand::Revoke { id, member } => {
            ws.require_node(&nav, id)?;
            let removed = nav
                .revoke_access(id, member)
                .map_err(|err| nav_fail(ws.output, &err))?;
            if !removed {
                return Err(no_entry(ws.output, id, member));
            }
            let value = json!({ "ok": true, "id": id, "user": member });
            render(ws.output, &value, |_, w| {
                writeln!(w, "✓ Revoked {member} on {id}")
            })
        }
    }
}
