use anyhow::{Context as _, Result};
use clap::Args;
use pagetree_core::config::WORKSPACE_DIR;
use pagetree_core::db;
use serde_json::json;
use std::path::Path;

use crate::output::{OutputMode, pretty_kv, render_mode};
use crate::workspace::db_path;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Rewrite the config template even if `.pagetree/` already exists.
    /// The database is kept.
    #[arg(long)]
    pub force: bool,
}

const CONFIG_TOML: &str = "[tree]\n\
    default_space = \"default\"\n\
    persist_expansion = true\n\
    \n\
    [render]\n\
    guides = \"unicode\"\n\
    show_status = true\n\
    show_labels = true\n";

const GITIGNORE: &str = "pagetree.db\npagetree.db-wal\npagetree.db-shm\n";

/// Execute `pt init`. Creates:
///
/// ```text
/// .pagetree/
///   config.toml   (project config template)
///   .gitignore    (database files)
///   pagetree.db   (migrated workspace database)
/// ```
///
/// # Errors
///
/// Returns an error if `.pagetree/` exists and `--force` is not set, or if
/// any filesystem or database operation fails.
pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let dir = project_root.join(WORKSPACE_DIR);
    if dir.exists() && !args.force {
        anyhow::bail!("{WORKSPACE_DIR}/ already exists. Use `pt init --force` to rewrite the config.");
    }

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create workspace directory: {}", dir.display()))?;

    let config_path = dir.join("config.toml");
    std::fs::write(&config_path, CONFIG_TOML)
        .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

    let gitignore_path = dir.join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write .gitignore: {}", gitignore_path.display()))?;

    let database = db_path(project_root);
    db::open_database(&database)?;
    tracing::info!(path = %database.display(), "workspace initialized");

    let value = json!({
        "ok": true,
        "workspace": dir.display().to_string(),
        "database": database.display().to_string(),
    });
    render_mode(
        output,
        &value,
        |v, w| writeln!(w, "{}", v["workspace"].as_str().unwrap_or_default()),
        |v, w| {
            writeln!(w, "✓ Initialized {WORKSPACE_DIR}/")?;
            writeln!(w)?;
            pretty_kv(w, "Database", v["database"].as_str().unwrap_or_default())?;
            pretty_kv(w, "Config", config_path.display().to_string())?;
            writeln!(w)?;
            writeln!(w, "Next steps:")?;
            writeln!(w, "  pt create --title \"Handbook\"")?;
            writeln!(w, "  pt tui")
        },
    )
}
