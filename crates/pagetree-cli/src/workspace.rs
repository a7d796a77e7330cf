//! Locating and opening the `.pagetree/` workspace for a command.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use pagetree_core::Navigator;
use pagetree_core::config::{self, ProjectConfig, UserConfig, WORKSPACE_DIR};
use pagetree_core::error::ErrorCode;
use pagetree_core::expansion::SqliteExpansionStore;
use pagetree_core::port::SqlitePort;

use crate::output::{CliError, OutputMode, fail, nav_fail};

pub const DB_FILE: &str = "pagetree.db";

pub type SqliteNavigator = Navigator<SqlitePort, SqliteExpansionStore>;

/// Flags shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct Globals<'a> {
    pub output: OutputMode,
    pub space: Option<&'a str>,
    pub user: Option<&'a str>,
}

/// An opened workspace with its resolved settings.
#[derive(Debug)]
pub struct Workspace {
    pub root: PathBuf,
    pub project: ProjectConfig,
    pub actor: String,
    pub space: String,
    pub output: OutputMode,
}

#[must_use]
pub fn db_path(root: &Path) -> PathBuf {
    root.join(WORKSPACE_DIR).join(DB_FILE)
}

impl Workspace {
    /// Resolve config for an initialized workspace at `root`.
    ///
    /// # Errors
    ///
    /// Fails (after rendering the error) when `.pagetree/` is missing or a
    /// config file does not parse.
    pub fn open(root: &Path, globals: Globals<'_>) -> Result<Self> {
        if !root.join(WORKSPACE_DIR).is_dir() {
            return Err(fail(
                globals.output,
                CliError::with_code(
                    format!("no {WORKSPACE_DIR}/ workspace in {}", root.display()),
                    ErrorCode::NotInitialized,
                ),
            ));
        }
        let project = config::load_project_config(root).map_err(|err| {
            fail(
                globals.output,
                CliError::with_code(format!("{err:#}"), ErrorCode::ConfigParseError),
            )
        })?;
        let user = config::load_user_config().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "ignoring unreadable user config");
            UserConfig::default()
        });

        Ok(Self {
            root: root.to_path_buf(),
            actor: config::resolve_actor(globals.user, &user),
            space: globals
                .space
                .map_or_else(|| project.tree.default_space.clone(), str::to_string),
            project,
            output: globals.output,
        })
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        db_path(&self.root)
    }

    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn port(&self) -> Result<SqlitePort> {
        SqlitePort::open(&self.db_path(), self.actor.clone())
    }

    /// Open and mount a navigator over the workspace database. Expansion
    /// is only persisted when the project config asks for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the first
    /// fetch fails.
    pub fn navigator(&self) -> Result<SqliteNavigator> {
        let port = self.port()?;
        let expansion = if self.project.tree.persist_expansion {
            Some(SqliteExpansionStore::open(&self.db_path()).context("open expansion state")?)
        } else {
            None
        };
        let mut nav = Navigator::new(port, expansion, self.space.clone());
        nav.mount().map_err(|err| nav_fail(self.output, &err))?;
        Ok(nav)
    }

    /// Fail with a not-found error unless `id` is in the loaded tree.
    ///
    /// # Errors
    ///
    /// Returns the rendered not-found error.
    pub fn require_node(&self, nav: &SqliteNavigator, id: &str) -> Result<()> {
        if nav.store().tree().contains(id) {
            return Ok(());
        }
        Err(fail(
            self.output,
            CliError::with_code(
                format!("page not found in space '{}': {id}", self.space),
                ErrorCode::NodeNotFound,
            ),
        ))
    }
}
