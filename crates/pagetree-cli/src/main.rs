#![forbid(unsafe_code)]

mod cmd;
mod output;
mod tui;
mod workspace;

use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, Reported, render_error};
use pagetree_core::config;
use std::env;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use workspace::Globals;

#[derive(Parser, Debug)]
#[command(
    name = "pt",
    author,
    version,
    about = "pt: navigate and reorganize a page tree",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Space to operate on (defaults to `tree.default_space`).
    #[arg(long, global = true)]
    space: Option<String>,

    /// Identity recorded as author and owner (skips env resolution).
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags, `FORMAT` and the user config.
    fn output_mode(&self) -> OutputMode {
        let user_output = config::load_user_config()
            .ok()
            .and_then(|cfg| cfg.output);
        OutputMode::from_resolved(&config::resolve_output(
            self.json,
            user_output,
            env::var("FORMAT").ok(),
        ))
    }

    fn globals(&self, output: OutputMode) -> Globals<'_> {
        Globals {
            output,
            space: self.space.as_deref(),
            user: self.user.as_deref(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Workspace",
        about = "Initialize a pagetree workspace",
        long_about = "Create .pagetree/ with a config template and a migrated database.",
        after_help = "EXAMPLES:\n    # Initialize in the current directory\n    pt init\n\n    # Rewrite the config template\n    pt init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Read",
        about = "Print the page tree",
        long_about = "Print the visible tree using the saved expansion state.",
        after_help = "EXAMPLES:\n    # Show the tree as last expanded\n    pt tree\n\n    # Show everything\n    pt tree --all\n\n    # Filter by title\n    pt tree --query install"
    )]
    Tree(cmd::tree::TreeArgs),

    #[command(
        next_help_heading = "Read",
        about = "List root pages",
        long_about = "List root pages, optionally with the children of some of them.",
        after_help = "EXAMPLES:\n    # Roots only\n    pt ls\n\n    # Roots plus the children of one root\n    pt ls --expand pg-1a2b3c"
    )]
    Ls(cmd::ls::LsArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Create a page",
        after_help = "EXAMPLES:\n    # Create a root page\n    pt create --title \"Handbook\"\n\n    # Create a child page\n    pt create --title \"Onboarding\" --parent pg-1a2b3c"
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Move a page under a new parent",
        after_help = "EXAMPLES:\n    # Nest a page\n    pt move pg-aaa --parent pg-bbb\n\n    # Make it a root page at the top\n    pt move pg-aaa --parent none --position 0"
    )]
    Move(cmd::move_cmd::MoveArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Delete a page and its sub-pages",
        after_help = "EXAMPLES:\n    # Delete a leaf page\n    pt delete pg-aaa\n\n    # Delete a page with sub-pages\n    pt delete pg-aaa --force"
    )]
    Delete(cmd::delete::DeleteArgs),

    #[command(next_help_heading = "Edit", about = "Duplicate a page")]
    Copy(cmd::copy::CopyArgs),

    #[command(next_help_heading = "Edit", about = "Rename a page")]
    Rename(cmd::rename::RenameArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Set a page's editorial status",
        after_help = "EXAMPLES:\n    pt status pg-aaa in_review"
    )]
    Status(cmd::status::StatusArgs),

    #[command(next_help_heading = "History", about = "Show a page's version history")]
    History(cmd::history::HistoryArgs),

    #[command(
        next_help_heading = "History",
        about = "Restore a page to an earlier version",
        after_help = "EXAMPLES:\n    # By version number\n    pt restore pg-aaa 2"
    )]
    Restore(cmd::history::RestoreArgs),

    #[command(next_help_heading = "Access", about = "Inspect and change page access")]
    Access(cmd::access::AccessArgs),

    #[command(
        next_help_heading = "View State",
        about = "Expand pages in the saved view",
        after_help = "EXAMPLES:\n    pt expand pg-aaa --recursive\n    pt expand --all"
    )]
    Expand(cmd::expand::ExpandArgs),

    #[command(
        next_help_heading = "View State",
        about = "Collapse pages in the saved view"
    )]
    Collapse(cmd::expand::ExpandArgs),

    #[command(
        next_help_heading = "Interoperability",
        about = "Export pages as JSON",
        after_help = "EXAMPLES:\n    # Nested export of one subtree\n    pt export pg-aaa\n\n    # Flat export for `pt import`\n    pt export --flat --out pages.json"
    )]
    Export(cmd::export::ExportArgs),

    #[command(
        next_help_heading = "Interoperability",
        about = "Import a flat JSON page list",
        after_help = "EXAMPLES:\n    pt import pages.json"
    )]
    Import(cmd::import::ImportArgs),

    #[command(
        next_help_heading = "Workspace",
        about = "Check database and tree health"
    )]
    Doctor(cmd::doctor::DoctorArgs),

    #[command(
        next_help_heading = "Read",
        about = "Open the interactive navigator",
        long_about = "Full-screen tree navigator with search, inline creation, context menu and drag-and-drop."
    )]
    Tui,

    #[command(
        next_help_heading = "Workspace",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    pt completions bash\n    pt completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("PAGETREE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "pagetree=debug,info"
        } else {
            "pagetree=info,warn"
        })
    });

    let format = env::var("PAGETREE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli, output: OutputMode) -> anyhow::Result<()> {
    let project_root = env::current_dir()?;
    let globals = cli.globals(output);

    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, output, &project_root),
        Commands::Tree(args) => cmd::tree::run_tree(args, globals, &project_root),
        Commands::Ls(args) => cmd::ls::run_ls(args, globals, &project_root),
        Commands::Create(args) => cmd::create::run_create(args, globals, &project_root),
        Commands::Move(args) => cmd::move_cmd::run_move(args, globals, &project_root),
        Commands::Delete(args) => cmd::delete::run_delete(args, globals, &project_root),
        Commands::Copy(args) => cmd::copy::run_copy(args, globals, &project_root),
        Commands::Rename(args) => cmd::rename::run_rename(args, globals, &project_root),
        Commands::Status(args) => cmd::status::run_status(args, globals, &project_root),
        Commands::History(args) => cmd::history::run_history(args, globals, &project_root),
        Commands::Restore(args) => cmd::history::run_restore(args, globals, &project_root),
        Commands::Access(args) => cmd::access::run_access(args, globals, &project_root),
        Commands::Expand(args) => cmd::expand::run_expand(args, false, globals, &project_root),
        Commands::Collapse(args) => cmd::expand::run_expand(args, true, globals, &project_root),
        Commands::Export(args) => cmd::export::run_export(args, globals, &project_root),
        Commands::Import(args) => cmd::import::run_import(args, globals, &project_root),
        Commands::Doctor(args) => cmd::doctor::run_doctor(args, globals, &project_root),
        Commands::Tui => tui::run_tui(globals, &project_root),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = cli.output_mode();
    match run(&cli, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is::<Reported>() => {
            debug!(error = %err, "command failed");
            ExitCode::FAILURE
        }
        Err(err) => {
            if render_error(output, &CliError::new(format!("{err:#}"))).is_err() {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}
