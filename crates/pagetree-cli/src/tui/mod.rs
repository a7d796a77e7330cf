//! Terminal user interface for pagetree.
//!
//! ## Entry points
//!
//! - [`run_tui`]: full-screen navigator over the workspace database.
//!
//! [`app::App`] holds the interaction state, [`view`] draws it.

pub mod app;
pub mod view;

use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use app::App;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use pagetree_core::expansion::ExpansionStore;
use pagetree_core::port::PersistencePort;
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::workspace::{Globals, Workspace};

/// Input poll interval; also bounds how late an expired status clears.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Open the workspace and run the navigator until the user quits.
///
/// # Errors
///
/// Returns an error if the workspace cannot be loaded or the terminal
/// cannot be set up.
pub fn run_tui(globals: Globals<'_>, project_root: &Path) -> Result<()> {
    let ws = Workspace::open(project_root, globals)?;
    let nav = ws.navigator()?;
    let mut app = App::new(nav, ws.project.render.clone(), Some(ws.root.clone()));

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to setup terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let result = run_event_loop(&mut terminal, &mut app);

    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("Failed to restore terminal")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    result
}

fn run_event_loop<P: PersistencePort, E: ExpansionStore>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<P, E>,
) -> Result<()> {
    loop {
        terminal
            .draw(|f| view::draw(f, app))
            .context("Failed to draw terminal")?;

        if event::poll(POLL_INTERVAL).context("Failed to poll input")? {
            match event::read().context("Failed to read input")? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
        }

        if app.should_quit() {
            return Ok(());
        }
    }
}
