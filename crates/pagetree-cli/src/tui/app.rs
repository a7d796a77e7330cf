//! TUI state and input handling.
//!
//! [`App`] wraps a [`Navigator`] and translates keys and mouse gestures into
//! navigator commands. It holds no tree state of its own: the selected row,
//! the visible list and every popup are derived from the navigator after
//! each input.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use pagetree_core::config::RenderConfig;
use pagetree_core::expansion::ExpansionStore;
use pagetree_core::export::ExportDocument;
use pagetree_core::interaction::{DropRelation, InlineEvent, Viewport};
use pagetree_core::model::{AccessEntry, NodeId, Version};
use pagetree_core::port::PersistencePort;
use pagetree_core::render::{RenderedRow, render_rows};
use pagetree_core::{NavEvent, Navigator, NoticeLevel};
use ratatui::layout::Rect;

/// How long a status message stays up.
const STATUS_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    Inline,
    Menu,
    /// Keyboard move: the cursor picks a drop target for the dragged page.
    Move,
    Popup,
    Help,
}

#[derive(Debug, Clone)]
pub enum Popup {
    History {
        node_id: NodeId,
        versions: Vec<Version>,
    },
    Access {
        node_id: NodeId,
        entries: Vec<AccessEntry>,
    },
}

/// Mouse press that may turn into a drag.
#[derive(Debug, Clone)]
struct Press {
    id: NodeId,
    dragging: bool,
}

pub struct App<P, E> {
    nav: Navigator<P, E>,
    render: RenderConfig,
    mode: InputMode,
    search_buf: String,
    /// Move-mode cursor; the navigator's selection stays on the dragged page.
    move_cursor: Option<NodeId>,
    popup: Option<Popup>,
    status: Option<(String, NoticeLevel, Instant)>,
    press: Option<Press>,
    export_dir: Option<PathBuf>,
    should_quit: bool,
    /// Inner tree area and first visible row, recorded by the last draw.
    pub(crate) tree_area: Rect,
    pub(crate) scroll: usize,
    pub(crate) viewport: Viewport,
}

impl<P: PersistencePort, E: ExpansionStore> App<P, E> {
    /// `export_dir` is where menu exports are written; `None` keeps them
    /// in memory only.
    pub fn new(nav: Navigator<P, E>, render: RenderConfig, export_dir: Option<PathBuf>) -> Self {
        let mut app = Self {
            nav,
            render,
            mode: InputMode::Normal,
            search_buf: String::new(),
            move_cursor: None,
            popup: None,
            status: None,
            press: None,
            export_dir,
            should_quit: false,
            tree_area: Rect::default(),
            scroll: 0,
            viewport: Viewport {
                width: 80,
                height: 24,
            },
        };
        if app.nav.store().selected_id().is_none() {
            let first = app.rows().first().map(|r| r.id.clone());
            app.nav.select(first.as_ref().map(NodeId::as_str));
        }
        app
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub const fn navigator(&self) -> &Navigator<P, E> {
        &self.nav
    }

    pub const fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn search_buf(&self) -> &str {
        &self.search_buf
    }

    pub const fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub const fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub const fn render_config(&self) -> &RenderConfig {
        &self.render
    }

    /// Current status message, if it has not expired.
    pub fn status(&self) -> Option<(&str, NoticeLevel)> {
        self.status
            .as_ref()
            .filter(|(_, _, at)| at.elapsed() < STATUS_TTL)
            .map(|(msg, level, _)| (msg.as_str(), *level))
    }

    pub fn set_status(&mut self, message: impl Into<String>, level: NoticeLevel) {
        self.status = Some((message.into(), level, Instant::now()));
    }

    /// The id the cursor is on: the move target in move mode, otherwise the
    /// selection.
    pub fn cursor_id(&self) -> Option<&NodeId> {
        match self.mode {
            InputMode::Move => self.move_cursor.as_ref(),
            _ => self.nav.store().selected_id(),
        }
    }

    /// Rows as they should be drawn right now.
    pub fn rows(&self) -> Vec<RenderedRow> {
        let store = self.nav.store();
        render_rows(store.tree(), &store.visible_nodes(), &self.render)
    }

    pub fn cursor_index(&self, rows: &[RenderedRow]) -> Option<usize> {
        let id = self.cursor_id()?;
        rows.iter().position(|r| &r.id == id)
    }

    // -----------------------------------------------------------------------
    // Keyboard
    // -----------------------------------------------------------------------

    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match self.mode {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::Search => self.handle_search_key(key),
            InputMode::Inline => self.handle_inline_key(key),
            InputMode::Menu => self.handle_menu_key(key),
            InputMode::Move => self.handle_move_key(key),
            InputMode::Popup | InputMode::Help => {
                if matches!(
                    key.code,
                    KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q' | '?')
                ) {
                    self.popup = None;
                    self.mode = InputMode::Normal;
                }
            }
        }
        self.drain_navigator();
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,

            KeyCode::Char('j') | KeyCode::Down => self.step(1),
            KeyCode::Char('k') | KeyCode::Up => self.step(-1),
            KeyCode::Char('g') | KeyCode::Home => self.jump(false),
            KeyCode::Char('G') | KeyCode::End => self.jump(true),
            KeyCode::PageDown => self.step(10),
            KeyCode::PageUp => self.step(-10),

            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(id) = self.selected() {
                    self.nav.toggle_expand(id.as_str());
                }
            }
            KeyCode::Char('l') | KeyCode::Right => {
                if let Some(id) = self.selected() {
                    self.nav.update(|s| s.expand_node(id.as_str()));
                }
            }
            KeyCode::Char('h') | KeyCode::Left => self.collapse_or_parent(),
            KeyCode::Char('E') => {
                if let Some(id) = self.selected() {
                    self.nav.update(|s| s.expand_recursive(id.as_str()));
                }
            }
            KeyCode::Char('C') => {
                if let Some(id) = self.selected() {
                    self.nav.update(|s| s.collapse_recursive(id.as_str()));
                }
            }
            KeyCode::Char('*') => {
                self.nav.update(pagetree_core::tree::TreeStore::expand_all);
            }
            KeyCode::Char('-') => {
                self.nav.update(pagetree_core::tree::TreeStore::collapse_all);
            }

            KeyCode::Char('/') => {
                self.search_buf = self.nav.store().search().query.clone();
                self.mode = InputMode::Search;
            }
            KeyCode::Esc => {
                if self.nav.store().search().is_active() {
                    self.search_buf.clear();
                    self.nav.set_search_query("");
                    self.set_status("Search cleared", NoticeLevel::Info);
                }
            }

            KeyCode::Char('a') => {
                let parent = self.selected();
                self.nav.open_inline(parent.as_ref().map(NodeId::as_str));
                self.mode = InputMode::Inline;
            }
            KeyCode::Char('A') => {
                self.nav.open_inline(None);
                self.mode = InputMode::Inline;
            }

            KeyCode::Char('x') => {
                let rows = self.rows();
                if let Some(idx) = self.cursor_index(&rows) {
                    let (x, y) = self.row_anchor(&rows[idx], idx);
                    self.open_menu_at(rows[idx].id.clone(), x, y);
                }
            }

            KeyCode::Char('m') => self.begin_move(),

            KeyCode::Char('r') => match self.nav.refresh() {
                Ok(()) => self.set_status("Reloaded", NoticeLevel::Info),
                Err(err) => self.set_status(format!("reload failed: {err}"), NoticeLevel::Error),
            },

            KeyCode::Char('?') => self.mode = InputMode::Help,
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.mode = InputMode::Normal,
            KeyCode::Esc => {
                self.search_buf.clear();
                self.nav.set_search_query("");
                self.mode = InputMode::Normal;
            }
            KeyCode::Backspace => {
                self.search_buf.pop();
                self.nav.set_search_query(&self.search_buf);
            }
            KeyCode::Char(ch) => {
                self.search_buf.push(ch);
                self.nav.set_search_query(&self.search_buf);
            }
            _ => {}
        }
        self.keep_cursor_visible();
    }

    fn handle_inline_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.inline_event(InlineEvent::Enter),
            KeyCode::Esc => self.inline_event(InlineEvent::Escape),
            KeyCode::Backspace => self.nav.inline_backspace(),
            KeyCode::Char(ch) => self.nav.inline_input(ch),
            _ => {}
        }
    }

    fn inline_event(&mut self, event: InlineEvent) {
        // failures stay in the slot and are reported through notices
        if let Ok(Some(id)) = self.nav.inline_event(event) {
            self.set_status(format!("Created {id}"), NoticeLevel::Info);
        }
        if !self.nav.inline().is_open() {
            self.mode = InputMode::Normal;
        }
    }

    fn handle_menu_key(&mut self, key: KeyEvent) {
        // failures are reported through notices
        let _ = match key.code {
            KeyCode::Esc => Ok(self.nav.close_menu()),
            KeyCode::Char('j') | KeyCode::Down => {
                self.nav.menu_move(1);
                Ok(false)
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.nav.menu_move(-1);
                Ok(false)
            }
            KeyCode::Enter => self.nav.menu_activate(),
            KeyCode::Char(ch) => self.nav.menu_hotkey(ch),
            _ => Ok(false),
        };
        if !self.nav.menu().is_open() {
            self.mode = if self.nav.inline().is_open() {
                InputMode::Inline
            } else {
                InputMode::Normal
            };
        }
    }

    fn handle_move_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.nav.cancel_drag();
                self.move_cursor = None;
                self.mode = InputMode::Normal;
                self.set_status("Move cancelled", NoticeLevel::Info);
            }
            KeyCode::Char('j') | KeyCode::Down => self.step(1),
            KeyCode::Char('k') | KeyCode::Up => self.step(-1),
            KeyCode::Enter => self.drop_at_cursor(DropRelation::Inside),
            KeyCode::Char('<') => self.drop_at_cursor(DropRelation::Before),
            KeyCode::Char('>') => self.drop_at_cursor(DropRelation::After),
            _ => {}
        }
    }

    fn begin_move(&mut self) {
        let Some(id) = self.selected() else {
            return;
        };
        match self.nav.on_drag_start(std::slice::from_ref(&id)) {
            Ok(()) => {
                self.move_cursor = Some(id.clone());
                self.mode = InputMode::Move;
                self.set_status(
                    format!("Moving {id}: Enter inside, < before, > after, Esc cancel"),
                    NoticeLevel::Info,
                );
            }
            Err(err) => self.set_status(err.to_string(), NoticeLevel::Warn),
        }
    }

    fn drop_at_cursor(&mut self, relation: DropRelation) {
        let Some(target) = self.move_cursor.clone() else {
            return;
        };
        if !self.nav.on_drag_over(target.as_str(), relation) {
            self.set_status(
                format!("Cannot drop {relation} {target}"),
                NoticeLevel::Warn,
            );
            return;
        }
        self.finish_drag();
        self.move_cursor = None;
        self.mode = InputMode::Normal;
    }

    fn finish_drag(&mut self) {
        match self.nav.on_drag_end() {
            Ok(0) => self.set_status("Nothing moved", NoticeLevel::Info),
            Ok(n) => self.set_status(format!("Moved {n} page(s)"), NoticeLevel::Info),
            // reported through notices
            Err(_) => {}
        }
    }

    // -----------------------------------------------------------------------
    // Mouse
    // -----------------------------------------------------------------------

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let (x, y) = (mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(button) => self.on_mouse_down(button, x, y),
            MouseEventKind::Drag(MouseButton::Left) => self.on_mouse_drag(x, y),
            MouseEventKind::Up(MouseButton::Left) => {
                if self.press.take().is_some_and(|p| p.dragging) {
                    self.finish_drag();
                }
            }
            MouseEventKind::ScrollDown => self.step(1),
            MouseEventKind::ScrollUp => self.step(-1),
            _ => {}
        }
        self.drain_navigator();
    }

    fn on_mouse_down(&mut self, button: MouseButton, x: u16, y: u16) {
        match self.mode {
            InputMode::Menu => {
                // a click anywhere closes the menu; failures become notices
                let _ = self.nav.menu_click(x, y);
                if !self.nav.menu().is_open() {
                    self.mode = if self.nav.inline().is_open() {
                        InputMode::Inline
                    } else {
                        InputMode::Normal
                    };
                }
                return;
            }
            InputMode::Inline => self.inline_event(InlineEvent::Blur),
            InputMode::Popup | InputMode::Help => {
                self.popup = None;
                self.mode = InputMode::Normal;
                return;
            }
            InputMode::Normal | InputMode::Search | InputMode::Move => {}
        }
        if self.mode != InputMode::Normal {
            return;
        }

        let Some((_, row)) = self.row_at(x, y) else {
            return;
        };
        match button {
            MouseButton::Left => {
                self.nav.select(Some(row.id.as_str()));
                let marker_end = self.tree_area.x + text_width(&row.guides) + 1;
                if x < marker_end {
                    self.nav.toggle_expand(row.id.as_str());
                } else {
                    self.press = Some(Press {
                        id: row.id,
                        dragging: false,
                    });
                }
            }
            MouseButton::Right => {
                self.nav.select(Some(row.id.as_str()));
                self.open_menu_at(row.id, x, y);
            }
            MouseButton::Middle => {}
        }
    }

    fn on_mouse_drag(&mut self, x: u16, y: u16) {
        let Some(press) = self.press.as_mut() else {
            return;
        };
        if !press.dragging {
            let id = press.id.clone();
            if let Err(err) = self.nav.on_drag_start(std::slice::from_ref(&id)) {
                self.press = None;
                self.set_status(err.to_string(), NoticeLevel::Warn);
                return;
            }
            if let Some(press) = self.press.as_mut() {
                press.dragging = true;
            }
        }
        let Some((_, row)) = self.row_at(x, y) else {
            return;
        };
        // over the title: nest; over the guides: drop after as a sibling
        let title_x = self.tree_area.x + text_width(&row.guides) + 2;
        let relation = if x >= title_x {
            DropRelation::Inside
        } else {
            DropRelation::After
        };
        self.nav.on_drag_over(row.id.as_str(), relation);
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn selected(&self) -> Option<NodeId> {
        self.nav.store().selected_id().cloned()
    }

    /// Move the cursor by `delta` visible rows, clamped.
    fn step(&mut self, delta: isize) {
        let rows = self.rows();
        if rows.is_empty() {
            return;
        }
        let next = self
            .cursor_index(&rows)
            .map_or(0, |i| i.saturating_add_signed(delta).min(rows.len() - 1));
        self.set_cursor(Some(rows[next].id.clone()));
    }

    fn jump(&mut self, to_end: bool) {
        let rows = self.rows();
        let target = if to_end { rows.last() } else { rows.first() };
        self.set_cursor(target.map(|r| r.id.clone()));
    }

    fn set_cursor(&mut self, id: Option<NodeId>) {
        if self.mode == InputMode::Move {
            if let Some(id) = &id {
                // preview validity as the cursor moves
                self.nav.on_drag_over(id.as_str(), DropRelation::Inside);
            }
            self.move_cursor = id;
        } else {
            self.nav.select(id.as_ref().map(NodeId::as_str));
        }
    }

    fn collapse_or_parent(&mut self) {
        let Some(id) = self.selected() else {
            return;
        };
        if self.nav.store().is_expanded(id.as_str()) {
            self.nav.update(|s| s.collapse_node(id.as_str()));
            return;
        }
        let parent = self
            .nav
            .store()
            .tree()
            .get(id.as_str())
            .and_then(|n| n.parent_id.clone());
        if let Some(parent) = parent {
            self.nav.select(Some(parent.as_str()));
        }
    }

    /// After a filter change, move the selection onto a visible row.
    fn keep_cursor_visible(&mut self) {
        let rows = self.rows();
        if self.cursor_index(&rows).is_none() {
            self.nav.select(rows.first().map(|r| r.id.as_str()));
        }
    }

    fn row_at(&self, x: u16, y: u16) -> Option<(usize, RenderedRow)> {
        let area = self.tree_area;
        if x < area.x || y < area.y || x >= area.x + area.width || y >= area.y + area.height {
            return None;
        }
        let idx = self.scroll + usize::from(y - area.y);
        let row = self.rows().into_iter().nth(idx)?;
        Some((idx, row))
    }

    /// Screen cell just right of a row's title.
    fn row_anchor(&self, row: &RenderedRow, idx: usize) -> (u16, u16) {
        let offset = u16::try_from(idx.saturating_sub(self.scroll)).unwrap_or(u16::MAX);
        let title_end = text_width(&row.guides) + 2 + text_width(&row.title);
        (
            self.tree_area.x.saturating_add(title_end),
            self.tree_area.y.saturating_add(offset),
        )
    }

    fn open_menu_at(&mut self, id: NodeId, x: u16, y: u16) {
        self.nav.open_menu(id.as_str(), x, y, self.viewport);
        if self.nav.menu().is_open() {
            self.mode = InputMode::Menu;
        }
    }

    /// Fold queued navigator notices and events into view state.
    fn drain_navigator(&mut self) {
        for notice in self.nav.take_notices() {
            self.set_status(notice.message, notice.level);
        }
        for event in self.nav.take_events() {
            match event {
                NavEvent::OpenNode(id) => {
                    let title = self
                        .nav
                        .store()
                        .tree()
                        .get(id.as_str())
                        .map_or_else(String::new, |n| n.title.clone());
                    self.set_status(format!("Opened {id} \"{title}\""), NoticeLevel::Info);
                }
                NavEvent::ShowHistory { node_id, versions } => {
                    self.popup = Some(Popup::History { node_id, versions });
                    self.mode = InputMode::Popup;
                }
                NavEvent::ShowAccess { node_id, entries } => {
                    self.popup = Some(Popup::Access { node_id, entries });
                    self.mode = InputMode::Popup;
                }
                NavEvent::Exported(doc) => self.write_export(&doc),
            }
        }
    }

    fn write_export(&mut self, doc: &ExportDocument) {
        let pages: usize = doc.pages.iter().map(|p| p.page_count()).sum();
        let Some(dir) = &self.export_dir else {
            self.set_status(format!("Exported {pages} page(s)"), NoticeLevel::Info);
            return;
        };
        let name = doc
            .pages
            .first()
            .map_or_else(|| "space".to_string(), |p| p.id.to_string());
        let path = dir.join(format!("export-{name}.json"));
        let written = serde_json::to_string_pretty(doc)
            .map_err(anyhow::Error::from)
            .and_then(|body| std::fs::write(&path, body).map_err(anyhow::Error::from));
        match written {
            Ok(()) => self.set_status(
                format!("Exported {pages} page(s) to {}", path.display()),
                NoticeLevel::Info,
            ),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "export failed");
                self.set_status(format!("export failed: {err}"), NoticeLevel::Error);
            }
        }
    }
}

/// Display width in cells; guides and titles are treated as one cell per
/// char.
fn text_width(s: &str) -> u16 {
    u16::try_from(s.chars().count()).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;
    use pagetree_core::expansion::MemoryExpansionStore;
    use pagetree_core::model::TreeNode;
    use pagetree_core::port::MemoryPort;

    type TestApp = App<MemoryPort, MemoryExpansionStore>;

    /// Guide (root) -> Setup, Usage ; Setup -> Install
    fn port() -> MemoryPort {
        MemoryPort::default().with_nodes(vec![
            TreeNode::new("g", None, "Guide"),
            TreeNode::new("s", Some(NodeId::from("g")), "Setup").with_position(0),
            TreeNode::new("u", Some(NodeId::from("g")), "Usage").with_position(1),
            TreeNode::new("i", Some(NodeId::from("s")), "Install"),
        ])
    }

    fn app() -> TestApp {
        app_with(port())
    }

    fn app_with(port: MemoryPort) -> TestApp {
        let mut nav = Navigator::new(port, Some(MemoryExpansionStore::new()), "default");
        nav.mount().expect("mount");
        let mut app = App::new(nav, RenderConfig::default(), None);
        app.tree_area = Rect::new(1, 1, 60, 20);
        app
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: crossterm::event::KeyEventState::NONE,
        }
    }

    fn type_str(app: &mut TestApp, text: &str) {
        for ch in text.chars() {
            app.handle_key(key(KeyCode::Char(ch)));
        }
    }

    fn ids(app: &TestApp) -> Vec<String> {
        app.rows().into_iter().map(|r| r.id.to_string()).collect()
    }

    fn selected(app: &TestApp) -> Option<String> {
        app.navigator().store().selected_id().map(ToString::to_string)
    }

    #[test]
    fn starts_on_first_row_and_toggles_with_enter() {
        let mut app = app();
        assert_eq!(selected(&app).as_deref(), Some("g"));
        assert_eq!(ids(&app), ["g"]);
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(ids(&app), ["g", "s", "u"]);
        app.handle_key(key(KeyCode::Char('j')));
        assert_eq!(selected(&app).as_deref(), Some("s"));
    }

    #[test]
    fn h_collapses_then_moves_to_parent() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('E')));
        assert_eq!(ids(&app), ["g", "s", "i", "u"]);
        app.handle_key(key(KeyCode::Char('j')));
        app.handle_key(key(KeyCode::Char('h')));
        assert_eq!(ids(&app), ["g", "s", "u"]);
        app.handle_key(key(KeyCode::Char('h')));
        assert_eq!(selected(&app).as_deref(), Some("g"));
    }

    #[test]
    fn search_filters_live_and_escape_clears() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('/')));
        type_str(&mut app, "inst");
        assert_eq!(app.mode(), InputMode::Search);
        assert_eq!(ids(&app), ["g", "s", "i"]);
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.mode(), InputMode::Normal);
        // the ancestors opened for the hit stay open
        assert_eq!(ids(&app), ["g", "s", "i", "u"]);
    }

    #[test]
    fn inline_creation_selects_new_page() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('a')));
        assert_eq!(app.mode(), InputMode::Inline);
        type_str(&mut app, "FAQ");
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.mode(), InputMode::Normal);
        let sel = selected(&app).expect("selection");
        let node = app.navigator().store().tree().get(&sel).expect("node");
        assert_eq!(node.title, "FAQ");
        assert_eq!(node.parent_id.as_ref().map(NodeId::as_str), Some("g"));
        assert!(ids(&app).contains(&sel));
    }

    #[test]
    fn keyboard_move_reparents_page() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('*')));
        // select Usage and drop it inside Setup
        app.handle_key(key(KeyCode::Char('G')));
        assert_eq!(selected(&app).as_deref(), Some("u"));
        app.handle_key(key(KeyCode::Char('m')));
        assert_eq!(app.mode(), InputMode::Move);
        app.handle_key(key(KeyCode::Char('k')));
        app.handle_key(key(KeyCode::Char('k')));
        assert_eq!(app.cursor_id().map(NodeId::as_str), Some("s"));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.mode(), InputMode::Normal);
        let tree = app.navigator().store().tree();
        assert_eq!(tree.get("u").and_then(|n| n.parent_id.clone()), Some(NodeId::from("s")));
    }

    #[test]
    fn move_into_own_subtree_is_refused() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('*')));
        app.handle_key(key(KeyCode::Char('m')));
        app.handle_key(key(KeyCode::Char('j')));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.mode(), InputMode::Move);
        assert!(app.status().is_some_and(|(msg, _)| msg.contains("Cannot drop")));
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.mode(), InputMode::Normal);
        assert!(app.navigator().store().tree().get("g").is_some_and(|n| n.parent_id.is_none()));
    }

    #[test]
    fn menu_history_opens_popup() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('x')));
        assert_eq!(app.mode(), InputMode::Menu);
        app.handle_key(key(KeyCode::Char('h')));
        assert_eq!(app.mode(), InputMode::Popup);
        assert!(matches!(app.popup(), Some(Popup::History { .. })));
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.mode(), InputMode::Normal);
    }

    #[test]
    fn menu_add_child_switches_to_inline() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('x')));
        app.handle_key(key(KeyCode::Char('a')));
        assert_eq!(app.mode(), InputMode::Inline);
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.mode(), InputMode::Normal);
    }

    #[test]
    fn mouse_drag_drops_inside_row() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('*')));
        // rows: g(y=1) s(y=2) i(y=3) u(y=4)
        let mouse = |kind, column, row| MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        };
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 20, 4));
        app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), 20, 3));
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 20, 3));
        let tree = app.navigator().store().tree();
        assert_eq!(tree.get("u").and_then(|n| n.parent_id.clone()), Some(NodeId::from("i")));
        assert!(app.status().is_some_and(|(msg, _)| msg.contains("Moved 1")));
    }

    #[test]
    fn failed_create_keeps_inline_open_with_notice() {
        let mut port = port();
        port.set_fail_mutations(true);
        let mut app = app_with(port);
        app.handle_key(key(KeyCode::Char('A')));
        type_str(&mut app, "Nope");
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.mode(), InputMode::Inline);
        assert!(app.status().is_some_and(|(_, level)| level == NoticeLevel::Error));
    }
}
