//! Drawing the TUI from [`App`] state.

use pagetree_core::NoticeLevel;
use pagetree_core::expansion::ExpansionStore;
use pagetree_core::interaction::{DropRelation, MenuAction, Viewport};
use pagetree_core::model::Status;
use pagetree_core::port::PersistencePort;
use pagetree_core::render::{RenderedRow, status_badge};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use super::app::{App, InputMode, Popup};

fn status_color(status: Status) -> Color {
    match status {
        Status::Draft => Color::DarkGray,
        Status::InReview => Color::Yellow,
        Status::Approved => Color::Green,
        Status::Archived => Color::Red,
    }
}

const fn level_color(level: NoticeLevel) -> Color {
    match level {
        NoticeLevel::Info => Color::Green,
        NoticeLevel::Warn => Color::Yellow,
        NoticeLevel::Error => Color::Red,
    }
}

fn help_hotkeys() -> Vec<(&'static str, &'static str)> {
    vec![
        ("j/k", "move cursor"),
        ("g/G", "first / last row"),
        ("enter/space", "expand or collapse"),
        ("l/h", "expand / collapse or go to parent"),
        ("E/C", "expand / collapse subtree"),
        ("*/-", "expand / collapse everything"),
        ("/", "search titles"),
        ("esc", "clear search"),
        ("a", "new page under cursor"),
        ("A", "new root page"),
        ("x", "page menu (or right click)"),
        ("m", "move page: enter inside, < before, > after"),
        ("drag", "drop on a title to nest, on the guides to follow"),
        ("r", "reload"),
        ("?", "this help"),
        ("q", "quit"),
    ]
}

/// Draw the whole screen and record the geometry mouse handling needs.
pub fn draw<P: PersistencePort, E: ExpansionStore>(frame: &mut Frame<'_>, app: &mut App<P, E>) {
    let area = frame.area();
    app.viewport = Viewport {
        width: area.width,
        height: area.height,
    };

    let show_bar = app.mode() == InputMode::Search
        || app.mode() == InputMode::Inline
        || app.navigator().store().search().is_active();
    let bar_height = u16::from(show_bar);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(bar_height),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

    if show_bar {
        frame.render_widget(Paragraph::new(input_bar(app)), chunks[0]);
    }
    draw_tree(frame, app, chunks[1]);
    frame.render_widget(Paragraph::new(status_line(app)), chunks[2]);

    if let Some(menu) = app.navigator().menu().menu() {
        draw_menu(frame, menu, area);
    }
    match (app.mode(), app.popup()) {
        (InputMode::Help, _) => draw_help(frame, area),
        (InputMode::Popup, Some(popup)) => draw_popup(frame, popup, area),
        _ => {}
    }
}

fn input_bar<P: PersistencePort, E: ExpansionStore>(app: &App<P, E>) -> Line<'static> {
    let label = Style::default().fg(Color::DarkGray);
    if let Some(request) = app.navigator().inline().request() {
        let tree = app.navigator().store().tree();
        let parent = request
            .parent_id
            .as_ref()
            .and_then(|p| tree.get(p.as_str()))
            .map_or_else(|| "root".to_string(), |n| format!("\"{}\"", n.title));
        let mut spans = vec![
            Span::styled(format!("New page under {parent}: "), label),
            Span::styled(format!("{}▏", request.title), Style::default().fg(Color::White)),
        ];
        if request.submitting {
            spans.push(Span::styled("  saving…", label));
        }
        if let Some(error) = &request.error {
            spans.push(Span::styled(format!("  {error}"), Style::default().fg(Color::Red)));
        }
        return Line::from(spans);
    }

    let search = app.navigator().store().search();
    let cursor = if app.mode() == InputMode::Search { "▏" } else { "" };
    let query = if app.mode() == InputMode::Search {
        app.search_buf().to_string()
    } else {
        search.query.clone()
    };
    Line::from(vec![
        Span::styled("Search: ", label),
        Span::styled(format!("{query}{cursor}"), Style::default().fg(Color::White)),
        Span::styled(format!("  {} match(es)", search.match_ids.len()), label),
    ])
}

fn draw_tree<P: PersistencePort, E: ExpansionStore>(
    frame: &mut Frame<'_>,
    app: &mut App<P, E>,
    area: Rect,
) {
    let nav = app.navigator();
    let title = format!(
        " pagetree · {} · {} page(s) ",
        nav.space_id(),
        nav.store().tree().len()
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_set(border::ROUNDED)
        .border_style(Style::default().fg(Color::Green))
        .title(title)
        .title_style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = app.rows();
    let height = usize::from(inner.height);
    if let Some(cursor) = app.cursor_index(&rows) {
        if cursor < app.scroll {
            app.scroll = cursor;
        } else if height > 0 && cursor >= app.scroll + height {
            app.scroll = cursor + 1 - height;
        }
    }
    app.scroll = app.scroll.min(rows.len().saturating_sub(1));
    app.tree_area = inner;

    if rows.is_empty() {
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                "No pages yet. Press A to create one.",
                Style::default().fg(Color::DarkGray),
            ))),
            inner,
        );
        return;
    }

    let cursor = app.cursor_id().cloned();
    let drag = app.navigator().drag().session();
    let lines: Vec<Line<'static>> = rows
        .iter()
        .skip(app.scroll)
        .take(height)
        .map(|row| {
            let dragged = drag.is_some_and(|s| s.dragged_ids().contains(&row.id));
            let target = drag
                .and_then(|s| s.drop_target())
                .filter(|t| t.node_id == row.id);
            let mut line = row_line(row, dragged);
            if let Some(target) = target {
                let (text, color) = match (target.is_valid, target.relation) {
                    (false, _) => ("  ✗ cannot drop here".to_string(), Color::Red),
                    (true, DropRelation::Inside) => ("  ◂ drop inside".to_string(), Color::Green),
                    (true, relation) => (format!("  ◂ drop {relation}"), Color::Green),
                };
                line.spans.push(Span::styled(text, Style::default().fg(color)));
            }
            if cursor.as_ref() == Some(&row.id) {
                line = line.style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
            }
            line
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn row_line(row: &RenderedRow, dimmed: bool) -> Line<'static> {
    let base = if dimmed {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::White)
    };
    let mut spans = vec![
        Span::styled(row.guides.clone(), Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{} ", row.marker), Style::default().fg(Color::Cyan)),
    ];
    if let Some(icon) = &row.icon {
        spans.push(Span::raw(format!("{icon} ")));
    }
    spans.push(Span::styled(row.title.clone(), base));
    if let Some(status) = row.status {
        spans.push(Span::styled(
            format!(" [{}]", status_badge(status)),
            Style::default().fg(status_color(status)),
        ));
    }
    for label in &row.labels {
        spans.push(Span::styled(format!(" #{label}"), Style::default().fg(Color::Magenta)));
    }
    if row.unpublished {
        spans.push(Span::styled(" *", Style::default().fg(Color::Yellow)));
    }
    Line::from(spans)
}

fn status_line<P: PersistencePort, E: ExpansionStore>(app: &App<P, E>) -> Line<'static> {
    if let Some((message, level)) = app.status() {
        return Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(level_color(level)),
        ));
    }
    let hint = match app.mode() {
        InputMode::Normal => "j/k move  enter toggle  / search  a add  x menu  m move  ? help  q quit",
        InputMode::Search => "type to filter  enter keep  esc clear",
        InputMode::Inline => "enter create  esc cancel",
        InputMode::Menu => "j/k choose  enter run  esc close",
        InputMode::Move => "j/k target  enter inside  < before  > after  esc cancel",
        InputMode::Popup | InputMode::Help => "esc close",
    };
    Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray)))
}

fn draw_menu(frame: &mut Frame<'_>, menu: &pagetree_core::interaction::ContextMenu, area: Rect) {
    let rect = Rect::new(menu.rect.x, menu.rect.y, menu.rect.width, menu.rect.height)
        .intersection(area);
    frame.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_set(border::ROUNDED)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    let width = usize::from(inner.width);
    let lines: Vec<Line<'static>> = MenuAction::ALL
        .iter()
        .enumerate()
        .map(|(idx, action)| {
            let label = action.label();
            let pad = width.saturating_sub(label.chars().count() + 3);
            let text = format!(" {label}{:pad$}{} ", "", action.hotkey());
            let style = if idx == menu.highlighted {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else if *action == MenuAction::Delete {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(Span::styled(text, style))
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    )
}

fn popup_block(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_set(border::ROUNDED)
        .border_style(Style::default().fg(Color::Green))
        .title(title)
        .title_style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
}

fn draw_popup(frame: &mut Frame<'_>, popup: &Popup, area: Rect) {
    let (title, lines): (String, Vec<Line<'static>>) = match popup {
        Popup::History { node_id, versions } => {
            let mut lines: Vec<Line<'static>> = versions
                .iter()
                .map(|v| {
                    Line::from(vec![
                        Span::styled(format!("v{:<4}", v.version_number), Style::default().fg(Color::Cyan)),
                        Span::styled(
                            format!("{} {:<10} ", v.created_at.format("%Y-%m-%d %H:%M"), v.author),
                            Style::default().fg(Color::DarkGray),
                        ),
                        Span::raw(v.title.clone()),
                    ])
                })
                .collect();
            if lines.is_empty() {
                lines.push(Line::from("No versions recorded"));
            }
            (format!(" History · {node_id} "), lines)
        }
        Popup::Access { node_id, entries } => {
            let mut lines: Vec<Line<'static>> = entries
                .iter()
                .map(|e| {
                    Line::from(vec![
                        Span::styled(format!("{:<20}", e.user), Style::default().fg(Color::White)),
                        Span::styled(e.role.to_string(), Style::default().fg(Color::Cyan)),
                    ])
                })
                .collect();
            if lines.is_empty() {
                lines.push(Line::from("No access entries"));
            }
            (format!(" Access · {node_id} "), lines)
        }
    };
    let height = u16::try_from(lines.len() + 2).unwrap_or(u16::MAX);
    let rect = centered(area, area.width.saturating_sub(8).min(72), height);
    frame.render_widget(Clear, rect);
    let block = popup_block(title);
    let inner = block.inner(rect);
    frame.render_widget(block, rect);
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_help(frame: &mut Frame<'_>, area: Rect) {
    let keys = help_hotkeys();
    let lines: Vec<Line<'static>> = keys
        .into_iter()
        .map(|(key, desc)| {
            Line::from(vec![
                Span::styled(format!("{key:13}"), Style::default().fg(Color::Cyan)),
                Span::styled(desc, Style::default().fg(Color::White)),
            ])
        })
        .collect();
    let height = u16::try_from(lines.len() + 2).unwrap_or(u16::MAX);
    let rect = centered(area, area.width.saturating_sub(8).min(72), height);
    frame.render_widget(Clear, rect);
    let block = popup_block(" Hotkeys ".to_string());
    let inner = block.inner(rect);
    frame.render_widget(block, rect);
    frame.render_widget(Paragraph::new(lines), inner);
}
