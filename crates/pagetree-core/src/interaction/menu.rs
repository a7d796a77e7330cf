//! Per-node context menu: placement and lifecycle.
//!
//! Coordinates are terminal cells. The menu box flips to the left of / above
//! the anchor when it would overflow the viewport, then is clamped so it
//! always fits.

use std::fmt;

use serde::Serialize;

use crate::model::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuAction {
    Open,
    AddChild,
    Copy,
    Export,
    ViewHistory,
    Permissions,
    Delete,
}

impl MenuAction {
    pub const ALL: [Self; 7] = [
        Self::Open,
        Self::AddChild,
        Self::Copy,
        Self::Export,
        Self::ViewHistory,
        Self::Permissions,
        Self::Delete,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::AddChild => "Add child page",
            Self::Copy => "Copy",
            Self::Export => "Export",
            Self::ViewHistory => "Version history",
            Self::Permissions => "Permissions",
            Self::Delete => "Delete",
        }
    }

    /// Single-key accelerator shown next to the label.
    #[must_use]
    pub const fn hotkey(self) -> char {
        match self {
            Self::Open => 'o',
            Self::AddChild => 'a',
            Self::Copy => 'c',
            Self::Export => 'e',
            Self::ViewHistory => 'h',
            Self::Permissions => 'p',
            Self::Delete => 'd',
        }
    }
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Drawable area the menu must stay inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

/// Screen rectangle in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuRect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl MenuRect {
    #[must_use]
    pub fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.x
            && y >= self.y
            && u32::from(x) < u32::from(self.x) + u32::from(self.width)
            && u32::from(y) < u32::from(self.y) + u32::from(self.height)
    }
}

/// An open menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMenu {
    pub node_id: NodeId,
    pub rect: MenuRect,
    pub highlighted: usize,
}

impl ContextMenu {
    #[must_use]
    pub const fn actions(&self) -> &'static [MenuAction] {
        &MenuAction::ALL
    }

    #[must_use]
    pub fn highlighted_action(&self) -> MenuAction {
        MenuAction::ALL[self.highlighted.min(MenuAction::ALL.len() - 1)]
    }

    /// Action on the clicked row, if the click hit one. Rows sit inside a
    /// one-cell border.
    #[must_use]
    pub fn action_at(&self, x: u16, y: u16) -> Option<MenuAction> {
        if !self.rect.contains(x, y) {
            return None;
        }
        let row = y.checked_sub(self.rect.y.saturating_add(1))?;
        MenuAction::ALL.get(usize::from(row)).copied()
    }
}

/// Box size for the fixed action list: longest label plus hotkey column and
/// borders.
#[must_use]
pub fn menu_size() -> (u16, u16) {
    let longest = MenuAction::ALL
        .iter()
        .map(|a| a.label().chars().count())
        .max()
        .unwrap_or(0);
    let width = u16::try_from(longest + 8).unwrap_or(u16::MAX);
    let height = u16::try_from(MenuAction::ALL.len() + 2).unwrap_or(u16::MAX);
    (width, height)
}

/// Place a `width` x `height` box anchored at (`x`, `y`).
#[must_use]
pub fn place(anchor_x: u16, anchor_y: u16, width: u16, height: u16, viewport: Viewport) -> MenuRect {
    let axis = |anchor: u16, size: u16, limit: u16| -> u16 {
        let start = if u32::from(anchor) + u32::from(size) > u32::from(limit) {
            anchor.saturating_sub(size)
        } else {
            anchor
        };
        start.min(limit.saturating_sub(size))
    };
    MenuRect {
        x: axis(anchor_x, width, viewport.width),
        y: axis(anchor_y, height, viewport.height),
        width: width.min(viewport.width),
        height: height.min(viewport.height),
    }
}

/// Owner of the single open menu.
#[derive(Debug, Default)]
pub struct ContextMenuController {
    menu: Option<ContextMenu>,
}

impl ContextMenuController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn menu(&self) -> Option<&ContextMenu> {
        self.menu.as_ref()
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.menu.is_some()
    }

    /// Open a menu for `node_id` at the pointer, replacing any open menu.
    pub fn open(&mut self, node_id: NodeId, x: u16, y: u16, viewport: Viewport) {
        let (width, height) = menu_size();
        self.menu = Some(ContextMenu {
            node_id,
            rect: place(x, y, width, height, viewport),
            highlighted: 0,
        });
    }

    pub fn close(&mut self) {
        self.menu = None;
    }

    /// Pointer click. Inside a row: close and return the chosen action.
    /// Anywhere else: close.
    pub fn on_click(&mut self, x: u16, y: u16) -> Option<(NodeId, MenuAction)> {
        let menu = self.menu.take()?;
        menu.action_at(x, y).map(|action| (menu.node_id, action))
    }

    pub fn on_escape(&mut self) -> bool {
        self.menu.take().is_some()
    }

    pub fn move_highlight(&mut self, delta: isize) {
        if let Some(menu) = self.menu.as_mut() {
            let len = MenuAction::ALL.len();
            menu.highlighted = menu.highlighted.saturating_add_signed(delta).min(len - 1);
        }
    }

    /// Choose the highlighted action.
    pub fn activate(&mut self) -> Option<(NodeId, MenuAction)> {
        let menu = self.menu.take()?;
        let action = menu.highlighted_action();
        Some((menu.node_id, action))
    }

    /// Choose by hotkey; unknown keys leave the menu open.
    pub fn on_hotkey(&mut self, key: char) -> Option<(NodeId, MenuAction)> {
        let action = MenuAction::ALL.into_iter().find(|a| a.hotkey() == key)?;
        let menu = self.menu.take()?;
        Some((menu.node_id, action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEW: Viewport = Viewport {
        width: 80,
        height: 24,
    };

    #[test]
    fn opens_at_anchor_when_it_fits() {
        let rect = place(10, 5, 20, 9, VIEW);
        assert_eq!((rect.x, rect.y), (10, 5));
    }

    #[test]
    fn flips_left_and_up_on_overflow() {
        let rect = place(75, 20, 20, 9, VIEW);
        assert_eq!((rect.x, rect.y), (55, 11));
    }

    #[test]
    fn clamps_when_flip_is_not_enough() {
        let rect = place(5, 3, 20, 9, Viewport { width: 22, height: 10 });
        assert!(rect.x + rect.width <= 22);
        assert!(rect.y + rect.height <= 10);
    }

    #[test]
    fn never_exceeds_tiny_viewport() {
        let rect = place(3, 3, 20, 9, Viewport { width: 10, height: 4 });
        assert_eq!((rect.x, rect.y), (0, 0));
        assert_eq!((rect.width, rect.height), (10, 4));
    }

    #[test]
    fn click_on_row_selects_and_closes() {
        let mut ctl = ContextMenuController::new();
        ctl.open("pg-1".into(), 0, 0, VIEW);
        // row 0 is the border; actions start at row 1
        let picked = ctl.on_click(2, 2);
        assert_eq!(picked, Some(("pg-1".into(), MenuAction::AddChild)));
        assert!(!ctl.is_open());
    }

    #[test]
    fn outside_click_closes_without_action() {
        let mut ctl = ContextMenuController::new();
        ctl.open("pg-1".into(), 0, 0, VIEW);
        assert_eq!(ctl.on_click(70, 20), None);
        assert!(!ctl.is_open());
    }

    #[test]
    fn escape_closes() {
        let mut ctl = ContextMenuController::new();
        ctl.open("pg-1".into(), 4, 4, VIEW);
        assert!(ctl.on_escape());
        assert!(!ctl.on_escape());
    }

    #[test]
    fn keyboard_highlight_is_bounded() {
        let mut ctl = ContextMenuController::new();
        ctl.open("pg-1".into(), 0, 0, VIEW);
        ctl.move_highlight(-3);
        ctl.move_highlight(100);
        assert_eq!(ctl.activate(), Some(("pg-1".into(), MenuAction::Delete)));
    }

    #[test]
    fn hotkey_selects_action() {
        let mut ctl = ContextMenuController::new();
        ctl.open("pg-1".into(), 0, 0, VIEW);
        assert_eq!(ctl.on_hotkey('z'), None);
        assert!(ctl.is_open());
        assert_eq!(ctl.on_hotkey('h'), Some(("pg-1".into(), MenuAction::ViewHistory)));
    }

    #[test]
    fn reopening_replaces_menu() {
        let mut ctl = ContextMenuController::new();
        ctl.open("pg-1".into(), 0, 0, VIEW);
        ctl.open("pg-2".into(), 1, 1, VIEW);
        assert_eq!(ctl.menu().map(|m| m.node_id.as_str()), Some("pg-2"));
    }
}
