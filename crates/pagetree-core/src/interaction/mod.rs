//! Gesture state machines: drag-and-drop, inline creation, context menu.
//!
//! None of these touch the persistence port directly. They hold local
//! state and tell the [`crate::navigator::Navigator`] what to send.

pub mod drag;
pub mod inline;
pub mod menu;

pub use drag::{DragCoordinator, DragError, DragSession, DropRelation, DropTarget, MoveRequest};
pub use inline::{InlineCreationRequest, InlineCreator, InlineEvent, InlineOutcome};
pub use menu::{ContextMenu, ContextMenuController, MenuAction, MenuRect, Viewport};
