//! The single command path of a page-tree session.
//!
//! [`Navigator`] owns the [`TreeStore`], the gesture state machines and the
//! two ports. Every mutation goes through a `&mut self` method, so a caller
//! never observes half-applied state. Structural changes are sent to the
//! [`PersistencePort`] and then resolved by a full refetch; the store is
//! never reordered optimistically.
//!
//! Failures are returned to the caller and also queued as [`Notice`]s for
//! views that only poll.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::error::ErrorCode;
use crate::expansion::{ExpansionStore, expansion_key};
use crate::export::{ExportDocument, export_document};
use crate::interaction::{
    ContextMenuController, DragCoordinator, DragError, DropRelation, InlineCreator, InlineEvent,
    InlineOutcome, MenuAction, Viewport,
};
use crate::model::{AccessEntry, AccessRole, NodeId, NodePatch, TreeNode, Version};
use crate::port::{PersistencePort, PortError};
use crate::tree::{TreeError, TreeStore};

/// Anything a navigator command can fail with.
#[derive(Debug, thiserror::Error)]
pub enum NavError {
    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Drag(#[from] DragError),
}

impl NavError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Port(err) => err.code(),
            Self::Tree(err) => err.code(),
            Self::Drag(err) => err.code(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

/// A message for the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub code: Option<ErrorCode>,
    pub message: String,
}

impl Notice {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            code: None,
            message: message.into(),
        }
    }

    fn error(err: &NavError, action: &str) -> Self {
        Self {
            level: NoticeLevel::Error,
            code: Some(err.code()),
            message: format!("{action} failed: {err}"),
        }
    }
}

/// Requests for the host view that the navigator cannot fulfil itself.
#[derive(Debug, Clone)]
pub enum NavEvent {
    OpenNode(NodeId),
    ShowHistory {
        node_id: NodeId,
        versions: Vec<Version>,
    },
    ShowAccess {
        node_id: NodeId,
        entries: Vec<AccessEntry>,
    },
    Exported(Box<ExportDocument>),
}

pub struct Navigator<P, E> {
    space_id: String,
    port: P,
    expansion: Option<E>,
    expansion_key: String,
    saved_revision: u64,
    mounted: bool,
    store: TreeStore,
    drag: DragCoordinator,
    inline: InlineCreator,
    menu: ContextMenuController,
    notices: VecDeque<Notice>,
    events: VecDeque<NavEvent>,
}

impl<P: PersistencePort, E: ExpansionStore> Navigator<P, E> {
    /// `expansion` is `None` when expansion persistence is disabled.
    pub fn new(port: P, expansion: Option<E>, space_id: impl Into<String>) -> Self {
        let space_id = space_id.into();
        Self {
            expansion_key: expansion_key(&space_id),
            space_id,
            port,
            expansion,
            saved_revision: 0,
            mounted: false,
            store: TreeStore::new(),
            drag: DragCoordinator::new(),
            inline: InlineCreator::new(),
            menu: ContextMenuController::new(),
            notices: VecDeque::new(),
            events: VecDeque::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn space_id(&self) -> &str {
        &self.space_id
    }

    #[must_use]
    pub const fn store(&self) -> &TreeStore {
        &self.store
    }

    #[must_use]
    pub const fn port(&self) -> &P {
        &self.port
    }

    #[must_use]
    pub const fn drag(&self) -> &DragCoordinator {
        &self.drag
    }

    #[must_use]
    pub const fn inline(&self) -> &InlineCreator {
        &self.inline
    }

    #[must_use]
    pub const fn menu(&self) -> &ContextMenuController {
        &self.menu
    }

    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub fn take_events(&mut self) -> Vec<NavEvent> {
        self.events.drain(..).collect()
    }

    /// Give back the ports, e.g. to inspect them after a session.
    pub fn into_parts(self) -> (P, Option<E>) {
        (self.port, self.expansion)
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// First fetch, then restore persisted expansion against the loaded
    /// tree. Restoring does not count as a change to save.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the store stays empty.
    pub fn mount(&mut self) -> Result<(), NavError> {
        let nodes = self.port.fetch_tree(&self.space_id).map_err(NavError::from)?;
        self.store.load_nodes(nodes);

        if let Some(store) = self.expansion.as_ref() {
            match store.load(&self.expansion_key) {
                Ok(Some(ids)) => {
                    self.store.restore_expanded(ids);
                }
                Ok(None) => {}
                Err(err) => warn!(key = %self.expansion_key, error = %err, "expansion state unreadable"),
            }
        }
        self.saved_revision = self.store.expansion_revision();
        self.mounted = true;
        info!(space = %self.space_id, nodes = self.store.tree().len(), "navigator mounted");
        Ok(())
    }

    /// Refetch the whole tree. Last refetch wins.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the store is left as it was.
    pub fn refresh(&mut self) -> Result<(), NavError> {
        let nodes = self.port.fetch_tree(&self.space_id).map_err(NavError::from)?;
        self.store.load_nodes(nodes);
        self.sync_expansion();
        Ok(())
    }

    /// Run a local store command, then persist expansion if it changed.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut TreeStore) -> R) -> R {
        let result = f(&mut self.store);
        self.sync_expansion();
        result
    }

    pub fn toggle_expand(&mut self, id: &str) -> bool {
        self.update(|store| store.toggle_expand(id))
    }

    pub fn select(&mut self, id: Option<&str>) {
        self.store.set_selected(id);
        self.store.set_focused(id);
    }

    pub fn set_search_query(&mut self, query: &str) {
        self.update(|store| store.set_search_query(query));
    }

    /// Fire-and-forget write of the expansion set. A failed write is logged
    /// and not retried; the next change writes the full set again.
    fn sync_expansion(&mut self) {
        let revision = self.store.expansion_revision();
        if !self.mounted || revision == self.saved_revision {
            return;
        }
        self.saved_revision = revision;
        let Some(store) = self.expansion.as_mut() else {
            return;
        };
        let mut ids: Vec<NodeId> = self.store.expanded_ids().iter().cloned().collect();
        ids.sort();
        if let Err(err) = store.save(&self.expansion_key, &ids) {
            warn!(key = %self.expansion_key, error = %err, "failed to persist expansion state");
        }
    }

    // -----------------------------------------------------------------------
    // Structural commands
    // -----------------------------------------------------------------------

    /// Create a page at the end of `parent_id`'s children.
    ///
    /// # Errors
    ///
    /// Port failures; nothing changes locally.
    pub fn create_page(&mut self, parent_id: Option<&str>, title: &str) -> Result<TreeNode, NavError> {
        let created = self.port.create_node(&self.space_id, parent_id, title);
        let node = self.report(created, "create")?;
        self.after_create(&node);
        Ok(node)
    }

    /// Move one page. The local tree pre-validates so obvious cycles never
    /// reach the port.
    ///
    /// # Errors
    ///
    /// [`TreeError`] for unknown ids or cycles, or the port failure.
    pub fn move_page(&mut self, id: &str, new_parent: Option<&str>, new_position: i64) -> Result<bool, NavError> {
        if let Err(err) = self.store.validate_move(id, new_parent) {
            return Err(self.fail(err.into(), "move"));
        }
        let moved = self.port.move_node(id, new_parent, new_position);
        let moved = self.report(moved, "move")?;
        self.refresh_or_notice();
        Ok(moved)
    }

    /// Delete a page and its subtree.
    ///
    /// # Errors
    ///
    /// Port failures; the store is unchanged.
    pub fn delete_page(&mut self, id: &str) -> Result<bool, NavError> {
        let deleted = self.port.delete_node(id);
        let deleted = self.report(deleted, "delete")?;
        if deleted {
            self.notices.push_back(Notice::info(format!("deleted {id}")));
        }
        self.refresh_or_notice();
        Ok(deleted)
    }

    /// # Errors
    ///
    /// Port failures; the store is unchanged.
    pub fn copy_page(&mut self, id: &str) -> Result<TreeNode, NavError> {
        let copied = self.port.copy_node(id);
        let copy = self.report(copied, "copy")?;
        self.refresh_or_notice();
        self.store.set_selected(Some(copy.id.as_str()));
        self.notices.push_back(Notice::info(format!("copied {id} to {}", copy.id)));
        Ok(copy)
    }

    /// Rename in place. Titles do not affect structure, so the store is
    /// patched instead of refetched.
    ///
    /// # Errors
    ///
    /// Port failures; the store is unchanged.
    pub fn rename_page(&mut self, id: &str, title: &str) -> Result<TreeNode, NavError> {
        let renamed = self.port.rename_node(id, title);
        let node = self.report(renamed, "rename")?;
        let patch = NodePatch {
            title: Some(node.title.clone()),
            ..NodePatch::default()
        };
        self.store.update_node(id, &patch);
        Ok(node)
    }

    /// # Errors
    ///
    /// Port failures.
    pub fn version_history(&mut self, id: &str) -> Result<Vec<Version>, NavError> {
        let history = self.port.fetch_version_history(id);
        self.report(history, "history")
    }

    /// # Errors
    ///
    /// Port failures; the store is unchanged.
    pub fn restore_version(&mut self, id: &str, version_id: &str) -> Result<bool, NavError> {
        let restored = self.port.restore_version(id, version_id);
        let restored = self.report(restored, "restore")?;
        self.refresh_or_notice();
        Ok(restored)
    }

    /// # Errors
    ///
    /// Port failures.
    pub fn access_list(&mut self, id: &str) -> Result<Vec<AccessEntry>, NavError> {
        let entries = self.port.fetch_access_list(id);
        self.report(entries, "access list")
    }

    /// # Errors
    ///
    /// Port failures, including the last-owner rule.
    pub fn grant_access(&mut self, id: &str, user: &str, role: AccessRole) -> Result<AccessEntry, NavError> {
        let granted = self.port.grant_access(id, user, role);
        self.report(granted, "grant")
    }

    /// # Errors
    ///
    /// Port failures, including the last-owner rule.
    pub fn update_access_role(&mut self, id: &str, user: &str, role: AccessRole) -> Result<bool, NavError> {
        let updated = self.port.update_access_role(id, user, role);
        self.report(updated, "update access")
    }

    /// # Errors
    ///
    /// Port failures, including the last-owner rule.
    pub fn revoke_access(&mut self, id: &str, user: &str) -> Result<bool, NavError> {
        let revoked = self.port.revoke_access(id, user);
        self.report(revoked, "revoke")
    }

    // -----------------------------------------------------------------------
    // Drag and drop
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// Empty or unknown selections, or a session already in progress.
    pub fn on_drag_start(&mut self, ids: &[NodeId]) -> Result<(), NavError> {
        self.drag.start_drag(self.store.tree(), ids)?;
        Ok(())
    }

    /// Returns whether dropping on `candidate` would be accepted. Cycle
    /// rejections are silent.
    pub fn on_drag_over(&mut self, candidate: &str, relation: DropRelation) -> bool {
        self.drag.update_drop_target(self.store.tree(), candidate, relation)
    }

    /// Escape: drop the session locally.
    pub fn cancel_drag(&mut self) {
        self.drag.end_drag();
    }

    /// Drop. Sends one move per dragged subtree root, then refetches.
    /// Returns the number of accepted moves; an absent or invalid target
    /// moves nothing. The session ends either way.
    ///
    /// # Errors
    ///
    /// No active session, or the first port failure. Moves already sent
    /// before a failure are kept and reflected by the refetch.
    pub fn on_drag_end(&mut self) -> Result<usize, NavError> {
        let requests = self.drag.commit_drag(self.store.tree());
        self.drag.end_drag();
        let requests = requests?;
        if requests.is_empty() {
            return Ok(0);
        }

        let mut moved = 0;
        let mut failure = None;
        for request in &requests {
            debug!(node_id = %request.node_id, parent = ?request.new_parent_id, position = request.new_position, "drop move");
            match self.port.move_node(
                request.node_id.as_str(),
                request.new_parent_id.as_ref().map(NodeId::as_str),
                request.new_position,
            ) {
                Ok(true) => moved += 1,
                Ok(false) => {}
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        if moved > 0 {
            self.refresh_or_notice();
        }
        match failure {
            Some(err) => Err(self.fail(err.into(), "move")),
            None => Ok(moved),
        }
    }

    // -----------------------------------------------------------------------
    // Inline creation
    // -----------------------------------------------------------------------

    pub fn open_inline(&mut self, parent_id: Option<&str>) {
        self.inline.open(parent_id.map(NodeId::from));
    }

    pub fn inline_input(&mut self, ch: char) {
        self.inline.push_char(ch);
    }

    pub fn inline_backspace(&mut self) {
        self.inline.pop_char();
    }

    pub fn inline_set_title(&mut self, title: &str) {
        self.inline.set_title(title);
    }

    /// Feed Enter, blur or Escape. Returns the created id on a successful
    /// submit.
    ///
    /// # Errors
    ///
    /// The port failure; the slot stays open with the error recorded.
    pub fn inline_event(&mut self, event: InlineEvent) -> Result<Option<NodeId>, NavError> {
        let InlineOutcome::Submit { parent_id, title } = self.inline.handle(event) else {
            return Ok(None);
        };
        let parent = parent_id.as_ref().map(NodeId::as_str);
        match self.port.create_node(&self.space_id, parent, &title) {
            Ok(node) => {
                self.inline.finish_success();
                self.after_create(&node);
                Ok(Some(node.id))
            }
            Err(err) => {
                self.inline.finish_failure(err.to_string());
                Err(self.fail(err.into(), "create"))
            }
        }
    }

    fn after_create(&mut self, node: &TreeNode) {
        if let Err(err) = self.refresh() {
            self.fail(err, "refresh");
            if self.store.add_node(node.clone()).is_err() {
                warn!(node_id = %node.id, "created node could not be shown until the next refresh");
            }
        }
        if let Some(parent) = &node.parent_id {
            self.store.expand_node(parent.as_str());
        }
        self.select(Some(node.id.as_str()));
        self.sync_expansion();
        self.events.push_back(NavEvent::OpenNode(node.id.clone()));
    }

    // -----------------------------------------------------------------------
    // Context menu
    // -----------------------------------------------------------------------

    pub fn open_menu(&mut self, node_id: &str, x: u16, y: u16, viewport: Viewport) {
        if self.store.tree().contains(node_id) {
            self.menu.open(NodeId::from(node_id), x, y, viewport);
        }
    }

    pub fn close_menu(&mut self) -> bool {
        self.menu.on_escape()
    }

    pub fn menu_move(&mut self, delta: isize) {
        self.menu.move_highlight(delta);
    }

    /// Click while a menu is open. Returns whether an action ran.
    ///
    /// # Errors
    ///
    /// The dispatched action's failure.
    pub fn menu_click(&mut self, x: u16, y: u16) -> Result<bool, NavError> {
        match self.menu.on_click(x, y) {
            Some((id, action)) => self.dispatch(&id, action).map(|()| true),
            None => Ok(false),
        }
    }

    /// # Errors
    ///
    /// The dispatched action's failure.
    pub fn menu_activate(&mut self) -> Result<bool, NavError> {
        match self.menu.activate() {
            Some((id, action)) => self.dispatch(&id, action).map(|()| true),
            None => Ok(false),
        }
    }

    /// # Errors
    ///
    /// The dispatched action's failure.
    pub fn menu_hotkey(&mut self, key: char) -> Result<bool, NavError> {
        match self.menu.on_hotkey(key) {
            Some((id, action)) => self.dispatch(&id, action).map(|()| true),
            None => Ok(false),
        }
    }

    /// Run a menu action. The menu is closed before anything is sent.
    ///
    /// # Errors
    ///
    /// The action's port failure, also queued as a notice.
    pub fn dispatch(&mut self, id: &str, action: MenuAction) -> Result<(), NavError> {
        self.menu.close();
        debug!(node_id = id, %action, "menu action");
        match action {
            MenuAction::Open => {
                self.select(Some(id));
                self.events.push_back(NavEvent::OpenNode(NodeId::from(id)));
            }
            MenuAction::AddChild => self.open_inline(Some(id)),
            MenuAction::Copy => {
                self.copy_page(id)?;
            }
            MenuAction::Export => {
                if !self.store.tree().contains(id) {
                    return Err(self.fail(TreeError::NodeNotFound(NodeId::from(id)).into(), "export"));
                }
                let doc = export_document(self.store.tree(), &self.space_id, Some(id));
                self.events.push_back(NavEvent::Exported(Box::new(doc)));
            }
            MenuAction::ViewHistory => {
                let versions = self.version_history(id)?;
                self.events.push_back(NavEvent::ShowHistory {
                    node_id: NodeId::from(id),
                    versions,
                });
            }
            MenuAction::Permissions => {
                let entries = self.access_list(id)?;
                self.events.push_back(NavEvent::ShowAccess {
                    node_id: NodeId::from(id),
                    entries,
                });
            }
            MenuAction::Delete => {
                self.delete_page(id)?;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn report<T>(&mut self, result: Result<T, PortError>, action: &str) -> Result<T, NavError> {
        result.map_err(|err| self.fail(err.into(), action))
    }

    fn fail(&mut self, err: NavError, action: &str) -> NavError {
        warn!(action, code = %err.code(), error = %err, "command failed");
        self.notices.push_back(Notice::error(&err, action));
        err
    }

    fn refresh_or_notice(&mut self) {
        if let Err(err) = self.refresh() {
            self.fail(err, "refresh");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expansion::MemoryExpansionStore;
    use crate::port::MemoryPort;

    type Nav = Navigator<MemoryPort, MemoryExpansionStore>;

    /// A(root) -> B, C ; B -> D
    fn port() -> MemoryPort {
        MemoryPort::default().with_nodes(vec![
            TreeNode::new("a", None, "Alpha"),
            TreeNode::new("b", Some("a".into()), "Beta").with_position(0),
            TreeNode::new("c", Some("a".into()), "Gamma").with_position(1),
            TreeNode::new("d", Some("b".into()), "Delta").with_position(0),
        ])
    }

    fn mounted() -> Nav {
        let mut nav = Navigator::new(port(), Some(MemoryExpansionStore::new()), "default");
        nav.mount().expect("mount");
        nav
    }

    fn visible(nav: &Nav) -> Vec<String> {
        nav.store()
            .visible_nodes()
            .into_iter()
            .map(|row| row.id.to_string())
            .collect()
    }

    #[test]
    fn mount_restores_persisted_expansion_without_rewriting_it() {
        let mut expansion = MemoryExpansionStore::new();
        expansion
            .save(&expansion_key("default"), &[NodeId::from("a"), NodeId::from("c"), NodeId::from("gone")])
            .expect("seed");
        let mut nav = Navigator::new(port(), Some(expansion), "default");
        nav.mount().expect("mount");

        assert_eq!(visible(&nav), vec!["a", "b", "c"]);
        let (_, expansion) = nav.into_parts();
        assert_eq!(expansion.expect("store").writes(), 1);
    }

    #[test]
    fn expansion_changes_are_saved() {
        let mut nav = mounted();
        nav.toggle_expand("a");
        nav.toggle_expand("b");
        let (_, expansion) = nav.into_parts();
        let expansion = expansion.expect("store");
        assert_eq!(expansion.writes(), 2);
        assert_eq!(
            expansion.get(&expansion_key("default")),
            Some(&[NodeId::from("a"), NodeId::from("b")][..])
        );
    }

    #[test]
    fn failed_expansion_write_is_not_fatal_or_retried() {
        let mut expansion = MemoryExpansionStore::new();
        expansion.set_fail_writes(true);
        let mut nav = Navigator::new(port(), Some(expansion), "default");
        nav.mount().expect("mount");

        assert!(nav.toggle_expand("a"));
        assert!(nav.store().is_expanded("a"));
        nav.select(Some("b"));
        let (_, expansion) = nav.into_parts();
        assert_eq!(expansion.expect("store").writes(), 1);
    }

    #[test]
    fn inline_submit_creates_expands_selects_and_opens() {
        let mut nav = mounted();
        nav.open_inline(Some("c"));
        nav.inline_set_title("  New page ");
        let id = nav
            .inline_event(InlineEvent::Enter)
            .expect("create")
            .expect("submitted");

        assert!(!nav.inline().is_open());
        assert!(nav.store().is_expanded("c"));
        assert_eq!(nav.store().selected_id(), Some(&id));
        assert_eq!(nav.store().tree().get(id.as_str()).map(|n| n.title.as_str()), Some("New page"));
        assert!(matches!(nav.take_events().as_slice(), [NavEvent::OpenNode(opened)] if *opened == id));
    }

    #[test]
    fn inline_failure_keeps_slot_and_reports() {
        let mut nav = mounted();
        nav.port.set_fail_mutations(true);
        nav.open_inline(None);
        nav.inline_set_title("Draft");

        let err = nav.inline_event(InlineEvent::Enter).expect_err("should fail");
        assert_eq!(err.code(), ErrorCode::StorageFailure);
        let slot = nav.inline().request().expect("slot kept");
        assert!(!slot.submitting);
        assert!(slot.error.is_some());
        assert_eq!(slot.title, "Draft");
        assert_eq!(nav.take_notices().len(), 1);
        assert_eq!(nav.store().tree().len(), 4);
    }

    #[test]
    fn escape_and_empty_blur_never_reach_the_port() {
        let mut nav = mounted();
        nav.open_inline(None);
        nav.inline_set_title("ignored");
        assert_eq!(nav.inline_event(InlineEvent::Escape).expect("escape"), None);

        nav.open_inline(None);
        assert_eq!(nav.inline_event(InlineEvent::Blur).expect("blur"), None);
        assert!(nav.port().mutations().is_empty());
    }

    #[test]
    fn drop_inside_moves_then_refetches() {
        let mut nav = mounted();
        let fetches = nav.port().fetch_count();
        nav.on_drag_start(&[NodeId::from("c")]).expect("start");
        assert!(nav.on_drag_over("b", DropRelation::Inside));
        assert_eq!(nav.on_drag_end().expect("drop"), 1);

        assert!(!nav.drag().is_active());
        assert_eq!(nav.port().fetch_count(), fetches + 1);
        let c = nav.store().tree().get("c").expect("c");
        assert_eq!(c.parent_id.as_ref().map(NodeId::as_str), Some("b"));
    }

    #[test]
    fn drop_on_descendant_is_silent_and_moves_nothing() {
        let mut nav = mounted();
        nav.on_drag_start(&[NodeId::from("a")]).expect("start");
        assert!(!nav.on_drag_over("d", DropRelation::Inside));
        assert_eq!(nav.on_drag_end().expect("drop"), 0);
        assert!(nav.port().mutations().is_empty());
        assert!(nav.take_notices().is_empty());
    }

    #[test]
    fn create_with_failed_refetch_still_shows_page_and_reports() {
        let mut nav = mounted();
        nav.port.set_fail_fetch(true);
        let node = nav.create_page(Some("a"), "Offline").expect("create");

        assert!(nav.store().tree().contains(node.id.as_str()));
        assert_eq!(nav.store().selected_id(), Some(&node.id));
        let notices = nav.take_notices();
        assert!(
            notices
                .iter()
                .any(|n| n.level == NoticeLevel::Error && n.message.starts_with("refresh failed"))
        );
    }

    #[test]
    fn failed_drop_leaves_store_unchanged() {
        let mut nav = mounted();
        nav.port.set_fail_mutations(true);
        nav.on_drag_start(&[NodeId::from("d")]).expect("start");
        nav.on_drag_over("c", DropRelation::Inside);
        assert!(nav.on_drag_end().is_err());

        let d = nav.store().tree().get("d").expect("d");
        assert_eq!(d.parent_id.as_ref().map(NodeId::as_str), Some("b"));
        assert!(!nav.drag().is_active());
        assert_eq!(nav.take_notices()[0].level, NoticeLevel::Error);
    }

    #[test]
    fn move_page_prevalidates_cycles() {
        let mut nav = mounted();
        let err = nav.move_page("a", Some("d"), 0).expect_err("cycle");
        assert_eq!(err.code(), ErrorCode::CycleDetected);
        assert!(nav.port().mutations().is_empty());
    }

    #[test]
    fn delete_via_menu_closes_menu_and_cascades() {
        let mut nav = mounted();
        nav.select(Some("d"));
        nav.open_menu("b", 2, 2, Viewport { width: 80, height: 24 });
        assert!(nav.menu().is_open());
        assert!(nav.menu_hotkey('d').expect("delete"));

        assert!(!nav.menu().is_open());
        assert!(!nav.store().tree().contains("b"));
        assert!(!nav.store().tree().contains("d"));
        assert_eq!(nav.store().selected_id(), None);
    }

    #[test]
    fn failed_menu_action_still_closes_menu() {
        let mut nav = mounted();
        nav.port.set_fail_mutations(true);
        nav.open_menu("b", 2, 2, Viewport { width: 80, height: 24 });
        assert!(nav.menu_hotkey('c').is_err());
        assert!(!nav.menu().is_open());
        assert_eq!(nav.take_notices().len(), 1);
    }

    #[test]
    fn history_and_export_emit_events() {
        let mut nav = mounted();
        nav.rename_page("c", "Gamma 2").expect("rename");
        nav.dispatch("c", MenuAction::ViewHistory).expect("history");
        nav.dispatch("a", MenuAction::Export).expect("export");

        let events = nav.take_events();
        assert!(matches!(&events[0], NavEvent::ShowHistory { versions, .. } if !versions.is_empty()));
        assert!(matches!(&events[1], NavEvent::Exported(doc) if doc.pages[0].page_count() == 4));
        assert_eq!(nav.store().tree().get("c").map(|n| n.title.as_str()), Some("Gamma 2"));
    }

    #[test]
    fn add_child_action_opens_inline_slot() {
        let mut nav = mounted();
        nav.dispatch("b", MenuAction::AddChild).expect("add child");
        let slot = nav.inline().request().expect("slot");
        assert_eq!(slot.parent_id.as_ref().map(NodeId::as_str), Some("b"));
    }

    #[test]
    fn mount_failure_is_reported() {
        let mut failing = port();
        failing.set_fail_fetch(true);
        let mut nav: Nav = Navigator::new(failing, None, "default");
        assert!(nav.mount().is_err());
        assert!(!nav.is_mounted());
        assert!(nav.store().tree().is_empty());
    }
}
