//! Inline title entry for new pages.
//!
//! One slot for the whole navigator. Enter and a non-empty blur both end up
//! in [`InlineCreator::begin_submit`], which refuses to fire twice while a
//! request is in flight.

use crate::model::NodeId;

/// The pending creation: where the node goes and what it is called.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineCreationRequest {
    /// `None` creates a root page.
    pub parent_id: Option<NodeId>,
    pub title: String,
    pub submitting: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineEvent {
    Enter,
    Blur,
    Escape,
}

/// What the caller should do after an [`InlineEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineOutcome {
    /// Call the port's `create_node` with these arguments, then report back
    /// with [`InlineCreator::finish_success`] or
    /// [`InlineCreator::finish_failure`].
    Submit {
        parent_id: Option<NodeId>,
        title: String,
    },
    /// The slot was closed without creating anything.
    Cancelled,
    /// Nothing happened (no slot, empty Enter, or already submitting).
    Ignored,
}

#[derive(Debug, Default)]
pub struct InlineCreator {
    slot: Option<InlineCreationRequest>,
}

impl InlineCreator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn request(&self) -> Option<&InlineCreationRequest> {
        self.slot.as_ref()
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.slot.is_some()
    }

    /// Open a slot under `parent_id`, replacing any existing one.
    pub fn open(&mut self, parent_id: Option<NodeId>) {
        if let Some(previous) = &self.slot {
            tracing::debug!(parent = ?previous.parent_id, "replacing inline creation slot");
        }
        self.slot = Some(InlineCreationRequest {
            parent_id,
            ..InlineCreationRequest::default()
        });
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        if let Some(slot) = self.editable() {
            slot.title = title.into();
        }
    }

    pub fn push_char(&mut self, ch: char) {
        if let Some(slot) = self.editable() {
            slot.title.push(ch);
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(slot) = self.editable() {
            slot.title.pop();
        }
    }

    /// Feed a commit/cancel event into the state machine.
    pub fn handle(&mut self, event: InlineEvent) -> InlineOutcome {
        let Some(slot) = self.slot.as_ref() else {
            return InlineOutcome::Ignored;
        };
        let empty = slot.title.trim().is_empty();
        match event {
            InlineEvent::Escape => self.cancel(),
            InlineEvent::Blur if empty => self.cancel(),
            InlineEvent::Enter if empty => InlineOutcome::Ignored,
            InlineEvent::Enter | InlineEvent::Blur => self.begin_submit(),
        }
    }

    /// Shared submit path for Enter and blur.
    pub fn begin_submit(&mut self) -> InlineOutcome {
        let Some(slot) = self.slot.as_mut() else {
            return InlineOutcome::Ignored;
        };
        if slot.submitting {
            return InlineOutcome::Ignored;
        }
        let title = slot.title.trim().to_string();
        if title.is_empty() {
            return InlineOutcome::Ignored;
        }
        slot.submitting = true;
        slot.error = None;
        InlineOutcome::Submit {
            parent_id: slot.parent_id.clone(),
            title,
        }
    }

    /// The port created the node; close the slot.
    pub fn finish_success(&mut self) -> Option<InlineCreationRequest> {
        self.slot.take()
    }

    /// The port failed; keep the slot open for a retry.
    pub fn finish_failure(&mut self, error: impl Into<String>) {
        if let Some(slot) = self.slot.as_mut() {
            slot.submitting = false;
            slot.error = Some(error.into());
        }
    }

    /// Close the slot without a port call. Local only: an in-flight request
    /// is not aborted.
    pub fn cancel(&mut self) -> InlineOutcome {
        if self.slot.take().is_some() {
            InlineOutcome::Cancelled
        } else {
            InlineOutcome::Ignored
        }
    }

    fn editable(&mut self) -> Option<&mut InlineCreationRequest> {
        self.slot.as_mut().filter(|slot| !slot.submitting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(parent: Option<&str>, title: &str) -> InlineCreator {
        let mut creator = InlineCreator::new();
        creator.open(parent.map(NodeId::from));
        creator.set_title(title);
        creator
    }

    #[test]
    fn enter_submits_trimmed_title() {
        let mut creator = typed(Some("a"), "  New page ");
        assert_eq!(
            creator.handle(InlineEvent::Enter),
            InlineOutcome::Submit {
                parent_id: Some("a".into()),
                title: "New page".into(),
            }
        );
        assert!(creator.request().is_some_and(|r| r.submitting));
    }

    #[test]
    fn blur_after_enter_does_not_double_submit() {
        let mut creator = typed(None, "Once");
        assert!(matches!(creator.handle(InlineEvent::Enter), InlineOutcome::Submit { .. }));
        assert_eq!(creator.handle(InlineEvent::Blur), InlineOutcome::Ignored);
    }

    #[test]
    fn blur_with_empty_title_cancels() {
        let mut creator = typed(None, "   ");
        assert_eq!(creator.handle(InlineEvent::Blur), InlineOutcome::Cancelled);
        assert!(!creator.is_open());
    }

    #[test]
    fn enter_with_empty_title_keeps_slot() {
        let mut creator = typed(None, "");
        assert_eq!(creator.handle(InlineEvent::Enter), InlineOutcome::Ignored);
        assert!(creator.is_open());
    }

    #[test]
    fn escape_cancels_even_with_text() {
        let mut creator = typed(None, "draft");
        assert_eq!(creator.handle(InlineEvent::Escape), InlineOutcome::Cancelled);
        assert!(!creator.is_open());
    }

    #[test]
    fn failure_keeps_slot_for_retry() {
        let mut creator = typed(Some("a"), "Retry me");
        creator.handle(InlineEvent::Enter);
        creator.finish_failure("storage failure");
        let slot = creator.request().expect("slot kept");
        assert!(!slot.submitting);
        assert_eq!(slot.error.as_deref(), Some("storage failure"));
        assert_eq!(slot.title, "Retry me");
        assert!(matches!(creator.handle(InlineEvent::Enter), InlineOutcome::Submit { .. }));
    }

    #[test]
    fn success_closes_slot() {
        let mut creator = typed(None, "Done");
        creator.handle(InlineEvent::Enter);
        assert!(creator.finish_success().is_some());
        assert!(!creator.is_open());
    }

    #[test]
    fn opening_elsewhere_replaces_slot() {
        let mut creator = typed(Some("a"), "lost");
        creator.open(Some("b".into()));
        let slot = creator.request().expect("slot");
        assert_eq!(slot.parent_id, Some("b".into()));
        assert!(slot.title.is_empty());
    }

    #[test]
    fn edits_are_frozen_while_submitting() {
        let mut creator = typed(None, "abc");
        creator.handle(InlineEvent::Enter);
        creator.push_char('d');
        creator.pop_char();
        assert_eq!(creator.request().map(|r| r.title.as_str()), Some("abc"));
    }

    #[test]
    fn events_without_slot_are_ignored() {
        let mut creator = InlineCreator::new();
        assert_eq!(creator.handle(InlineEvent::Enter), InlineOutcome::Ignored);
        assert_eq!(creator.handle(InlineEvent::Escape), InlineOutcome::Ignored);
    }
}
