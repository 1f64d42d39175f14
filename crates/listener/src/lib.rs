//! Platform event listeners.
//!
//! One listener per platform event kind. Each derives the ref, commit, and
//! branch its event stands for and hands the rest to the shared
//! [`webhook::EventDispatcher`]:
//!
//! | Event | Listener | Ref | Commit | Branch |
//! |-------|----------|-----|--------|--------|
//! | Tag created | [`TagCreatedListener`] | `pr/<tag id>/from` | tag's latest commit | tag display id |
//! | Refs changed | [`RefsChangedListener`] | full ref id | new hash | branch name |
//!
//! ## Architectural Layer
//!
//! **Adapter.** The platform invokes listeners synchronously on its event
//! thread. Nothing here blocks: settings lookups and filters are in-memory and
//! delivery is handed to the notifier. No error crosses back into the
//! platform; [`EventListener::on_event`] always returns a
//! [`DispatchOutcome`], logging malformed events on the way.

mod refs_changed;
mod tag_created;

use std::sync::Arc;

use tracing::error;
use webhook::{DispatchOutcome, EventKind, HookError, PlatformEvent};

pub use refs_changed::{refs_changed_targets, RefsChangedListener};
pub use tag_created::{tag_created_target, tag_ref, TagCreatedListener};

/// A callback for one kind of platform event.
pub trait EventListener: Send + Sync {
    /// The event kind this listener handles.
    fn kind(&self) -> EventKind;

    /// Handles `event`. Events of other kinds are ignored.
    fn on_event(&self, event: Arc<PlatformEvent>) -> DispatchOutcome;
}

/// Converts a dispatch result into what the platform observes, logging failures.
pub(crate) fn report(kind: EventKind, result: Result<DispatchOutcome, HookError>) -> DispatchOutcome {
    match result {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(%kind, error = %e, "Dropping unusable platform event");
            DispatchOutcome::Malformed
        }
    }
}

/// Routes each platform event to the listener registered for its kind.
#[derive(Clone, Default)]
pub struct ListenerSet {
    listeners: Vec<Arc<dyn EventListener>>,
}

impl ListenerSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener`.
    pub fn with_listener(mut self, listener: impl EventListener + 'static) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Delivers `event` to every listener registered for its kind.
    ///
    /// Returns [`DispatchOutcome::NothingToNotify`] when no listener handles
    /// the kind; otherwise the outcome of the last listener invoked.
    pub fn handle(&self, event: PlatformEvent) -> DispatchOutcome {
        let event = Arc::new(event);
        let kind = event.kind();
        self.listeners
            .iter()
            .filter(|listener| listener.kind() == kind)
            .fold(DispatchOutcome::NothingToNotify, |_, listener| {
                listener.on_event(Arc::clone(&event))
            })
    }

    /// Decodes one JSON-encoded platform event and handles it.
    ///
    /// Undecodable input is logged and reported as
    /// [`DispatchOutcome::Malformed`].
    pub fn handle_json(&self, payload: &str) -> DispatchOutcome {
        match serde_json::from_str::<PlatformEvent>(payload) {
            Ok(event) => self.handle(event),
            Err(e) => {
                error!(error = %e, "Dropping undecodable platform event");
                DispatchOutcome::Malformed
            }
        }
    }
}
