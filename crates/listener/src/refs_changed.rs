//! Refs-changed events (pushes).

use std::sync::Arc;

use tracing::trace;
use webhook::{
    BranchName, CommitSha, DispatchOutcome, EventDispatcher, EventKind, HookError,
    NotificationTarget, PlatformEvent, RefChangeType, RefName, RefsChangedEvent,
};

use crate::{report, EventListener};

const BRANCH_PREFIX: &str = "refs/heads/";

fn is_null_hash(hash: &str) -> bool {
    !hash.is_empty() && hash.bytes().all(|b| b == b'0')
}

/// Derives one notification target per updated or created branch.
///
/// Deleted refs and refs outside `refs/heads/` (tags, notes, ...) produce no
/// target.
///
/// # Errors
///
/// Returns [`HookError::MalformedEvent`] if a change has no ref id, or a
/// branch change has no new hash.
pub fn refs_changed_targets(event: &RefsChangedEvent) -> Result<Vec<NotificationTarget>, HookError> {
    let mut targets = Vec::new();
    for change in &event.changes {
        if change.ref_id.trim().is_empty() {
            return Err(HookError::missing("changes.ref_id"));
        }
        if change.change_type == RefChangeType::Delete || is_null_hash(&change.to_hash) {
            trace!(ref_id = %change.ref_id, "Skipping deleted ref");
            continue;
        }
        let Some(branch) = change.ref_id.strip_prefix(BRANCH_PREFIX) else {
            trace!(ref_id = %change.ref_id, "Skipping non-branch ref");
            continue;
        };

        let target_branch = BranchName::new(branch).ok_or_else(|| HookError::MalformedEvent {
            field: "changes.ref_id",
            reason: format!("'{}' names no branch", change.ref_id),
        })?;
        let commit =
            CommitSha::new(change.to_hash.clone()).ok_or_else(|| HookError::missing("changes.to_hash"))?;
        let git_ref =
            RefName::new(change.ref_id.clone()).ok_or_else(|| HookError::missing("changes.ref_id"))?;

        targets.push(NotificationTarget {
            git_ref,
            commit,
            target_branch,
        });
    }
    Ok(targets)
}

/// Listener for [`PlatformEvent::RefsChanged`].
#[derive(Clone)]
pub struct RefsChangedListener {
    dispatcher: EventDispatcher,
}

impl RefsChangedListener {
    /// Creates a listener dispatching through `dispatcher`.
    pub fn new(dispatcher: EventDispatcher) -> Self {
        Self { dispatcher }
    }
}

impl EventListener for RefsChangedListener {
    fn kind(&self) -> EventKind {
        EventKind::RefsChanged
    }

    fn on_event(&self, event: Arc<PlatformEvent>) -> DispatchOutcome {
        if !matches!(event.as_ref(), PlatformEvent::RefsChanged(_)) {
            return DispatchOutcome::NothingToNotify;
        }

        let result = self.dispatcher.dispatch(event, |event| match event {
            PlatformEvent::RefsChanged(refs_event) => refs_changed_targets(refs_event),
            _ => Ok(Vec::new()),
        });
        report(EventKind::RefsChanged, result)
    }
}
