//! Tag-created events.

use std::sync::Arc;

use webhook::{
    BranchName, CommitSha, DispatchOutcome, EventDispatcher, EventKind, HookError,
    NotificationTarget, PlatformEvent, RefName, TagCreatedEvent,
};

use crate::{report, EventListener};

/// Ref handed to the CI server for the tag with id `tag_id`.
///
/// Returns `None` if `tag_id` is empty or blank.
pub fn tag_ref(tag_id: &str) -> Option<RefName> {
    if tag_id.trim().is_empty() {
        return None;
    }
    RefName::new(format!("pr/{tag_id}/from"))
}

/// Derives the notification target for a created tag.
///
/// # Errors
///
/// Returns [`HookError::MalformedEvent`] naming the first tag field that is
/// missing or empty.
pub fn tag_created_target(event: &TagCreatedEvent) -> Result<NotificationTarget, HookError> {
    let tag = &event.tag;
    let git_ref = tag_ref(&tag.id).ok_or_else(|| HookError::missing("tag.id"))?;
    let commit =
        CommitSha::new(tag.latest_commit.clone()).ok_or_else(|| HookError::missing("tag.latest_commit"))?;
    let target_branch =
        BranchName::new(tag.display_id.clone()).ok_or_else(|| HookError::missing("tag.display_id"))?;

    Ok(NotificationTarget {
        git_ref,
        commit,
        target_branch,
    })
}

/// Listener for [`PlatformEvent::TagCreated`].
#[derive(Clone)]
pub struct TagCreatedListener {
    dispatcher: EventDispatcher,
}

impl TagCreatedListener {
    /// Creates a listener dispatching through `dispatcher`.
    pub fn new(dispatcher: EventDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Handles a tag-created event.
    pub fn on_tag_created(&self, event: TagCreatedEvent) -> DispatchOutcome {
        self.on_event(Arc::new(PlatformEvent::TagCreated(event)))
    }
}

impl EventListener for TagCreatedListener {
    fn kind(&self) -> EventKind {
        EventKind::TagCreated
    }

    fn on_event(&self, event: Arc<PlatformEvent>) -> DispatchOutcome {
        if !matches!(event.as_ref(), PlatformEvent::TagCreated(_)) {
            return DispatchOutcome::NothingToNotify;
        }

        let result = self.dispatcher.dispatch(event, |event| match event {
            PlatformEvent::TagCreated(tag_event) => Ok(vec![tag_created_target(tag_event)?]),
            _ => Ok(Vec::new()),
        });
        report(EventKind::TagCreated, result)
    }
}

#[cfg(test)]
mod tests {
    use webhook::{ProjectKey, Repository, RepositorySlug, Tag};

    use super::*;

    fn event(id: &str, display_id: &str, latest_commit: &str) -> TagCreatedEvent {
        TagCreatedEvent {
            repository: Repository::new(
                ProjectKey::new("PRJ").unwrap(),
                RepositorySlug::new("service").unwrap(),
            ),
            user: None,
            tag: Tag {
                id: id.to_string(),
                display_id: display_id.to_string(),
                latest_commit: latest_commit.to_string(),
            },
        }
    }

    #[test]
    fn tag_ref_wraps_the_tag_id() {
        assert_eq!(tag_ref("42").unwrap().as_str(), "pr/42/from");
        assert_eq!(
            tag_ref("refs/tags/v1.0").unwrap().as_str(),
            "pr/refs/tags/v1.0/from"
        );
        assert!(tag_ref("").is_none());
    }

    #[test]
    fn target_is_derived_from_the_tag() {
        let target = tag_created_target(&event("42", "v1.0", "abc123")).unwrap();

        assert_eq!(target.git_ref.as_str(), "pr/42/from");
        assert_eq!(target.commit.as_str(), "abc123");
        assert_eq!(target.target_branch.as_str(), "v1.0");
    }

    #[test]
    fn missing_tag_fields_are_reported() {
        assert_eq!(
            tag_created_target(&event("", "v1.0", "abc123")).unwrap_err(),
            HookError::missing("tag.id")
        );
        assert_eq!(
            tag_created_target(&event("42", "v1.0", "")).unwrap_err(),
            HookError::missing("tag.latest_commit")
        );
        assert_eq!(
            tag_created_target(&event("42", " ", "abc123")).unwrap_err(),
            HookError::missing("tag.display_id")
        );
    }
}
