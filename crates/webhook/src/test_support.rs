//! Fixtures shared by the unit tests of this crate.

use std::sync::{Arc, Mutex};

use crate::{
    BranchName, CiEndpoint, CommitSha, EventContext, InMemorySettingsService, NotificationRequest,
    Notifier, PlatformEvent, PlatformUser, ProjectKey, RefName, Repository, RepositorySlug,
    Settings, Tag, TagCreatedEvent, UserName,
};

pub(crate) fn repository() -> Repository {
    Repository::new(
        ProjectKey::new("PRJ").unwrap(),
        RepositorySlug::new("service").unwrap(),
    )
}

pub(crate) fn tag_event(user: &str) -> PlatformEvent {
    PlatformEvent::TagCreated(TagCreatedEvent {
        repository: repository(),
        user: Some(PlatformUser {
            name: user.to_string(),
        }),
        tag: Tag {
            id: "42".to_string(),
            display_id: "v1.0".to_string(),
            latest_commit: "abc123".to_string(),
        },
    })
}

pub(crate) fn tag_context(user: &str) -> EventContext {
    EventContext::new(
        Arc::new(tag_event(user)),
        repository(),
        UserName::new(user).unwrap(),
    )
}

pub(crate) fn request(git_ref: &str) -> NotificationRequest {
    NotificationRequest::new(
        repository(),
        RefName::new(git_ref).unwrap(),
        CommitSha::new("abc123").unwrap(),
        BranchName::new("v1.0").unwrap(),
    )
}

pub(crate) fn enabled_settings() -> InMemorySettingsService {
    let mut service = InMemorySettingsService::new();
    service.insert(Settings::new(repository(), CiEndpoint::new("https://ci")));
    service
}

/// Keeps every submitted request instead of delivering it.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    requests: Mutex<Vec<NotificationRequest>>,
}

impl RecordingNotifier {
    pub(crate) fn requests(&self) -> Vec<NotificationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_background(&self, request: NotificationRequest) {
        self.requests.lock().unwrap().push(request);
    }
}
