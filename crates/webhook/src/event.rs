//! Platform events and the per-invocation [`EventContext`].
//!
//! [`PlatformEvent`] mirrors what the hosting platform hands to a listener
//! callback. Its payload fields are kept as raw strings because the platform
//! does not guarantee them; listeners validate them into domain identifiers and
//! report a [`crate::HookError::MalformedEvent`] when they are unusable.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{BranchName, EventKind, Repository, UserName};

// ---------------------------------------------------------------------------
// Platform payloads
// ---------------------------------------------------------------------------

/// A user as reported on a platform event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformUser {
    /// Login name of the user.
    #[serde(default)]
    pub name: String,
}

/// A tag as reported on a tag-created event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Platform identifier of the tag.
    #[serde(default)]
    pub id: String,
    /// Human-readable tag name (e.g. `"v1.0"`).
    #[serde(default)]
    pub display_id: String,
    /// Commit the tag points at.
    #[serde(default)]
    pub latest_commit: String,
}

/// A tag was created in a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCreatedEvent {
    /// Repository the tag was created in.
    pub repository: Repository,
    /// User who created the tag. Absent for system-initiated events.
    pub user: Option<PlatformUser>,
    /// The created tag.
    pub tag: Tag,
}

/// How a single ref moved in a refs-changed event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefChangeType {
    /// The ref was created.
    Add,
    /// The ref was moved to a new commit.
    #[default]
    Update,
    /// The ref was removed.
    Delete,
}

/// One ref update within a refs-changed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefChange {
    /// Fully-qualified ref (e.g. `"refs/heads/main"`).
    #[serde(default)]
    pub ref_id: String,
    /// Commit the ref pointed at before the change.
    #[serde(default)]
    pub from_hash: String,
    /// Commit the ref points at after the change.
    #[serde(default)]
    pub to_hash: String,
    /// Kind of change.
    #[serde(default, rename = "type")]
    pub change_type: RefChangeType,
}

/// One or more refs changed in a repository (typically a push).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefsChangedEvent {
    /// Repository the refs belong to.
    pub repository: Repository,
    /// User who pushed. Absent for system-initiated events.
    pub user: Option<PlatformUser>,
    /// The individual ref changes.
    #[serde(default)]
    pub changes: Vec<RefChange>,
}

/// A repository lifecycle event delivered by the hosting platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// See [`TagCreatedEvent`].
    TagCreated(TagCreatedEvent),
    /// See [`RefsChangedEvent`].
    RefsChanged(RefsChangedEvent),
}

impl PlatformEvent {
    /// Returns the kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::TagCreated(_) => EventKind::TagCreated,
            Self::RefsChanged(_) => EventKind::RefsChanged,
        }
    }

    /// Returns the repository the event belongs to.
    pub fn repository(&self) -> &Repository {
        match self {
            Self::TagCreated(e) => &e.repository,
            Self::RefsChanged(e) => &e.repository,
        }
    }

    /// Returns the user who caused the event, if the platform reported one.
    pub fn user(&self) -> Option<&PlatformUser> {
        match self {
            Self::TagCreated(e) => e.user.as_ref(),
            Self::RefsChanged(e) => e.user.as_ref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Event context
// ---------------------------------------------------------------------------

/// Everything an eligibility filter may inspect about one event.
///
/// Immutable once constructed and lives for a single event-handling
/// invocation. The source event is shared, so a refs-changed event with
/// several changes produces several contexts (one per target branch) without
/// copying the payload.
#[derive(Debug, Clone)]
pub struct EventContext {
    event: Arc<PlatformEvent>,
    repository: Repository,
    triggering_user: UserName,
    target_branch: Option<BranchName>,
}

impl EventContext {
    /// Creates a context for `event` caused by `triggering_user`.
    pub fn new(event: Arc<PlatformEvent>, repository: Repository, triggering_user: UserName) -> Self {
        Self {
            event,
            repository,
            triggering_user,
            target_branch: None,
        }
    }

    /// Attaches the branch the resulting notification would target.
    pub fn with_target_branch(mut self, branch: BranchName) -> Self {
        self.target_branch = Some(branch);
        self
    }

    /// The event that triggered this invocation.
    pub fn event(&self) -> &PlatformEvent {
        &self.event
    }

    /// The repository the event belongs to.
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Name of the user who caused the event.
    pub fn triggering_user(&self) -> &UserName {
        &self.triggering_user
    }

    /// Branch the notification would target, when already derived.
    pub fn target_branch(&self) -> Option<&BranchName> {
        self.target_branch.as_ref()
    }
}
