//! Shared value types for the webhook domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types combine
//! several values into one concept (a repository's identity, a point in time, a
//! kind of platform event) and are used across every other module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ProjectKey, RepositorySlug};

// ---------------------------------------------------------------------------
// Repository identity
// ---------------------------------------------------------------------------

/// Identity of a repository on the hosting platform.
///
/// A repository is addressed by its project key and slug; it is the key under
/// which [`crate::SettingsService`] stores notification configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repository {
    /// Key of the owning project.
    pub project_key: ProjectKey,
    /// Slug of the repository within the project.
    pub slug: RepositorySlug,
}

impl Repository {
    /// Creates a new [`Repository`] identity.
    pub fn new(project_key: ProjectKey, slug: RepositorySlug) -> Self {
        Self { project_key, slug }
    }
}

impl std::fmt::Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.project_key, self.slug)
    }
}

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// The kinds of platform event that can trigger a notification.
///
/// Used by [`crate::eligibility::EventKindFilter`] to gate notifications per
/// repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A tag was created.
    TagCreated,
    /// One or more refs were pushed, updated, or deleted.
    RefsChanged,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TagCreated => write!(f, "tag_created"),
            Self::RefsChanged => write!(f, "refs_changed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
