//! Newtype domain identifiers.
//!
//! Every value that travels from a platform event to a CI endpoint is wrapped in
//! a distinct newtype. This prevents accidentally interchanging, for example, a
//! [`BranchName`] with a [`RefName`] even though both are plain strings on the
//! wire.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty
            /// or consists only of whitespace.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.trim().is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value).ok_or_else(|| {
                    format!("{} must not be empty", stringify!($name))
                })
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: repository addressing
// ---------------------------------------------------------------------------

string_id! {
    /// The key of the project a repository belongs to (e.g. `"PRJ"`).
    ProjectKey
}

string_id! {
    /// The URL-safe slug of a repository within its project (e.g. `"my-service"`).
    RepositorySlug
}

string_id! {
    /// The name of the platform user who caused an event.
    UserName
}

// ---------------------------------------------------------------------------
// Identifiers: Git names
// ---------------------------------------------------------------------------

string_id! {
    /// A symbolic ref handed to the CI system (e.g. `"pr/42/from"`, `"refs/heads/main"`).
    RefName
}

string_id! {
    /// A Git commit SHA as reported by the platform.
    CommitSha
}

string_id! {
    /// A Git branch (or tag display) name (e.g. `"main"`, `"v1.0"`).
    BranchName
}

string_id! {
    /// The platform identifier of a tag (e.g. `"refs/tags/v1.0"` or `"42"`).
    TagId
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Correlates the log lines of one notification across its endpoint deliveries.
///
/// Generated fresh for every [`crate::NotificationRequest`]; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(Uuid);

impl NotificationId {
    /// Generates a new random notification identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
