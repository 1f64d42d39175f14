//! Domain core for turning repository events into CI build triggers.
//!
//! This crate holds every concept the event path relies on: identifiers, the
//! per-invocation [`EventContext`], repository [`Settings`] and the
//! [`SettingsService`] port, the [`EligibilityFilterChain`], the [`Notifier`]
//! port with its [`BackgroundNotifier`] implementation, and the
//! [`EventDispatcher`] that strings them together for listeners.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** Outbound HTTP lives in the `jenkins`
//! crate behind [`NotificationTransport`]; platform callbacks live in the
//! `listener` crate.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`CommitSha`, `RefName`, etc.) |
//! | [`types`] | Shared value types (`Repository`, `EventKind`, `Timestamp`) |
//! | [`errors`] | `HookError` and `DeliveryError` |
//! | [`event`] | Platform event payloads and `EventContext` |
//! | [`settings`] | Repository settings and the lookup port |
//! | [`eligibility`] | Filter capability, verdicts, chain, built-in filters |
//! | [`notifier`] | Notification requests, transport port, background delivery |
//! | [`dispatch`] | The sequence shared by every listener |

pub mod dispatch;
pub mod eligibility;
pub mod errors;
pub mod event;
pub mod identifiers;
pub mod notifier;
pub mod settings;
pub mod types;

#[cfg(test)]
mod test_support;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use dispatch::{DispatchOutcome, EventDispatcher, NotificationTarget};
pub use eligibility::{EligibilityFilter, EligibilityFilterChain, FilterVerdict};
pub use errors::{DeliveryError, HookError};
pub use event::{
    EventContext, PlatformEvent, PlatformUser, RefChange, RefChangeType, RefsChangedEvent, Tag,
    TagCreatedEvent,
};
pub use identifiers::{
    BranchName, CommitSha, NotificationId, ProjectKey, RefName, RepositorySlug, TagId, UserName,
};
pub use notifier::{
    BackgroundNotifier, NotificationRequest, NotificationResult, NotificationTransport, Notifier,
};
pub use settings::{
    BranchMode, BranchOptions, CiEndpoint, CloneSource, InMemorySettingsService, Settings,
    SettingsService,
};
pub use types::{EventKind, Repository, Timestamp};
