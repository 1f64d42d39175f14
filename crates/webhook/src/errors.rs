//! Error types for the webhook domain.
//!
//! [`HookError`] covers conditions detected while turning a platform event into
//! a notification request. [`DeliveryError`] covers failures of a single
//! outbound call to a CI endpoint; those never leave the notifier's background
//! task.
//!
//! Neither type models "repository disabled" or "event ineligible": both are
//! normal outcomes, reported as [`crate::DispatchOutcome`] variants rather than
//! errors.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Event handling errors
// ---------------------------------------------------------------------------

/// Errors raised while handling one platform event.
///
/// These are caught at the listener boundary and logged; the platform's
/// dispatch loop only ever observes a [`crate::DispatchOutcome`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HookError {
    /// The event is missing data required to build a notification request.
    ///
    /// Fatal for the event being handled; other events are unaffected.
    #[error("Malformed event: {field} {reason}")]
    MalformedEvent {
        /// Name of the offending event field (e.g. `"tag.latest_commit"`).
        field: &'static str,
        /// Human-readable description of what is wrong with it.
        reason: String,
    },

    /// Settings or runtime configuration is invalid.
    ///
    /// Produced at load time; the listener never starts with an invalid config.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

impl HookError {
    /// Shorthand for a [`HookError::MalformedEvent`] on a missing or empty field.
    pub fn missing(field: &'static str) -> Self {
        Self::MalformedEvent {
            field,
            reason: "is missing or empty".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Delivery errors
// ---------------------------------------------------------------------------

/// Failure of one delivery attempt to one CI endpoint.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The endpoint (or a URL derived from it) could not be turned into a request.
    #[error("Invalid endpoint '{endpoint}': {message}")]
    InvalidEndpoint {
        /// The configured endpoint base URL.
        endpoint: String,
        /// Why the URL was rejected.
        message: String,
    },

    /// The request could not be sent or no response was received.
    #[error("Transport failure: {message}")]
    Transport {
        /// Description of the underlying I/O or TLS failure.
        message: String,
    },

    /// The endpoint answered with a non-success status.
    #[error("Endpoint rejected notification with status {status}: {body}")]
    Rejected {
        /// HTTP status code returned by the endpoint.
        status: u16,
        /// Response body (possibly empty).
        body: String,
    },
}
