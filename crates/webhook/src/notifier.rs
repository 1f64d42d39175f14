//! Notification requests and their out-of-band delivery.
//!
//! The [`Notifier`] port is the only place the event path hands work off: a
//! call to [`Notifier::notify_background`] returns as soon as the request has
//! been submitted. [`BackgroundNotifier`] runs each submission as a task on a
//! Tokio runtime and talks to the CI servers through a
//! [`NotificationTransport`], so this crate never performs network I/O itself.
//!
//! Delivery failures are logged inside the background task and go no further.
//! There is no retry and no de-duplication: two submissions for the same
//! repository and ref produce two independent deliveries, in no particular
//! order.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{
    BranchName, CiEndpoint, CommitSha, DeliveryError, NotificationId, RefName, Repository,
    Settings, SettingsService, Timestamp,
};

// ---------------------------------------------------------------------------
// Request and result
// ---------------------------------------------------------------------------

/// A fully resolved request to notify a repository's CI endpoints.
///
/// Built once per eligible event and consumed by exactly one notifier call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    /// Log correlation identifier.
    pub id: NotificationId,
    /// When the request was built.
    pub requested_at: Timestamp,
    /// Repository whose endpoints are notified.
    pub repository: Repository,
    /// Ref handed to the CI server.
    pub git_ref: RefName,
    /// Commit to build.
    pub commit: CommitSha,
    /// Branch (or tag name) the commit belongs to.
    pub target_branch: BranchName,
}

impl NotificationRequest {
    /// Creates a request with a fresh [`NotificationId`].
    pub fn new(
        repository: Repository,
        git_ref: RefName,
        commit: CommitSha,
        target_branch: BranchName,
    ) -> Self {
        Self {
            id: NotificationId::new_random(),
            requested_at: Timestamp::now(),
            repository,
            git_ref,
            commit,
            target_branch,
        }
    }
}

/// Outcome of notifying one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationResult {
    /// Base URL of the endpoint that was called.
    pub endpoint: String,
    /// Whether the endpoint accepted the notification.
    pub successful: bool,
    /// Response body on success, error description on failure.
    pub message: String,
}

impl NotificationResult {
    fn from_outcome(endpoint: &CiEndpoint, outcome: Result<String, DeliveryError>) -> Self {
        match outcome {
            Ok(body) => Self {
                endpoint: endpoint.base_url.clone(),
                successful: true,
                message: body,
            },
            Err(e) => Self {
                endpoint: endpoint.base_url.clone(),
                successful: false,
                message: e.to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Performs one outbound call to one CI endpoint.
///
/// Implemented by infrastructure crates (see the `jenkins` crate).
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Tells `endpoint` about `request`, returning the endpoint's response body.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] when the request cannot be built, cannot be
    /// sent, or is answered with a non-success status.
    async fn deliver(
        &self,
        settings: &Settings,
        endpoint: &CiEndpoint,
        request: &NotificationRequest,
    ) -> Result<String, DeliveryError>;
}

/// Accepts notification requests without blocking the caller.
pub trait Notifier: Send + Sync {
    /// Submits `request` for delivery and returns immediately.
    ///
    /// Never fails from the caller's point of view; delivery problems are
    /// reported through logging only.
    fn notify_background(&self, request: NotificationRequest);
}

// ---------------------------------------------------------------------------
// Background notifier
// ---------------------------------------------------------------------------

/// [`Notifier`] that delivers each request on a Tokio task.
///
/// Can be called from any thread, including threads that are not part of the
/// runtime, because tasks are spawned through a stored runtime [`Handle`].
pub struct BackgroundNotifier {
    settings: Arc<dyn SettingsService>,
    transport: Arc<dyn NotificationTransport>,
    runtime: Handle,
    tracker: TaskTracker,
}

impl BackgroundNotifier {
    /// Creates a notifier spawning deliveries onto `runtime`.
    pub fn new(
        settings: Arc<dyn SettingsService>,
        transport: Arc<dyn NotificationTransport>,
        runtime: Handle,
    ) -> Self {
        Self {
            settings,
            transport,
            runtime,
            tracker: TaskTracker::new(),
        }
    }

    /// Delivers `request` to every configured endpoint and waits for the results.
    ///
    /// Used for manually triggered builds, where the caller wants to see each
    /// endpoint's answer. Returns an empty list when the repository has no
    /// (enabled) settings.
    pub async fn notify(&self, request: &NotificationRequest) -> Vec<NotificationResult> {
        deliver_all(self.settings.as_ref(), self.transport.as_ref(), request).await
    }

    /// Number of background deliveries still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stops accepting submissions and waits for in-flight deliveries to finish.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl Notifier for BackgroundNotifier {
    fn notify_background(&self, request: NotificationRequest) {
        if self.tracker.is_closed() {
            warn!(
                notification_id = %request.id,
                repository = %request.repository,
                "Notifier is shut down; dropping notification"
            );
            return;
        }

        let settings = Arc::clone(&self.settings);
        let transport = Arc::clone(&self.transport);
        let span = info_span!(
            "notification",
            notification_id = %request.id,
            repository = %request.repository,
            git_ref = %request.git_ref,
            commit = %request.commit,
        );

        self.tracker.spawn_on(
            async move {
                let results = deliver_all(settings.as_ref(), transport.as_ref(), &request).await;
                let failed = results.iter().filter(|r| !r.successful).count();
                debug!(endpoints = results.len(), failed, "Background notification finished");
            }
            .instrument(span),
            &self.runtime,
        );
    }
}

/// Calls every endpoint of the repository in turn, logging each outcome.
async fn deliver_all(
    settings_service: &dyn SettingsService,
    transport: &dyn NotificationTransport,
    request: &NotificationRequest,
) -> Vec<NotificationResult> {
    let Some(settings) = settings_service.get_settings(&request.repository) else {
        debug!(repository = %request.repository, "Notifications disabled before delivery");
        return Vec::new();
    };

    let mut results = Vec::with_capacity(settings.endpoints.len());
    for endpoint in &settings.endpoints {
        let outcome = transport.deliver(&settings, endpoint, request).await;
        match &outcome {
            Ok(_) => info!(%endpoint, "Notified CI endpoint"),
            Err(e) => warn!(%endpoint, error = %e, "Failed to notify CI endpoint"),
        }
        results.push(NotificationResult::from_outcome(endpoint, outcome));
    }
    results
}
