//! The settings → eligibility → notifier sequence shared by every listener.
//!
//! Listeners differ only in how they derive [`NotificationTarget`]s from their
//! event kind. Everything else (the enablement check, context construction,
//! filter evaluation, and submission) happens here, in this order, so that no
//! [`NotificationRequest`] is ever built for a disabled repository or an event
//! the filter chain rejected.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::{
    BranchName, CommitSha, EligibilityFilterChain, EventContext, HookError, NotificationRequest,
    Notifier, PlatformEvent, RefName, SettingsService, UserName,
};

/// The ref/commit/branch triple a listener derives from its event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTarget {
    /// Ref handed to the CI server.
    pub git_ref: RefName,
    /// Commit to build.
    pub commit: CommitSha,
    /// Branch (or tag name) the commit belongs to.
    pub target_branch: BranchName,
}

/// What happened to one platform event.
///
/// This is all the platform's dispatch loop ever sees; none of the variants is
/// an error from its point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Notifications are off for the repository.
    Disabled,
    /// The event carried nothing to notify about (e.g. only deleted refs).
    NothingToNotify,
    /// The filter chain vetoed every target.
    Ineligible,
    /// At least one notification was submitted.
    Dispatched {
        /// Number of notifications submitted.
        notifications: usize,
    },
    /// The event data was unusable; details were logged.
    Malformed,
}

/// Runs the shared dispatch sequence for listeners.
#[derive(Clone)]
pub struct EventDispatcher {
    settings: Arc<dyn SettingsService>,
    filter_chain: Arc<EligibilityFilterChain>,
    notifier: Arc<dyn Notifier>,
}

impl EventDispatcher {
    /// Creates a dispatcher over the given collaborators.
    pub fn new(
        settings: Arc<dyn SettingsService>,
        filter_chain: Arc<EligibilityFilterChain>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            filter_chain,
            notifier,
        }
    }

    /// Handles `event`, deriving its targets with `derive_targets`.
    ///
    /// `derive_targets` is only called once the repository is known to be
    /// enabled. Each target is checked against the filter chain separately and
    /// submitted to the notifier if it passes.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::MalformedEvent`] if the event has no triggering
    /// user or `derive_targets` fails. Nothing has been submitted in that case.
    pub fn dispatch<F>(
        &self,
        event: Arc<PlatformEvent>,
        derive_targets: F,
    ) -> Result<DispatchOutcome, HookError>
    where
        F: FnOnce(&PlatformEvent) -> Result<Vec<NotificationTarget>, HookError>,
    {
        let repository = event.repository().clone();
        if self.settings.get_settings(&repository).is_none() {
            trace!(%repository, "Notifications disabled for repository");
            return Ok(DispatchOutcome::Disabled);
        }

        let user = event
            .user()
            .and_then(|u| UserName::new(u.name.clone()))
            .ok_or_else(|| HookError::missing("user.name"))?;
        let targets = derive_targets(event.as_ref())?;
        if targets.is_empty() {
            debug!(%repository, kind = %event.kind(), "Event has nothing to notify about");
            return Ok(DispatchOutcome::NothingToNotify);
        }

        let base_context = EventContext::new(event, repository.clone(), user);
        let mut notifications = 0;
        for target in targets {
            let context = base_context
                .clone()
                .with_target_branch(target.target_branch.clone());
            if !self.filter_chain.should_deliver_notification(&context) {
                continue;
            }

            self.notifier.notify_background(NotificationRequest::new(
                repository.clone(),
                target.git_ref,
                target.commit,
                target.target_branch,
            ));
            notifications += 1;
        }

        if notifications == 0 {
            Ok(DispatchOutcome::Ineligible)
        } else {
            Ok(DispatchOutcome::Dispatched { notifications })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::{FilterVerdict, FnFilter};
    use crate::test_support::{enabled_settings, tag_event, RecordingNotifier};
    use crate::{InMemorySettingsService, PlatformUser};

    fn target(git_ref: &str, branch: &str) -> NotificationTarget {
        NotificationTarget {
            git_ref: RefName::new(git_ref).unwrap(),
            commit: CommitSha::new("abc123").unwrap(),
            target_branch: BranchName::new(branch).unwrap(),
        }
    }

    fn dispatcher(
        settings: InMemorySettingsService,
        chain: EligibilityFilterChain,
    ) -> (EventDispatcher, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher =
            EventDispatcher::new(Arc::new(settings), Arc::new(chain), notifier.clone());
        (dispatcher, notifier)
    }

    #[test]
    fn disabled_repository_skips_target_derivation() {
        let (dispatcher, notifier) =
            dispatcher(InMemorySettingsService::new(), EligibilityFilterChain::new());

        let outcome = dispatcher
            .dispatch(Arc::new(tag_event("alice")), |_| {
                panic!("targets must not be derived for a disabled repository")
            })
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Disabled);
        assert!(notifier.requests().is_empty());
    }

    #[test]
    fn eligible_target_is_submitted_once() {
        let (dispatcher, notifier) = dispatcher(enabled_settings(), EligibilityFilterChain::new());

        let outcome = dispatcher
            .dispatch(Arc::new(tag_event("alice")), |_| Ok(vec![target("pr/42/from", "v1.0")]))
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Dispatched { notifications: 1 });
        let requests = notifier.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].git_ref.as_str(), "pr/42/from");
        assert_eq!(requests[0].target_branch.as_str(), "v1.0");
    }

    #[test]
    fn vetoed_target_is_not_submitted() {
        let chain = EligibilityFilterChain::new()
            .with_filter(FnFilter::new("veto", |_| FilterVerdict::Ineligible));
        let (dispatcher, notifier) = dispatcher(enabled_settings(), chain);

        let outcome = dispatcher
            .dispatch(Arc::new(tag_event("alice")), |_| Ok(vec![target("pr/42/from", "v1.0")]))
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Ineligible);
        assert!(notifier.requests().is_empty());
    }

    #[test]
    fn each_target_is_filtered_separately() {
        let chain = EligibilityFilterChain::new().with_filter(FnFilter::new("main-only", |ctx| {
            match ctx.target_branch().map(|b| b.as_str()) {
                Some("main") => FilterVerdict::Abstain,
                _ => FilterVerdict::Ineligible,
            }
        }));
        let (dispatcher, notifier) = dispatcher(enabled_settings(), chain);

        let outcome = dispatcher
            .dispatch(Arc::new(tag_event("alice")), |_| {
                Ok(vec![
                    target("refs/heads/main", "main"),
                    target("refs/heads/dev", "dev"),
                ])
            })
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Dispatched { notifications: 1 });
        assert_eq!(notifier.requests()[0].target_branch.as_str(), "main");
    }

    #[test]
    fn missing_user_is_malformed() {
        let (dispatcher, notifier) = dispatcher(enabled_settings(), EligibilityFilterChain::new());
        let mut event = tag_event("alice");
        if let PlatformEvent::TagCreated(e) = &mut event {
            e.user = Some(PlatformUser {
                name: String::new(),
            });
        }

        let err = dispatcher
            .dispatch(Arc::new(event), |_| Ok(vec![target("pr/42/from", "v1.0")]))
            .unwrap_err();

        assert_eq!(err, HookError::missing("user.name"));
        assert!(notifier.requests().is_empty());
    }

    #[test]
    fn derivation_errors_propagate_without_submission() {
        let (dispatcher, notifier) = dispatcher(enabled_settings(), EligibilityFilterChain::new());

        let result = dispatcher.dispatch(Arc::new(tag_event("alice")), |_| {
            Err(HookError::missing("tag.latest_commit"))
        });

        assert!(result.is_err());
        assert!(notifier.requests().is_empty());
    }

    #[test]
    fn empty_target_list_notifies_nothing() {
        let (dispatcher, notifier) = dispatcher(enabled_settings(), EligibilityFilterChain::new());

        let outcome = dispatcher
            .dispatch(Arc::new(tag_event("alice")), |_| Ok(Vec::new()))
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::NothingToNotify);
        assert!(notifier.requests().is_empty());
    }
}
