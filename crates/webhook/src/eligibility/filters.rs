//! Built-in filters driven by repository [`Settings`].

use std::sync::Arc;

use regex::Regex;
use tracing::{debug, warn};

use super::{EligibilityFilter, FilterVerdict};
use crate::{BranchMode, EventContext, Settings, SettingsService};

fn settings_for(service: &dyn SettingsService, context: &EventContext) -> Option<Settings> {
    service.get_settings(context.repository())
}

// ---------------------------------------------------------------------------

/// Vetoes events caused by users on the repository's ignore list.
pub struct IgnoreCommittersFilter {
    settings: Arc<dyn SettingsService>,
}

impl IgnoreCommittersFilter {
    /// Creates the filter over `settings`.
    pub fn new(settings: Arc<dyn SettingsService>) -> Self {
        Self { settings }
    }
}

impl EligibilityFilter for IgnoreCommittersFilter {
    fn name(&self) -> &'static str {
        "ignore-committers"
    }

    fn evaluate(&self, context: &EventContext) -> FilterVerdict {
        let Some(settings) = settings_for(self.settings.as_ref(), context) else {
            return FilterVerdict::Abstain;
        };

        let user = context.triggering_user();
        if settings.ignore_committers.iter().any(|ignored| ignored == user) {
            debug!(%user, repository = %context.repository(), "Ignoring event from ignored committer");
            FilterVerdict::Ineligible
        } else {
            FilterVerdict::Abstain
        }
    }
}

// ---------------------------------------------------------------------------

/// Applies the repository's branch allow-list or deny-list to the target branch.
///
/// Abstains when no branch options are configured or the context carries no
/// target branch.
pub struct BranchFilter {
    settings: Arc<dyn SettingsService>,
}

impl BranchFilter {
    /// Creates the filter over `settings`.
    pub fn new(settings: Arc<dyn SettingsService>) -> Self {
        Self { settings }
    }
}

/// Compiles a branch glob into an anchored regex. `*` is the only wildcard.
fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let escaped = regex::escape(pattern.trim()).replace(r"\*", ".*");
    Regex::new(&format!("^{escaped}$"))
}

fn matches_any(patterns: &[String], branch: &str) -> bool {
    patterns.iter().any(|pattern| match glob_to_regex(pattern) {
        Ok(re) => re.is_match(branch),
        Err(e) => {
            warn!(pattern = %pattern, error = %e, "Skipping unusable branch pattern");
            false
        }
    })
}

impl EligibilityFilter for BranchFilter {
    fn name(&self) -> &'static str {
        "branch"
    }

    fn evaluate(&self, context: &EventContext) -> FilterVerdict {
        let Some(branch) = context.target_branch() else {
            return FilterVerdict::Abstain;
        };
        let Some(options) =
            settings_for(self.settings.as_ref(), context).and_then(|s| s.branch_options)
        else {
            return FilterVerdict::Abstain;
        };

        let matched = matches_any(&options.patterns, branch.as_str());
        let verdict = match (options.mode, matched) {
            (BranchMode::Allow, false) | (BranchMode::Deny, true) => FilterVerdict::Ineligible,
            (BranchMode::Allow, true) | (BranchMode::Deny, false) => FilterVerdict::Abstain,
        };

        if verdict == FilterVerdict::Ineligible {
            debug!(%branch, mode = ?options.mode, "Branch excluded from notifications");
        }
        verdict
    }
}

// ---------------------------------------------------------------------------

/// Vetoes event kinds the repository has not opted into.
pub struct EventKindFilter {
    settings: Arc<dyn SettingsService>,
}

impl EventKindFilter {
    /// Creates the filter over `settings`.
    pub fn new(settings: Arc<dyn SettingsService>) -> Self {
        Self { settings }
    }
}

impl EligibilityFilter for EventKindFilter {
    fn name(&self) -> &'static str {
        "event-kind"
    }

    fn evaluate(&self, context: &EventContext) -> FilterVerdict {
        let Some(settings) = settings_for(self.settings.as_ref(), context) else {
            return FilterVerdict::Abstain;
        };

        let kind = context.event().kind();
        if settings.trigger_on.is_empty() || settings.trigger_on.contains(&kind) {
            FilterVerdict::Abstain
        } else {
            debug!(%kind, repository = %context.repository(), "Event kind not enabled");
            FilterVerdict::Ineligible
        }
    }
}
