//! Eligibility filters and the chain that aggregates them.
//!
//! Each [`EligibilityFilter`] looks at one [`EventContext`] and returns a
//! [`FilterVerdict`]. The [`EligibilityFilterChain`] folds those verdicts into
//! a single yes/no answer:
//!
//! - [`FilterVerdict::Ineligible`] vetoes delivery and stops evaluation.
//! - [`FilterVerdict::Eligible`] is recorded but later filters may still veto.
//! - [`FilterVerdict::Abstain`] defers to the remaining filters.
//!
//! When no filter vetoes, delivery is allowed. An empty chain therefore always
//! answers `true`.

mod filters;

use std::sync::Arc;

use tracing::debug;

use crate::EventContext;

pub use filters::{BranchFilter, EventKindFilter, IgnoreCommittersFilter};

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

/// Outcome of one filter over one context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    /// Explicit approval. Does not override a later veto.
    Eligible,
    /// Explicit veto. Stops the chain.
    Ineligible,
    /// No opinion.
    Abstain,
}

// ---------------------------------------------------------------------------
// Filter capability
// ---------------------------------------------------------------------------

/// A single, independent eligibility rule.
///
/// Filters must be side-effect free apart from logging, and must not share
/// mutable state with one another. They run synchronously on the platform's
/// event thread, so they must not block on I/O.
pub trait EligibilityFilter: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    /// Evaluates the filter against `context`.
    fn evaluate(&self, context: &EventContext) -> FilterVerdict;
}

/// Any `Fn(&EventContext) -> FilterVerdict` closure is a filter.
///
/// Handy for one-off rules registered at the composition root and for tests.
pub struct FnFilter<F> {
    name: &'static str,
    func: F,
}

impl<F> FnFilter<F>
where
    F: Fn(&EventContext) -> FilterVerdict + Send + Sync,
{
    /// Wraps `func` as a filter named `name`.
    pub fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> EligibilityFilter for FnFilter<F>
where
    F: Fn(&EventContext) -> FilterVerdict + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn evaluate(&self, context: &EventContext) -> FilterVerdict {
        (self.func)(context)
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// An ordered collection of filters answering "should this context notify?".
///
/// The chain owns no mutable state; it is shared between threads behind an
/// [`Arc`] and evaluated concurrently.
#[derive(Clone, Default)]
pub struct EligibilityFilterChain {
    filters: Vec<Arc<dyn EligibilityFilter>>,
}

impl EligibilityFilterChain {
    /// Creates an empty chain, which allows every notification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a chain evaluating `filters` in the given order.
    pub fn from_filters(filters: Vec<Arc<dyn EligibilityFilter>>) -> Self {
        Self { filters }
    }

    /// Appends `filter` to the end of the chain.
    pub fn with_filter(mut self, filter: impl EligibilityFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Number of registered filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns `true` if no filter is registered.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Returns `true` if a notification should be delivered for `context`.
    pub fn should_deliver_notification(&self, context: &EventContext) -> bool {
        for filter in &self.filters {
            match filter.evaluate(context) {
                FilterVerdict::Ineligible => {
                    debug!(
                        filter = filter.name(),
                        repository = %context.repository(),
                        user = %context.triggering_user(),
                        "Notification vetoed"
                    );
                    return false;
                }
                FilterVerdict::Eligible | FilterVerdict::Abstain => {}
            }
        }
        true
    }
}

impl std::fmt::Debug for EligibilityFilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.filters.iter().map(|filter| filter.name()))
            .finish()
    }
}
