//! The contract a domain implements so the engine can drive it.
//!
//! A domain is split in two halves that the strict wrapper owns side by
//! side: the body (data plus the actions that mutate it) and the state
//! tracker (who is logged in, what has been authenticated, and the policy
//! parameters fixed at construction). Predicates on either surface receive
//! both halves, so neither needs a back-reference to the other.

use actguard_core::{Args, ConstraintError, Outcome, Result};
use serde_json::Value;

use crate::engine::Evaluator;
use crate::predicate::Surfaces;
use crate::registry::DependencyRegistry;

/// Session mutator applied by the wrapper after an authenticating action
/// passes its customizable gate.
pub type SessionEffect<T> = fn(&mut T, &Args);

/// Session state of one wrapper.
///
/// Implementations mutate only through explicit `set_*` methods; the
/// wrapper clones the tracker to restore it when a body rejects an
/// authenticating action.
pub trait StateTracker: Clone {
    /// The policy parameters this tracker was built with.
    fn dependency_parameters(&self) -> Value;
}

/// A domain body.
pub trait Domain: Sized {
    type Tracker: StateTracker;

    /// Short name used in logs.
    const NAME: &'static str;

    /// Every action [`execute`](Self::execute) understands.
    const ACTIONS: &'static [&'static str];

    /// The body's own preconditions.
    fn innate(&self) -> &DependencyRegistry;

    /// Predicates exposed by the tracker and by this body.
    fn surfaces(&self) -> &Surfaces<Self, Self::Tracker>;

    /// The session mutator for an authenticating action, if any.
    fn session_effect(action: &str) -> Option<SessionEffect<Self::Tracker>>;

    /// Run an action. Implementations check [`innate_permits`](Self::innate_permits)
    /// before touching their data.
    fn execute(&mut self, tracker: &Self::Tracker, action: &str, args: &Args) -> Result<Outcome>;

    /// Full data dump for harnesses.
    fn snapshot(&self) -> Value;

    /// Evaluate the innate layer for `action`.
    fn innate_permits(
        &self,
        tracker: &Self::Tracker,
        action: &str,
        args: &Args,
    ) -> std::result::Result<bool, ConstraintError> {
        Evaluator::new(self, tracker, self.surfaces()).process(self.innate(), action, args)
    }

    /// Whether `action` is one of [`ACTIONS`](Self::ACTIONS).
    fn implements(action: &str) -> bool {
        Self::ACTIONS.contains(&action)
    }
}
