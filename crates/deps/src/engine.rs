//! Constraint evaluation.
//!
//! The [`Evaluator`] answers two questions about an action's precondition:
//! does it hold ([`Evaluator::process`]), and, given a table of prescribed
//! leaf outcomes, was each prescription honored while computing that answer
//! ([`Evaluator::process_verify`]).
//!
//! Child order is declaration order. `chain` and `gate` stop as soon as the
//! answer is known, so later predicates are not called; `and` and `or` call
//! every child exactly once.

use actguard_core::{Args, ConstraintError};
use tracing::{debug, warn};

use crate::model::{Constraint, Leaf};
use crate::predicate::{Resolution, Resolver, Surfaces};
use crate::registry::{DependencyRegistry, Entry};
use crate::verify::{ConstraintValues, Prescription, VerifyOutcome};

/// Evaluates constraints against one body and tracker.
///
/// Borrows everything it reads, so it is cheap to build per call.
pub struct Evaluator<'a, B, T> {
    resolver: Resolver<'a, B, T>,
}

impl<'a, B, T> Evaluator<'a, B, T> {
    pub fn new(body: &'a B, tracker: &'a T, surfaces: &'a Surfaces<B, T>) -> Self {
        Self {
            resolver: Resolver::new(body, tracker, surfaces),
        }
    }

    /// Whether `action` may proceed under `registry`.
    ///
    /// Unregistered actions never proceed; registered actions without a
    /// constraint always do.
    pub fn process(
        &self,
        registry: &DependencyRegistry,
        action: &str,
        args: &Args,
    ) -> Result<bool, ConstraintError> {
        match registry.entry(action) {
            Entry::Unregistered => {
                warn!(action, "Action is not registered");
                Ok(false)
            }
            Entry::Unconstrained => Ok(true),
            Entry::Constrained(constraint) => {
                let holds = self.evaluate(Some(constraint), args)?;
                debug!(action, holds, "Evaluated dependencies");
                Ok(holds)
            }
        }
    }

    /// Evaluate a constraint; `None` holds trivially.
    pub fn evaluate(&self, constraint: Option<&Constraint>, args: &Args) -> Result<bool, ConstraintError> {
        match constraint {
            None => Ok(true),
            Some(node) => self.eval_node(node, args),
        }
    }

    fn eval_node(&self, node: &Constraint, args: &Args) -> Result<bool, ConstraintError> {
        match node {
            Constraint::Single(leaf) => self.eval_leaf(leaf, args),
            Constraint::And(children) => {
                let mut all = true;
                for child in children {
                    all &= self.eval_node(child, args)?;
                }
                Ok(all)
            }
            Constraint::Or(children) => {
                let mut any = false;
                for child in children {
                    any |= self.eval_node(child, args)?;
                }
                Ok(any)
            }
            Constraint::Chain(children) => {
                for child in children {
                    if !self.eval_node(child, args)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Constraint::Gate(children) => {
                for child in children {
                    if self.eval_node(child, args)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn eval_leaf(&self, leaf: &Leaf, args: &Args) -> Result<bool, ConstraintError> {
        match self.resolver.resolve(leaf, args) {
            Resolution::Holds(holds) => Ok(holds != leaf.negated),
            Resolution::Unknown => Ok(false),
            Resolution::MissingInput(source_name) => Err(ConstraintError::MissingArgument {
                predicate: leaf.predicate.clone(),
                source_name,
            }),
        }
    }

    // ── Verify mode ────────────────────────────────────────────────

    /// Verify-mode counterpart of [`process`](Self::process).
    ///
    /// An unregistered action yields `(false, true)`: it fails, and no
    /// prescription was contradicted.
    pub fn process_verify(
        &self,
        registry: &DependencyRegistry,
        action: &str,
        args: &Args,
        values: &ConstraintValues,
    ) -> VerifyOutcome {
        let outcome = match registry.entry(action) {
            Entry::Unregistered => VerifyOutcome::new(false, true),
            Entry::Unconstrained => VerifyOutcome::new(true, true),
            Entry::Constrained(constraint) => self.verify(Some(constraint), args, values),
        };
        debug!(
            action,
            success = outcome.success,
            constraints_followed = outcome.constraints_followed,
            "Verified dependencies"
        );
        outcome
    }

    /// Evaluate a constraint while checking prescribed leaf outcomes.
    pub fn verify(&self, constraint: Option<&Constraint>, args: &Args, values: &ConstraintValues) -> VerifyOutcome {
        match constraint {
            None => VerifyOutcome::new(true, true),
            Some(node) => self.verify_node(node, args, values),
        }
    }

    fn verify_node(&self, node: &Constraint, args: &Args, values: &ConstraintValues) -> VerifyOutcome {
        match node {
            Constraint::Single(leaf) => self.verify_leaf(leaf, args, values),
            Constraint::And(children) => {
                let mut out = VerifyOutcome::new(true, true);
                for child in children {
                    let r = self.verify_node(child, args, values);
                    out.success &= r.success;
                    out.constraints_followed &= r.constraints_followed;
                }
                out
            }
            Constraint::Or(children) => {
                let mut out = VerifyOutcome::new(false, true);
                for child in children {
                    let r = self.verify_node(child, args, values);
                    out.success |= r.success;
                    out.constraints_followed &= r.constraints_followed;
                }
                out
            }
            Constraint::Chain(children) => {
                let mut followed = true;
                for child in children {
                    let r = self.verify_node(child, args, values);
                    followed &= r.constraints_followed;
                    if !r.success {
                        return VerifyOutcome::new(false, followed);
                    }
                }
                VerifyOutcome::new(true, followed)
            }
            Constraint::Gate(children) => {
                let mut followed = true;
                for child in children {
                    let r = self.verify_node(child, args, values);
                    followed &= r.constraints_followed;
                    if r.success {
                        return VerifyOutcome::new(true, followed);
                    }
                }
                VerifyOutcome::new(false, followed)
            }
        }
    }

    fn verify_leaf(&self, leaf: &Leaf, args: &Args, values: &ConstraintValues) -> VerifyOutcome {
        let prescription = values.get(&leaf.key());
        match self.resolver.resolve(leaf, args) {
            Resolution::Holds(observed) => {
                VerifyOutcome::new(observed != leaf.negated, prescription.accepts(observed))
            }
            // Read as an observed false.
            Resolution::MissingInput(_) => {
                VerifyOutcome::new(leaf.negated, prescription.accepts(false))
            }
            Resolution::Unknown => VerifyOutcome::new(
                false,
                prescription == Prescription::Unconstrained,
            ),
        }
    }
}
