//! Dependency constraints: declarative preconditions for domain actions.
//!
//! A tool-using agent calls actions on a domain (a bank, a hotel). Each
//! action may carry a precondition written as a small boolean expression
//! over named predicates:
//!
//! ```text
//! chain(logged_in_user(username=username),
//!       sufficient_account_balance(username=username, amount=amount))
//! ```
//!
//! Preconditions live in two registries per domain. The *innate* registry
//! is checked by the domain body itself; the *customizable* registry is
//! checked by a [`StrictWrapper`] before the body is reached.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐    ┌──────────────┐    ┌─────────────┐
//! │   Caller    │───▶│   Strict     │───▶│   Domain    │
//! │ (action +   │    │   Wrapper    │    │   body      │
//! │  inputs)    │    │ customizable │    │   innate    │
//! └─────────────┘    └──────────────┘    └─────────────┘
//!                          │                   │
//!                    ┌─────┴───────────────────┴─────┐
//!                    │ Evaluator → Resolver          │
//!                    │ tracker surface, body surface │
//!                    └───────────────────────────────┘
//! ```
//!
//! # Combinators
//!
//! | Form | Holds when | Short-circuits |
//! |------|-----------|----------------|
//! | `and(...)` | every child holds | no |
//! | `or(...)` | any child holds | no |
//! | `chain(...)` | every child holds | on first failure |
//! | `gate(...)` | any child holds | on first success |
//!
//! Leaves may be negated with a `not ` prefix, and parameters may bind a
//! caller input (`amount=amount`) or a literal (`unit="dollars"`).

pub mod domain;
pub mod engine;
pub mod model;
pub mod parser;
pub mod predicate;
pub mod registry;
pub mod verify;
pub mod wrapper;

pub use domain::{Domain, SessionEffect, StateTracker};
pub use engine::Evaluator;
pub use model::{Constraint, Leaf, LeafKey, ParamSource};
pub use parser::{parse_constraint, parse_literal};
pub use predicate::{PredicateFn, PredicateResult, PredicateSet, Resolution, Resolver, Surfaces};
pub use registry::{DependencyRegistry, Entry, Layer};
pub use verify::{ConstraintValues, Prescription, VerifyOutcome};
pub use wrapper::{CallRecord, StrictWrapper};
