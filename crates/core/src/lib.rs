//! # actguard Core
//!
//! Shared vocabulary for the actguard dependency engine: the named inputs an
//! action is called with ([`Args`]), the result shape every action returns
//! ([`Outcome`]), and the error taxonomy.
//!
//! ## Design Philosophy
//!
//! Nothing here knows about constraints or domains. The engine crate
//! (`actguard-deps`) and the domain catalog (`actguard-domains`) both depend
//! inward on these types, so a domain body can be written and tested without
//! pulling in the evaluator.

pub mod args;
pub mod error;
pub mod outcome;

pub use args::Args;
pub use error::{ConstraintError, DomainError, Error, Result};
pub use outcome::Outcome;

#[doc(hidden)]
pub use serde_json as __serde_json;
