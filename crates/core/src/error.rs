//! Error types for actguard.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.
//!
//! Denials are not errors: a failed precondition is an ordinary
//! [`Outcome::Denied`](crate::Outcome::Denied). Errors are reserved for
//! structural problems that make a call meaningless.

use thiserror::Error;

/// The top-level error type for all actguard operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Constraint language ---
    #[error("Constraint error: {0}")]
    Constraint(#[from] ConstraintError),

    // --- Domain bodies ---
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Errors raised while building or evaluating constraint trees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    /// A combinator tag outside `single`/`and`/`or`/`chain`/`gate`.
    #[error("invalid constraint option: {0}")]
    InvalidOption(String),

    #[error("constraint parse error: {0}")]
    Parse(String),

    /// A leaf maps a parameter to an input the caller did not supply.
    #[error("predicate '{predicate}' needs input '{source_name}' which was not provided")]
    MissingArgument {
        predicate: String,
        source_name: String,
    },

    #[error("prescribed constraint value must be -1, 0 or 1, got {0}")]
    InvalidPrescription(i64),

    #[error("predicate '{predicate}' referenced by '{action}' is not exposed by the tracker or the domain")]
    UnknownPredicate { action: String, predicate: String },

    #[error("action '{0}' is registered but the domain does not implement it")]
    UnknownAction(String),
}

/// Errors raised by domain bodies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid argument '{name}' for '{action}': {reason}")]
    InvalidArgument {
        action: String,
        name: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_option_names_the_tag() {
        let err = Error::Constraint(ConstraintError::InvalidOption("xor".into()));
        assert!(err.to_string().contains("invalid constraint option"));
        assert!(err.to_string().contains("xor"));
    }

    #[test]
    fn missing_argument_displays_both_names() {
        let err = ConstraintError::MissingArgument {
            predicate: "logged_in_user".into(),
            source_name: "username".into(),
        };
        let text = err.to_string();
        assert!(text.contains("logged_in_user"));
        assert!(text.contains("username"));
    }

    #[test]
    fn domain_error_converts_into_top_level() {
        let err: Error = DomainError::InvalidArgument {
            action: "deposit_funds".into(),
            name: "amount".into(),
            reason: "expected a number".into(),
        }
        .into();
        assert!(matches!(err, Error::Domain(_)));
    }
}
