//! Prescribed constraint outcomes for verify-mode evaluation.
//!
//! A harness that generates a task decides, per leaf, whether the predicate
//! should be observed true, observed false, or not checked at all. Verify
//! mode then reports both the precondition result and whether every
//! prescription was honored.

use std::collections::HashMap;

use actguard_core::ConstraintError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Constraint, LeafKey};

/// What a leaf's underlying predicate is prescribed to evaluate to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Prescription {
    /// `-1`: do not check.
    #[default]
    Unconstrained,
    /// `0`: must be observed false.
    False,
    /// `1`: must be observed true.
    True,
}

impl Prescription {
    /// Whether an observed predicate truth satisfies this prescription.
    pub fn accepts(self, observed: bool) -> bool {
        match self {
            Prescription::Unconstrained => true,
            Prescription::False => !observed,
            Prescription::True => observed,
        }
    }
}

impl TryFrom<i64> for Prescription {
    type Error = ConstraintError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Prescription::Unconstrained),
            0 => Ok(Prescription::False),
            1 => Ok(Prescription::True),
            other => Err(ConstraintError::InvalidPrescription(other)),
        }
    }
}

impl From<Prescription> for i64 {
    fn from(p: Prescription) -> Self {
        match p {
            Prescription::Unconstrained => -1,
            Prescription::False => 0,
            Prescription::True => 1,
        }
    }
}

impl From<bool> for Prescription {
    fn from(expected: bool) -> Self {
        if expected { Prescription::True } else { Prescription::False }
    }
}

/// Prescriptions keyed by canonical leaf.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintValues {
    values: HashMap<LeafKey, Prescription>,
}

impl ConstraintValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: LeafKey, prescription: Prescription) {
        self.values.insert(key, prescription);
    }

    /// Prescribe the leaf in a `single` constraint.
    ///
    /// Negation on the leaf is ignored: `X` and `not X` share one entry.
    pub fn prescribe(
        &mut self,
        leaf: &Constraint,
        prescription: Prescription,
    ) -> Result<(), ConstraintError> {
        match leaf {
            Constraint::Single(leaf) => {
                self.insert(leaf.key(), prescription);
                Ok(())
            }
            other => Err(ConstraintError::Parse(format!(
                "prescriptions attach to single constraints, got '{}'",
                other.tag()
            ))),
        }
    }

    /// Builder-style [`prescribe`](Self::prescribe).
    pub fn with(mut self, leaf: &Constraint, prescription: impl Into<Prescription>) -> Result<Self, ConstraintError> {
        self.prescribe(leaf, prescription.into())?;
        Ok(self)
    }

    /// The prescription for a key; unknown keys are unconstrained.
    pub fn get(&self, key: &LeafKey) -> Prescription {
        self.values.get(key).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Load `[[<single tuple>, value], ...]` pairs.
    ///
    /// ```text
    /// [[["single", "logged_in_user", {"username": "username"}], 1],
    ///  [["single", "sufficient_account_balance", {"username": "username", "amount": "amount"}], 0]]
    /// ```
    pub fn from_json(value: &Value) -> Result<Self, ConstraintError> {
        let pairs = value
            .as_array()
            .ok_or_else(|| ConstraintError::Parse(format!("constraint values must be a list, got {value}")))?;
        let mut values = Self::new();
        for pair in pairs {
            let (leaf, prescribed) = match pair.as_array().map(Vec::as_slice) {
                Some([leaf, prescribed]) => (leaf, prescribed),
                _ => {
                    return Err(ConstraintError::Parse(format!(
                        "expected [constraint, value] pair, got {pair}"
                    )));
                }
            };
            let prescribed = prescribed
                .as_i64()
                .ok_or_else(|| ConstraintError::Parse(format!("prescribed value must be an integer, got {prescribed}")))?;
            let leaf = Constraint::try_from(leaf.clone())?;
            values.prescribe(&leaf, Prescription::try_from(prescribed)?)?;
        }
        Ok(values)
    }
}

/// Result of verify-mode evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOutcome {
    /// What the standard evaluator would return.
    pub success: bool,
    /// Whether every prescribed leaf that was evaluated matched.
    pub constraints_followed: bool,
}

impl VerifyOutcome {
    pub fn new(success: bool, constraints_followed: bool) -> Self {
        Self {
            success,
            constraints_followed,
        }
    }
}
