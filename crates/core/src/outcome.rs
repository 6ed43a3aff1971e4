//! The result shape of every domain action.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Either a denial or the value an action produced.
///
/// Callers see the same `Denied` whether a precondition failed or the action
/// does not exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Outcome<T = Value> {
    Denied,
    Allowed(T),
}

impl<T> Outcome<T> {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Outcome::Allowed(_))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Outcome::Denied)
    }

    /// The produced value, discarding a denial.
    pub fn allowed(self) -> Option<T> {
        match self {
            Outcome::Allowed(value) => Some(value),
            Outcome::Denied => None,
        }
    }

    pub fn as_ref(&self) -> Outcome<&T> {
        match self {
            Outcome::Allowed(value) => Outcome::Allowed(value),
            Outcome::Denied => Outcome::Denied,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Allowed(value) => Outcome::Allowed(f(value)),
            Outcome::Denied => Outcome::Denied,
        }
    }

    /// The `(ok, value)` pair form.
    pub fn into_pair(self) -> (bool, Option<T>) {
        match self {
            Outcome::Allowed(value) => (true, Some(value)),
            Outcome::Denied => (false, None),
        }
    }
}

impl<T: Serialize> Outcome<T> {
    /// Erase the value type for uniform dispatch.
    pub fn into_value(self) -> Result<Outcome<Value>, serde_json::Error> {
        match self {
            Outcome::Allowed(value) => Ok(Outcome::Allowed(serde_json::to_value(value)?)),
            Outcome::Denied => Ok(Outcome::Denied),
        }
    }
}

impl From<bool> for Outcome<()> {
    fn from(ok: bool) -> Self {
        if ok { Outcome::Allowed(()) } else { Outcome::Denied }
    }
}
