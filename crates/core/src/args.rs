//! Named inputs for actions and predicates.
//!
//! Every action is invoked with keyword-style inputs. The same type carries
//! the bound arguments handed to a predicate after a leaf's parameter mapping
//! has been applied.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DomainError;

/// An ordered set of named JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Args(Map<String, Value>);

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a named value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// String value, if present and a string.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Numeric value, if present and a number.
    pub fn f64(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(Value::as_f64)
    }

    /// Non-negative integer value, if present and representable.
    pub fn u64(&self, name: &str) -> Option<u64> {
        self.0.get(name).and_then(Value::as_u64)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(Value::as_bool)
    }

    /// Required string input for `action`.
    pub fn require_str(&self, action: &str, name: &str) -> Result<&str, DomainError> {
        self.str(name)
            .ok_or_else(|| invalid(action, name, self.get(name), "a string"))
    }

    /// Required numeric input for `action`.
    pub fn require_f64(&self, action: &str, name: &str) -> Result<f64, DomainError> {
        self.f64(name)
            .ok_or_else(|| invalid(action, name, self.get(name), "a number"))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

fn invalid(action: &str, name: &str, found: Option<&Value>, expected: &str) -> DomainError {
    let reason = match found {
        None => "missing".to_string(),
        Some(value) => format!("expected {expected}, got {value}"),
    };
    DomainError::InvalidArgument {
        action: action.into(),
        name: name.into(),
        reason,
    }
}

impl From<Map<String, Value>> for Args {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Args {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Args {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Build [`Args`] from `"name": value` pairs.
///
/// ```
/// let args = actguard_core::args! { "username": "alice", "amount": 50 };
/// assert_eq!(args.f64("amount"), Some(50.0));
/// ```
#[macro_export]
macro_rules! args {
    ($($name:literal : $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut args = $crate::Args::new();
        $( args.insert($name, $crate::__serde_json::json!($value)); )*
        args
    }};
}
