//! Dependency registries: the catalog of actions and their preconditions.
//!
//! Each domain owns two registries that are never merged: the *innate* one,
//! consulted by the domain body before it mutates its own data, and the
//! *customizable* one, consulted by the strict wrapper before the body is
//! reached. A registry is closed-world: an action that is not registered
//! cannot be performed.

use std::collections::BTreeMap;

use actguard_core::ConstraintError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::Constraint;

/// Which layer a registry belongs to. Used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Innate,
    Customizable,
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layer::Innate => write!(f, "innate"),
            Layer::Customizable => write!(f, "customizable"),
        }
    }
}

/// Result of looking an action up in a registry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entry<'a> {
    /// The action is not in the catalog.
    Unregistered,
    /// Registered without a precondition.
    Unconstrained,
    Constrained(&'a Constraint),
}

/// Mapping from action name to an optional constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, Value>", into = "BTreeMap<String, Value>")]
pub struct DependencyRegistry {
    entries: BTreeMap<String, Option<Constraint>>,
}

impl DependencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) an action's precondition.
    pub fn register(&mut self, action: impl Into<String>, constraint: Option<Constraint>) {
        self.entries.insert(action.into(), constraint);
    }

    /// Builder-style registration of a constrained action.
    pub fn with(mut self, action: impl Into<String>, constraint: Constraint) -> Self {
        self.register(action, Some(constraint));
        self
    }

    /// Builder-style registration of an action with no precondition.
    pub fn with_unconstrained(mut self, action: impl Into<String>) -> Self {
        self.register(action, None);
        self
    }

    /// Remove an action.  Returns `true` if it was registered.
    pub fn remove(&mut self, action: &str) -> bool {
        self.entries.remove(action).is_some()
    }

    pub fn entry(&self, action: &str) -> Entry<'_> {
        match self.entries.get(action) {
            None => Entry::Unregistered,
            Some(None) => Entry::Unconstrained,
            Some(Some(constraint)) => Entry::Constrained(constraint),
        }
    }

    pub fn contains(&self, action: &str) -> bool {
        self.entries.contains_key(action)
    }

    /// Registered action names, sorted.
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace entries with those from `overrides`.
    ///
    /// Actions absent from `overrides` keep their current constraint.
    pub fn apply_overrides(&mut self, overrides: DependencyRegistry) {
        self.entries.extend(overrides.entries);
    }

    /// Load from a TOML table of `action = "<constraint text>"`.
    ///
    /// An empty string registers the action without a precondition.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConstraintError> {
        let table: BTreeMap<String, Value> =
            toml::from_str(toml_str).map_err(|e| ConstraintError::Parse(e.to_string()))?;
        Self::try_from(table)
    }

    /// Load from a JSON object of action → tagged tuple (or constraint text).
    pub fn from_json(value: &Value) -> Result<Self, ConstraintError> {
        let object = value
            .as_object()
            .ok_or_else(|| ConstraintError::Parse(format!("registry must be an object, got {value}")))?;
        let mut registry = Self::new();
        for (action, constraint) in object {
            registry.register(action.clone(), Constraint::from_value(constraint)?);
        }
        Ok(registry)
    }

    /// Parse every `action → text` pair with the constraint syntax.
    pub fn from_text_entries<'a>(
        entries: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> Result<Self, ConstraintError> {
        let mut registry = Self::new();
        for (action, text) in entries {
            registry.register(action.clone(), crate::parse_constraint(text)?);
        }
        Ok(registry)
    }

    /// Check the catalog against what a domain actually exposes.
    ///
    /// `has_action` answers whether the domain body implements an action;
    /// pass `None` to skip that check (innate registries may name actions
    /// that only exist as internal helpers). `has_predicate` answers whether
    /// a predicate name is exposed by the tracker or the body.
    pub fn validate(
        &self,
        has_action: Option<&dyn Fn(&str) -> bool>,
        has_predicate: &dyn Fn(&str) -> bool,
    ) -> Result<(), ConstraintError> {
        for (action, constraint) in &self.entries {
            if let Some(has_action) = has_action {
                if !has_action(action) {
                    return Err(ConstraintError::UnknownAction(action.clone()));
                }
            }
            let Some(constraint) = constraint else {
                continue;
            };
            for leaf in constraint.leaves() {
                if !has_predicate(&leaf.predicate) {
                    return Err(ConstraintError::UnknownPredicate {
                        action: action.clone(),
                        predicate: leaf.predicate.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl TryFrom<BTreeMap<String, Value>> for DependencyRegistry {
    type Error = ConstraintError;

    fn try_from(table: BTreeMap<String, Value>) -> Result<Self, Self::Error> {
        let mut registry = Self::new();
        for (action, value) in table {
            let constraint = Constraint::from_value(&value)?;
            registry.register(action, constraint);
        }
        Ok(registry)
    }
}

impl From<DependencyRegistry> for BTreeMap<String, Value> {
    fn from(registry: DependencyRegistry) -> Self {
        registry
            .entries
            .into_iter()
            .map(|(action, constraint)| {
                // Text form keeps the table readable as TOML.
                let text = constraint.map(|c| c.to_string()).unwrap_or_default();
                (action, Value::String(text))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_distinguishes_missing_from_unconstrained() {
        let registry = DependencyRegistry::new()
            .with_unconstrained("logout_user")
            .with("get_account_balance", Constraint::single("logged_in_user", &[("username", "username")]));

        assert_eq!(registry.entry("logout_user"), Entry::Unconstrained);
        assert!(matches!(registry.entry("get_account_balance"), Entry::Constrained(_)));
        assert_eq!(registry.entry("launch_rocket"), Entry::Unregistered);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn registry_from_toml() {
        let toml = r#"
login_user = ""
transfer_funds = "chain(logged_in_user(username=username), sufficient_account_balance(username=username, amount=amount))"
"#;
        let registry = DependencyRegistry::from_toml(toml).unwrap();
        assert_eq!(registry.entry("login_user"), Entry::Unconstrained);
        let Entry::Constrained(constraint) = registry.entry("transfer_funds") else {
            panic!("transfer_funds should be constrained");
        };
        assert_eq!(constraint.tag(), "chain");
        assert_eq!(constraint.leaves().len(), 2);
    }

    #[test]
    fn registry_from_json_tuples() {
        let value = json!({
            "deposit_funds": ["single", "logged_in_user", {"username": "username"}],
            "ping": null,
        });
        let registry = DependencyRegistry::from_json(&value).unwrap();
        assert!(matches!(registry.entry("deposit_funds"), Entry::Constrained(_)));
        assert_eq!(registry.entry("ping"), Entry::Unconstrained);
    }

    #[test]
    fn invalid_tag_in_table_is_reported() {
        let value = json!({"deposit_funds": ["xor", []]});
        assert_eq!(
            DependencyRegistry::from_json(&value).unwrap_err(),
            ConstraintError::InvalidOption("xor".into())
        );
    }

    #[test]
    fn overrides_replace_only_named_actions() {
        let mut base = DependencyRegistry::new()
            .with("a", Constraint::single("p", &[]))
            .with("b", Constraint::single("q", &[]));
        let overrides = DependencyRegistry::new().with_unconstrained("b");
        base.apply_overrides(overrides);

        assert!(matches!(base.entry("a"), Entry::Constrained(_)));
        assert_eq!(base.entry("b"), Entry::Unconstrained);
    }

    #[test]
    fn serde_roundtrip_through_toml() {
        let registry = DependencyRegistry::new()
            .with_unconstrained("logout_user")
            .with("deposit_funds", Constraint::single("not frozen", &[("username", "username")]));
        let text = toml::to_string(&registry).unwrap();
        let back: DependencyRegistry = toml::from_str(&text).unwrap();
        assert_eq!(back, registry);
    }

    #[test]
    fn validate_reports_unknown_names() {
        let registry = DependencyRegistry::new().with(
            "deposit_funds",
            Constraint::and([Constraint::single("known", &[]), Constraint::single("not mystery", &[])]),
        );

        let has_predicate = |name: &str| name == "known";
        let err = registry.validate(None, &has_predicate).unwrap_err();
        assert_eq!(
            err,
            ConstraintError::UnknownPredicate {
                action: "deposit_funds".into(),
                predicate: "mystery".into(),
            }
        );

        let everything = |_: &str| true;
        let no_actions = |_: &str| false;
        assert_eq!(
            registry.validate(Some(&no_actions), &everything).unwrap_err(),
            ConstraintError::UnknownAction("deposit_funds".into())
        );
        assert!(registry.validate(Some(&everything), &everything).is_ok());
    }
}
