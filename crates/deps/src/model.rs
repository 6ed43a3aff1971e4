//! Constraint data model: the trees that declare action preconditions.
//!
//! A constraint is either a leaf naming a predicate or one of four
//! combinators over child constraints:
//!
//! | Node    | Holds when           | Evaluates every child |
//! |---------|----------------------|-----------------------|
//! | `and`   | all children hold    | yes                   |
//! | `or`    | any child holds      | yes                   |
//! | `chain` | all children hold    | stops at first false  |
//! | `gate`  | any child holds      | stops at first true   |
//!
//! The absence of a constraint (`None`) means "no precondition".
//!
//! Besides the Rust builders, constraints can be read from the tagged-tuple
//! JSON form used by dependency tables:
//!
//! ```text
//! ["chain", [
//!     ["single", "logged_in_user", {"username": "username"}],
//!     ["single", "not internal_is_frozen", {"username": "username", "strict": "value true"}]
//! ]]
//! ```

use std::collections::BTreeMap;
use std::fmt;

use actguard_core::ConstraintError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Prefix that negates a predicate name in textual forms.
pub const NEGATION_PREFIX: &str = "not ";

/// Prefix that marks an inline literal in the tagged-tuple form.
pub const LITERAL_PREFIX: &str = "value ";

/// A constraint tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum Constraint {
    Single(Leaf),
    And(Vec<Constraint>),
    Or(Vec<Constraint>),
    Chain(Vec<Constraint>),
    Gate(Vec<Constraint>),
}

/// A predicate reference with its parameter mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    /// Predicate name with any negation prefix removed.
    pub predicate: String,
    /// Whether the predicate's result is inverted.
    pub negated: bool,
    /// Formal parameter name → where its value comes from.
    pub params: BTreeMap<String, ParamSource>,
}

/// Where a predicate argument comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSource {
    /// A named input of the action call.
    Input(String),
    /// A constant written into the dependency table.
    Literal(Value),
}

impl Leaf {
    /// Create a leaf, reading a leading `"not "` as negation.
    pub fn new(name: &str) -> Self {
        let (predicate, negated) = match name.strip_prefix(NEGATION_PREFIX) {
            Some(stripped) => (stripped, true),
            None => (name, false),
        };
        Self {
            predicate: predicate.to_string(),
            negated,
            params: BTreeMap::new(),
        }
    }

    /// Bind `formal` to the action input named `source`.
    pub fn input(mut self, formal: impl Into<String>, source: impl Into<String>) -> Self {
        self.params
            .insert(formal.into(), ParamSource::Input(source.into()));
        self
    }

    /// Bind `formal` to a constant.
    pub fn literal(mut self, formal: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params
            .insert(formal.into(), ParamSource::Literal(value.into()));
        self
    }

    /// The canonical key shared by this leaf and its negation.
    pub fn key(&self) -> LeafKey {
        LeafKey {
            predicate: self.predicate.clone(),
            params: self
                .params
                .iter()
                .map(|(formal, source)| (formal.clone(), source.canonical()))
                .collect(),
        }
    }

    /// The name as written, including the negation prefix.
    pub fn written_name(&self) -> String {
        if self.negated {
            format!("{NEGATION_PREFIX}{}", self.predicate)
        } else {
            self.predicate.clone()
        }
    }
}

impl ParamSource {
    /// String form used in canonical keys and the tagged-tuple encoding.
    fn canonical(&self) -> String {
        match self {
            ParamSource::Input(name) => name.clone(),
            ParamSource::Literal(value) => format!("{LITERAL_PREFIX}{value}"),
        }
    }
}

impl From<Leaf> for Constraint {
    fn from(leaf: Leaf) -> Self {
        Constraint::Single(leaf)
    }
}

impl Constraint {
    /// Leaf whose parameters all come from action inputs.
    pub fn single(name: &str, params: &[(&str, &str)]) -> Self {
        let leaf = params
            .iter()
            .fold(Leaf::new(name), |leaf, (formal, source)| {
                leaf.input(*formal, *source)
            });
        Constraint::Single(leaf)
    }

    pub fn and(children: impl IntoIterator<Item = Constraint>) -> Self {
        Constraint::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = Constraint>) -> Self {
        Constraint::Or(children.into_iter().collect())
    }

    pub fn chain(children: impl IntoIterator<Item = Constraint>) -> Self {
        Constraint::Chain(children.into_iter().collect())
    }

    pub fn gate(children: impl IntoIterator<Item = Constraint>) -> Self {
        Constraint::Gate(children.into_iter().collect())
    }

    /// The node's tag as written in dependency tables.
    pub fn tag(&self) -> &'static str {
        match self {
            Constraint::Single(_) => "single",
            Constraint::And(_) => "and",
            Constraint::Or(_) => "or",
            Constraint::Chain(_) => "chain",
            Constraint::Gate(_) => "gate",
        }
    }

    /// Child constraints (empty for a leaf).
    pub fn children(&self) -> &[Constraint] {
        match self {
            Constraint::Single(_) => &[],
            Constraint::And(c) | Constraint::Or(c) | Constraint::Chain(c) | Constraint::Gate(c) => c,
        }
    }

    /// All leaves in declaration order.
    pub fn leaves(&self) -> Vec<&Leaf> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Leaf>) {
        match self {
            Constraint::Single(leaf) => out.push(leaf),
            other => {
                for child in other.children() {
                    child.collect_leaves(out);
                }
            }
        }
    }

    /// Read a constraint from its tagged-tuple JSON form.
    ///
    /// `null`, `[]` and `""` are the empty constraint. A JSON string is read
    /// as the text syntax of [`parse_constraint`](crate::parse_constraint).
    pub fn from_value(value: &Value) -> Result<Option<Constraint>, ConstraintError> {
        match value {
            Value::Null => Ok(None),
            Value::Array(items) if items.is_empty() => Ok(None),
            Value::String(text) => crate::parse_constraint(text),
            other => node_from_value(other).map(Some),
        }
    }

    /// Encode as the tagged-tuple JSON form.
    pub fn to_value(&self) -> Value {
        match self {
            Constraint::Single(leaf) => {
                let mapping: serde_json::Map<String, Value> = leaf
                    .params
                    .iter()
                    .map(|(formal, source)| (formal.clone(), Value::String(source.canonical())))
                    .collect();
                Value::Array(vec![
                    Value::String("single".into()),
                    Value::String(leaf.written_name()),
                    Value::Object(mapping),
                ])
            }
            other => Value::Array(vec![
                Value::String(other.tag().into()),
                Value::Array(other.children().iter().map(Constraint::to_value).collect()),
            ]),
        }
    }
}

fn node_from_value(value: &Value) -> Result<Constraint, ConstraintError> {
    let items = value
        .as_array()
        .filter(|items| !items.is_empty())
        .ok_or_else(|| ConstraintError::Parse(format!("expected a tagged tuple, got {value}")))?;
    let tag = items[0]
        .as_str()
        .ok_or_else(|| ConstraintError::Parse(format!("constraint tag must be a string, got {}", items[0])))?;

    if tag == "single" {
        return leaf_from_items(&items[1..]).map(Constraint::Single);
    }

    let build: fn(Vec<Constraint>) -> Constraint = match tag {
        "and" => Constraint::And,
        "or" => Constraint::Or,
        "chain" => Constraint::Chain,
        "gate" => Constraint::Gate,
        unknown => return Err(ConstraintError::InvalidOption(unknown.to_string())),
    };

    let children = match items.get(1) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(children)) => children
            .iter()
            .map(node_from_value)
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(ConstraintError::Parse(format!(
                "children of '{tag}' must be a list, got {other}"
            )));
        }
    };
    Ok(build(children))
}

fn leaf_from_items(items: &[Value]) -> Result<Leaf, ConstraintError> {
    let name = items
        .first()
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ConstraintError::Parse("single constraint needs a predicate name".into()))?;
    let mut leaf = Leaf::new(name);

    match items.get(1) {
        None | Some(Value::Null) => {}
        Some(Value::Object(mapping)) => {
            for (formal, source) in mapping {
                leaf = match source {
                    Value::String(text) => match text.strip_prefix(LITERAL_PREFIX) {
                        Some(literal) => leaf.literal(formal.clone(), crate::parser::parse_literal(literal)?),
                        None => leaf.input(formal.clone(), text.clone()),
                    },
                    // Structured literals need no escape.
                    other => leaf.literal(formal.clone(), other.clone()),
                };
            }
        }
        Some(other) => {
            return Err(ConstraintError::Parse(format!(
                "parameter mapping of '{name}' must be an object, got {other}"
            )));
        }
    }
    Ok(leaf)
}

impl TryFrom<Value> for Constraint {
    type Error = ConstraintError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Constraint::from_value(&value)?
            .ok_or_else(|| ConstraintError::Parse("empty constraint where a node is required".into()))
    }
}

impl From<Constraint> for Value {
    fn from(constraint: Constraint) -> Self {
        constraint.to_value()
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Single(leaf) => write!(f, "{leaf}"),
            other => {
                write!(f, "{}(", other.tag())?;
                for (i, child) in other.children().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.written_name())?;
        if self.params.is_empty() {
            return Ok(());
        }
        write!(f, "(")?;
        for (i, (formal, source)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match source {
                ParamSource::Input(name) => write!(f, "{formal}={name}")?,
                ParamSource::Literal(value) => write!(f, "{formal}={value}")?,
            }
        }
        write!(f, ")")
    }
}

// ─── Canonical keys ──────────────────────────────────────────────────

/// Hashable identity of a leaf, ignoring negation.
///
/// Parameters are kept sorted by formal name with sources rendered as
/// strings, so two mappings with the same pairs produce equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeafKey {
    pub predicate: String,
    pub params: Vec<(String, String)>,
}

impl LeafKey {
    /// Stable SHA-256 hex digest of the canonical rendering.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.to_string().as_bytes());
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for LeafKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "single|{}", self.predicate)?;
        for (formal, source) in &self.params {
            write!(f, "|{formal}={source}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leaf_strips_single_negation() {
        let leaf = Leaf::new("not internal_check_username_exist");
        assert_eq!(leaf.predicate, "internal_check_username_exist");
        assert!(leaf.negated);
        assert_eq!(leaf.written_name(), "not internal_check_username_exist");

        let plain = Leaf::new("logged_in_user");
        assert!(!plain.negated);
    }

    #[test]
    fn negated_and_plain_share_a_key() {
        let a = Leaf::new("logged_in_user").input("username", "username");
        let b = Leaf::new("not logged_in_user").input("username", "username");
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().fingerprint(), b.key().fingerprint());
    }

    #[test]
    fn key_ignores_insertion_order() {
        let a = Leaf::new("p").input("x", "a").input("y", "b");
        let b = Leaf::new("p").input("y", "b").input("x", "a");
        assert_eq!(a.key(), b.key());
        let other = Leaf::new("p").input("x", "b").input("y", "a");
        assert_ne!(a.key(), other.key());
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = Leaf::new("p").input("x", "a").key().fingerprint();
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn reads_tagged_tuple_form() {
        let value = json!(["chain", [
            ["single", "logged_in_user", {"username": "username"}],
            ["single", "not over_limit", {"limit": "value 3", "who": "username"}]
        ]]);
        let constraint = Constraint::from_value(&value).unwrap().unwrap();
        let leaves = constraint.leaves();
        assert_eq!(constraint.tag(), "chain");
        assert_eq!(leaves.len(), 2);
        assert!(leaves[1].negated);
        assert_eq!(leaves[1].params["limit"], ParamSource::Literal(json!(3)));
        assert_eq!(leaves[1].params["who"], ParamSource::Input("username".into()));
    }

    #[test]
    fn empty_forms_mean_no_constraint() {
        assert_eq!(Constraint::from_value(&Value::Null).unwrap(), None);
        assert_eq!(Constraint::from_value(&json!([])).unwrap(), None);
        assert_eq!(Constraint::from_value(&json!("")).unwrap(), None);
    }

    #[test]
    fn unknown_tag_is_invalid_option() {
        let err = Constraint::from_value(&json!(["xor", []])).unwrap_err();
        assert_eq!(err, ConstraintError::InvalidOption("xor".into()));

        let nested = json!(["and", [["nand", []]]]);
        assert!(matches!(
            Constraint::from_value(&nested),
            Err(ConstraintError::InvalidOption(tag)) if tag == "nand"
        ));
    }

    #[test]
    fn tagged_tuple_survives_encoding() {
        let constraint = Constraint::gate([
            Constraint::single("a", &[("x", "x")]),
            Leaf::new("not b").literal("n", 2).into(),
        ]);
        let decoded = Constraint::from_value(&constraint.to_value()).unwrap().unwrap();
        assert_eq!(decoded, constraint);
    }

    #[test]
    fn display_uses_text_syntax() {
        let constraint = Constraint::and([
            Constraint::single("logged_in_user", &[("username", "username")]),
            Leaf::new("not frozen").literal("strict", true).into(),
            Constraint::single("always", &[]),
        ]);
        assert_eq!(
            constraint.to_string(),
            "and(logged_in_user(username=username), not frozen(strict=true), always)"
        );
    }

    #[test]
    fn serde_goes_through_tagged_tuples() {
        let constraint = Constraint::single("p", &[("x", "y")]);
        let json = serde_json::to_value(&constraint).unwrap();
        assert_eq!(json, json!(["single", "p", {"x": "y"}]));
        let back: Constraint = serde_json::from_value(json).unwrap();
        assert_eq!(back, constraint);
    }
}
