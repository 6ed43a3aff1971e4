//! Predicate surfaces and the resolver that binds leaves to them.
//!
//! A domain exposes predicates on two surfaces: the state tracker (session
//! and policy facts such as "user is logged in") and the domain body (data
//! facts such as "username exists"). Both are tables from name to closure,
//! built once per domain. A leaf is resolved against the tracker first, then
//! the body.

use std::collections::HashMap;
use std::fmt;

use actguard_core::{Args, Outcome};
use tracing::{debug, warn};

use crate::model::{Leaf, ParamSource};

/// Anything a predicate may return.
pub trait PredicateResult {
    fn holds(self) -> bool;
}

impl PredicateResult for bool {
    fn holds(self) -> bool {
        self
    }
}

impl<T> PredicateResult for Outcome<T> {
    fn holds(self) -> bool {
        self.is_allowed()
    }
}

/// A `(value, verdict)` pair; the second element decides.
impl<T> PredicateResult for (T, bool) {
    fn holds(self) -> bool {
        self.1
    }
}

/// A predicate callable: body, tracker, bound arguments.
pub type PredicateFn<B, T> = Box<dyn Fn(&B, &T, &Args) -> bool>;

/// Named predicates exposed by one surface.
pub struct PredicateSet<B, T> {
    predicates: HashMap<String, PredicateFn<B, T>>,
}

impl<B, T> Default for PredicateSet<B, T> {
    fn default() -> Self {
        Self {
            predicates: HashMap::new(),
        }
    }
}

impl<B, T> fmt::Debug for PredicateSet<B, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("PredicateSet").field("names", &names).finish()
    }
}

impl<B, T> PredicateSet<B, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a predicate. Replaces any existing one with the same name.
    pub fn register<F, R>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&B, &T, &Args) -> R + 'static,
        R: PredicateResult,
    {
        self.predicates.insert(
            name.into(),
            Box::new(move |body, tracker, args| predicate(body, tracker, args).holds()),
        );
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F, R>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&B, &T, &Args) -> R + 'static,
        R: PredicateResult,
    {
        self.register(name, predicate);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.predicates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    fn get(&self, name: &str) -> Option<&PredicateFn<B, T>> {
        self.predicates.get(name)
    }
}

/// The two lookup surfaces of a domain.
#[derive(Debug)]
pub struct Surfaces<B, T> {
    pub tracker: PredicateSet<B, T>,
    pub body: PredicateSet<B, T>,
}

impl<B, T> Surfaces<B, T> {
    pub fn new(tracker: PredicateSet<B, T>, body: PredicateSet<B, T>) -> Self {
        Self { tracker, body }
    }

    /// Whether either surface exposes `name`.
    pub fn exposes(&self, name: &str) -> bool {
        self.tracker.contains(name) || self.body.contains(name)
    }
}

/// What resolving a leaf produced, before negation is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The predicate ran and returned this truth value.
    Holds(bool),
    /// A mapped input was absent; the predicate was not called.
    MissingInput(String),
    /// Neither surface exposes the predicate.
    Unknown,
}

/// Binds leaves to predicates on a specific body and tracker.
pub struct Resolver<'a, B, T> {
    body: &'a B,
    tracker: &'a T,
    surfaces: &'a Surfaces<B, T>,
}

impl<'a, B, T> Resolver<'a, B, T> {
    pub fn new(body: &'a B, tracker: &'a T, surfaces: &'a Surfaces<B, T>) -> Self {
        Self {
            body,
            tracker,
            surfaces,
        }
    }

    /// Locate the leaf's predicate, bind its arguments, and call it.
    pub fn resolve(&self, leaf: &Leaf, args: &Args) -> Resolution {
        let (surface, predicate) = if let Some(p) = self.surfaces.tracker.get(&leaf.predicate) {
            ("tracker", p)
        } else if let Some(p) = self.surfaces.body.get(&leaf.predicate) {
            ("body", p)
        } else {
            warn!(predicate = %leaf.predicate, "Predicate not exposed by tracker or body");
            return Resolution::Unknown;
        };

        let bound = match bind(leaf, args) {
            Ok(bound) => bound,
            Err(missing) => return Resolution::MissingInput(missing),
        };

        let holds = predicate(self.body, self.tracker, &bound);
        debug!(predicate = %leaf.predicate, surface, holds, "Resolved predicate");
        Resolution::Holds(holds)
    }
}

/// Build a predicate's arguments from the caller's inputs.
///
/// Returns the name of the first absent input on failure.
pub fn bind(leaf: &Leaf, args: &Args) -> Result<Args, String> {
    let mut bound = Args::new();
    for (formal, source) in &leaf.params {
        match source {
            ParamSource::Literal(value) => bound.insert(formal.clone(), value.clone()),
            ParamSource::Input(name) => match args.get(name) {
                Some(value) => bound.insert(formal.clone(), value.clone()),
                None => return Err(name.clone()),
            },
        }
    }
    Ok(bound)
}
