//! The strict wrapper: customizable preconditions in front of a domain body.
//!
//! Every call is checked against the customizable registry first. Only
//! when that passes does the wrapper apply the action's session effect (for
//! authenticating actions) and hand the call to the body, which then runs
//! its own innate checks.

use actguard_core::{Args, ConstraintError, Outcome, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::{Domain, StateTracker};
use crate::engine::Evaluator;
use crate::registry::{DependencyRegistry, Layer};
use crate::verify::{ConstraintValues, VerifyOutcome};

/// Maximum call records kept in memory.
const MAX_CALL_HISTORY: usize = 5_000;

/// One action routed through the wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub action: String,
    pub args: Args,
    /// Whether the customizable layer let the call through.
    pub permitted: bool,
    /// Whether the body allowed it.
    pub allowed: bool,
    pub timestamp: DateTime<Utc>,
}

/// A domain body and its session state behind customizable dependencies.
pub struct StrictWrapper<D: Domain> {
    domain: D,
    tracker: D::Tracker,
    customizable: DependencyRegistry,
    /// Call history (bounded to MAX_CALL_HISTORY entries).
    history: Vec<CallRecord>,
}

impl<D: Domain> StrictWrapper<D> {
    /// Wrap `domain`.
    ///
    /// Fails if the customizable registry names an action the body does not
    /// implement, or if either registry names a predicate neither surface
    /// exposes.
    pub fn new(
        domain: D,
        tracker: D::Tracker,
        customizable: DependencyRegistry,
    ) -> std::result::Result<Self, ConstraintError> {
        let surfaces = domain.surfaces();
        let has_action = |action: &str| D::implements(action);
        let has_predicate = |name: &str| surfaces.exposes(name);
        customizable.validate(Some(&has_action), &has_predicate)?;
        domain.innate().validate(None, &has_predicate)?;

        info!(
            domain = D::NAME,
            customizable = customizable.len(),
            innate = domain.innate().len(),
            "Strict wrapper ready"
        );
        Ok(Self {
            domain,
            tracker,
            customizable,
            history: Vec::new(),
        })
    }

    /// Route one action call.
    ///
    /// Returns [`Outcome::Denied`] when the customizable layer fails; the
    /// body is not reached in that case. A session effect applied for this
    /// call is undone if the body denies or errors.
    /// Session effects therefore stick only on allowed calls, not on every permitted one.
    pub fn call(&mut self, action: &str, args: &Args) -> Result<Outcome> {
        let permitted = Evaluator::new(&self.domain, &self.tracker, self.domain.surfaces())
            .process(&self.customizable, action, args)?;
        if !permitted {
            info!(domain = D::NAME, action, layer = %Layer::Customizable, "Action denied");
            self.record(action, args, false, false);
            return Ok(Outcome::Denied);
        }

        let prior = D::session_effect(action).map(|effect| {
            let prior = self.tracker.clone();
            effect(&mut self.tracker, args);
            info!(domain = D::NAME, action, "Applied session effect");
            prior
        });

        let result = self.domain.execute(&self.tracker, action, args);
        let allowed = matches!(&result, Ok(outcome) if outcome.is_allowed());
        if !allowed {
            if let Some(prior) = prior {
                self.tracker = prior;
                debug!(domain = D::NAME, action, "Restored session state");
            }
        }

        match &result {
            Ok(Outcome::Denied) => {
                info!(domain = D::NAME, action, layer = %Layer::Innate, "Action denied")
            }
            Err(e) => warn!(domain = D::NAME, action, error = %e, "Action failed"),
            Ok(Outcome::Allowed(_)) => debug!(domain = D::NAME, action, "Action allowed"),
        }
        self.record(action, args, true, allowed);
        result
    }

    /// Check whether the customizable layer would let `action` through.
    pub fn permits(&self, action: &str, args: &Args) -> std::result::Result<bool, ConstraintError> {
        Evaluator::new(&self.domain, &self.tracker, self.domain.surfaces()).process(
            &self.customizable,
            action,
            args,
        )
    }

    /// Verify-mode evaluation of the customizable layer. Nothing is executed.
    pub fn verify(&self, action: &str, args: &Args, values: &ConstraintValues) -> VerifyOutcome {
        Evaluator::new(&self.domain, &self.tracker, self.domain.surfaces()).process_verify(
            &self.customizable,
            action,
            args,
            values,
        )
    }

    pub fn domain(&self) -> &D {
        &self.domain
    }

    pub fn tracker(&self) -> &D::Tracker {
        &self.tracker
    }

    pub fn customizable(&self) -> &DependencyRegistry {
        &self.customizable
    }

    pub fn history(&self) -> &[CallRecord] {
        &self.history
    }

    /// The body's data, for evaluation harnesses.
    pub fn evaluation_get_database(&self) -> Value {
        self.domain.snapshot()
    }

    /// The session state, for evaluation harnesses.
    pub fn evaluation_get_state_tracker(&self) -> &D::Tracker {
        &self.tracker
    }

    /// The tracker's policy parameters, for evaluation harnesses.
    pub fn evaluation_get_dependency_parameters(&self) -> Value {
        self.tracker.dependency_parameters()
    }

    fn record(&mut self, action: &str, args: &Args, permitted: bool, allowed: bool) {
        if self.history.len() >= MAX_CALL_HISTORY {
            self.history.drain(..MAX_CALL_HISTORY / 10);
        }
        self.history.push(CallRecord {
            action: action.to_string(),
            args: args.clone(),
            permitted,
            allowed,
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::domain::SessionEffect;
    use crate::model::Constraint;
    use crate::predicate::{PredicateSet, Surfaces};
    use crate::verify::Prescription;
    use actguard_core::{Error, args};
    use serde_json::json;

    #[derive(Debug, Clone, Default)]
    struct Session {
        user: Option<String>,
    }

    impl Session {
        fn set_user(&mut self, user: Option<&str>) {
            self.user = user.map(String::from);
        }
    }

    impl StateTracker for Session {
        fn dependency_parameters(&self) -> Value {
            json!({"max_opens": 2})
        }
    }

    struct Vault {
        passwords: BTreeMap<String, String>,
        opened: Vec<String>,
        innate: DependencyRegistry,
        surfaces: Surfaces<Vault, Session>,
    }

    impl Vault {
        fn new() -> Self {
            let innate = DependencyRegistry::new()
                .with(
                    "login",
                    Constraint::single("correct_password", &[("username", "username"), ("password", "password")]),
                )
                .with("open", Constraint::single("logged_in", &[("username", "username")]));
            let tracker = PredicateSet::new().with("logged_in", |_: &Vault, s: &Session, a: &Args| {
                s.user.is_some() && s.user.as_deref() == a.str("username")
            });
            let body = PredicateSet::new().with("correct_password", |v: &Vault, _: &Session, a: &Args| {
                match (a.str("username"), a.str("password")) {
                    (Some(user), Some(password)) => v.passwords.get(user).is_some_and(|p| p == password),
                    _ => false,
                }
            });
            Self {
                passwords: BTreeMap::from([("alice".to_string(), "p".to_string())]),
                opened: Vec::new(),
                innate,
                surfaces: Surfaces::new(tracker, body),
            }
        }
    }

    fn login_effect(session: &mut Session, args: &Args) {
        session.set_user(args.str("username"));
    }

    impl Domain for Vault {
        type Tracker = Session;

        const NAME: &'static str = "vault";
        const ACTIONS: &'static [&'static str] = &["login", "open"];

        fn innate(&self) -> &DependencyRegistry {
            &self.innate
        }

        fn surfaces(&self) -> &Surfaces<Self, Session> {
            &self.surfaces
        }

        fn session_effect(action: &str) -> Option<SessionEffect<Session>> {
            match action {
                "login" => Some(login_effect),
                _ => None,
            }
        }

        fn execute(&mut self, tracker: &Session, action: &str, args: &Args) -> Result<Outcome> {
            if !self.innate_permits(tracker, action, args)? {
                return Ok(Outcome::Denied);
            }
            match action {
                "login" => Ok(Outcome::Allowed(json!(true))),
                "open" => {
                    let user = args.require_str(action, "username")?;
                    self.opened.push(user.to_string());
                    Ok(Outcome::Allowed(json!(self.opened.len())))
                }
                _ => Ok(Outcome::Denied),
            }
        }

        fn snapshot(&self) -> Value {
            json!({"opened": self.opened})
        }
    }

    fn customizable() -> DependencyRegistry {
        DependencyRegistry::new()
            .with_unconstrained("login")
            .with("open", Constraint::single("logged_in", &[("username", "username")]))
    }

    fn wrapper() -> StrictWrapper<Vault> {
        StrictWrapper::new(Vault::new(), Session::default(), customizable()).unwrap()
    }

    #[test]
    fn unregistered_action_is_denied_before_the_body() {
        let mut w = StrictWrapper::new(
            Vault::new(),
            Session::default(),
            DependencyRegistry::new().with_unconstrained("login"),
        )
        .unwrap();
        let outcome = w.call("open", &args! {"username": "alice"}).unwrap();
        assert_eq!(outcome, Outcome::Denied);
        assert!(w.domain().opened.is_empty());
        assert!(!w.history()[0].permitted);
    }

    #[test]
    fn customizable_denial_leaves_body_untouched() {
        let mut w = wrapper();
        let outcome = w.call("open", &args! {"username": "alice"}).unwrap();
        assert!(outcome.is_denied());
        assert_eq!(w.evaluation_get_database(), json!({"opened": []}));
    }

    #[test]
    fn login_then_open() {
        let mut w = wrapper();
        let login = w.call("login", &args! {"username": "alice", "password": "p"}).unwrap();
        assert!(login.is_allowed());
        assert_eq!(w.tracker().user.as_deref(), Some("alice"));

        let open = w.call("open", &args! {"username": "alice"}).unwrap();
        assert_eq!(open, Outcome::Allowed(json!(1)));
        assert_eq!(w.history().len(), 2);
        assert!(w.history().iter().all(|r| r.permitted && r.allowed));
    }

    #[test]
    fn rejected_login_restores_session() {
        let mut w = wrapper();
        let outcome = w.call("login", &args! {"username": "alice", "password": "wrong"}).unwrap();
        assert!(outcome.is_denied());
        assert_eq!(w.evaluation_get_state_tracker().user, None);

        let record = &w.history()[0];
        assert!(record.permitted);
        assert!(!record.allowed);
    }

    #[test]
    fn body_error_restores_session_and_propagates() {
        let mut w = wrapper();
        let err = w.call("login", &args! {"username": "alice"}).unwrap_err();
        assert!(matches!(
            err,
            Error::Constraint(ConstraintError::MissingArgument { .. })
        ));
        assert_eq!(w.tracker().user, None);
    }

    #[test]
    fn verify_does_not_execute() {
        let w = wrapper();
        let leaf = Constraint::single("logged_in", &[("username", "username")]);
        let values = ConstraintValues::new().with(&leaf, Prescription::False).unwrap();
        let outcome = w.verify("open", &args! {"username": "alice"}, &values);
        assert_eq!(outcome, VerifyOutcome::new(false, true));
        assert!(w.history().is_empty());
        assert!(!w.permits("open", &args! {"username": "alice"}).unwrap());
    }

    #[test]
    fn construction_validates_registries() {
        let unknown_action = customizable().with_unconstrained("launch");
        assert_eq!(
            StrictWrapper::new(Vault::new(), Session::default(), unknown_action).err(),
            Some(ConstraintError::UnknownAction("launch".into()))
        );

        let unknown_predicate = customizable().with("open", Constraint::single("not frozen", &[]));
        assert_eq!(
            StrictWrapper::new(Vault::new(), Session::default(), unknown_predicate).err(),
            Some(ConstraintError::UnknownPredicate {
                action: "open".into(),
                predicate: "frozen".into(),
            })
        );
    }

    #[test]
    fn exposes_dependency_parameters() {
        assert_eq!(wrapper().evaluation_get_dependency_parameters(), json!({"max_opens": 2}));
    }
}
