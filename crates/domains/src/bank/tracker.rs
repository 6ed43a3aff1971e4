//! Bank session state and policy predicates.

use actguard_config::BankConfig;
use actguard_deps::StateTracker;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::database::BankDatabase;

/// Policy thresholds, frozen when the wrapper is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankParameters {
    pub maximum_owed_balance: f64,
    pub accepted_units: Vec<String>,
}

impl Default for BankParameters {
    fn default() -> Self {
        Self::from(&BankConfig::default())
    }
}

impl From<&BankConfig> for BankParameters {
    fn from(config: &BankConfig) -> Self {
        Self {
            maximum_owed_balance: config.maximum_owed_balance,
            accepted_units: config.accepted_units.clone(),
        }
    }
}

/// Who is logged in and whether they have passed the admin check.
///
/// A single session: logging in replaces any previous user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BankStateTracker {
    logged_in_user: Option<String>,
    admin_authenticated: bool,
    parameters: BankParameters,
}

impl BankStateTracker {
    pub fn new(parameters: BankParameters) -> Self {
        Self {
            logged_in_user: None,
            admin_authenticated: false,
            parameters,
        }
    }

    pub fn parameters(&self) -> &BankParameters {
        &self.parameters
    }

    pub fn current_user(&self) -> Option<&str> {
        self.logged_in_user.as_deref()
    }

    pub fn set_login_user(&mut self, username: &str) {
        self.logged_in_user = Some(username.to_string());
        self.admin_authenticated = false;
    }

    pub fn set_logout_user(&mut self) {
        self.logged_in_user = None;
        self.admin_authenticated = false;
    }

    pub fn set_authenticate_admin_password(&mut self, authenticated: bool) {
        self.admin_authenticated = authenticated;
    }

    pub fn logged_in_user(&self, username: &str) -> bool {
        self.current_user() == Some(username)
    }

    pub fn authenticated_admin_password(&self, username: &str) -> bool {
        self.logged_in_user(username) && self.admin_authenticated
    }

    pub fn accepted_unit(&self, unit: &str) -> bool {
        self.parameters.accepted_units.iter().any(|u| u == unit)
    }

    pub fn sufficient_account_balance(&self, db: &BankDatabase, username: &str, amount: f64) -> bool {
        db.balance(username).is_some_and(|balance| balance >= amount)
    }

    /// Whether borrowing `amount` keeps the user's debt within the cap.
    pub fn within_maximum_owed_balance(&self, db: &BankDatabase, username: &str, amount: f64) -> bool {
        db.owed_balance(username)
            .is_some_and(|owed| owed + amount <= self.parameters.maximum_owed_balance)
    }
}

impl StateTracker for BankStateTracker {
    fn dependency_parameters(&self) -> Value {
        serde_json::to_value(&self.parameters).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_resets_admin_authentication() {
        let mut tracker = BankStateTracker::default();
        tracker.set_login_user("alice");
        tracker.set_authenticate_admin_password(true);
        assert!(tracker.authenticated_admin_password("alice"));

        tracker.set_login_user("bob");
        assert!(!tracker.logged_in_user("alice"));
        assert!(!tracker.authenticated_admin_password("bob"));
    }

    #[test]
    fn logout_clears_session() {
        let mut tracker = BankStateTracker::default();
        tracker.set_login_user("alice");
        tracker.set_authenticate_admin_password(true);
        tracker.set_logout_user();
        assert_eq!(tracker.current_user(), None);
        assert!(!tracker.authenticated_admin_password("alice"));
    }

    #[test]
    fn balance_policies() {
        let db = BankDatabase::sample();
        let tracker = BankStateTracker::default();
        assert!(tracker.sufficient_account_balance(&db, "alice", 100.0));
        assert!(!tracker.sufficient_account_balance(&db, "alice", 100.5));
        assert!(!tracker.sufficient_account_balance(&db, "carol", 1.0));

        // bob owes 100 of the 500 cap.
        assert!(tracker.within_maximum_owed_balance(&db, "bob", 400.0));
        assert!(!tracker.within_maximum_owed_balance(&db, "bob", 401.0));
    }

    #[test]
    fn parameters_follow_config() {
        let config = BankConfig {
            accepted_units: vec!["euros".into()],
            ..BankConfig::default()
        };
        let tracker = BankStateTracker::new(BankParameters::from(&config));
        assert!(tracker.accepted_unit("euros"));
        assert!(!tracker.accepted_unit("dollars"));
        assert_eq!(
            tracker.dependency_parameters(),
            serde_json::json!({"maximum_owed_balance": 500.0, "accepted_units": ["euros"]})
        );
    }
}
