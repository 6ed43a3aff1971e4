//! The bank domain.
//!
//! Accounts with balances, loans, and credit cards. Sessions are single-user:
//! `login_user` replaces whoever was logged in, and money-moving actions
//! additionally require the admin password to have been entered this
//! session.

pub mod database;
pub mod dependencies;
pub mod tracker;

use actguard_config::BankConfig;
use std::collections::BTreeMap;

use actguard_core::{Args, Outcome, Result};
use actguard_deps::{Domain, DependencyRegistry, PredicateSet, SessionEffect, StrictWrapper, Surfaces};
use serde_json::Value;
use tracing::{debug, warn};

pub use database::{Account, BankDatabase, CreditCard};
pub use tracker::{BankParameters, BankStateTracker};

/// A wrapped bank.
pub type StrictBank = StrictWrapper<Bank>;

/// Build a strict bank from configuration.
///
/// Overrides in `config.dependencies` replace the matching default
/// customizable entries.
pub fn strict_bank(config: &BankConfig, database: BankDatabase) -> Result<StrictBank> {
    let mut customizable = dependencies::customizable();
    customizable.apply_overrides(DependencyRegistry::from_text_entries(&config.dependencies)?);
    let tracker = BankStateTracker::new(BankParameters::from(config));
    Ok(StrictWrapper::new(Bank::new(database), tracker, customizable)?)
}

/// The bank body: records plus the actions that change them.
pub struct Bank {
    database: BankDatabase,
    innate: DependencyRegistry,
    surfaces: Surfaces<Bank, BankStateTracker>,
}

impl std::fmt::Debug for Bank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bank")
            .field("accounts", &self.database.accounts.len())
            .finish()
    }
}

impl Bank {
    pub fn new(database: BankDatabase) -> Self {
        Self {
            database,
            innate: dependencies::innate(),
            surfaces: surfaces(),
        }
    }

    pub fn sample() -> Self {
        Self::new(BankDatabase::sample())
    }

    // ── Internal operations ────────────────────────────────────────────

    pub fn internal_get_database(&self) -> &BankDatabase {
        &self.database
    }

    pub fn internal_check_username_exist(&self, username: &str) -> bool {
        self.database.accounts.contains_key(username)
    }

    pub fn internal_check_password(&self, username: &str, password: &str) -> bool {
        self.database
            .account(username)
            .is_some_and(|a| a.password == password)
    }

    pub fn internal_check_admin_password(&self, username: &str, admin_password: &str) -> bool {
        self.database
            .account(username)
            .is_some_and(|a| a.admin_password == admin_password)
    }

    pub fn internal_check_credit_card_exist(&self, username: &str, card_number: &str) -> bool {
        self.database
            .account(username)
            .is_some_and(|a| a.credit_cards.contains_key(card_number))
    }

    pub fn internal_positive_amount(&self, amount: f64) -> bool {
        amount.is_finite() && amount > 0.0
    }

    pub fn internal_non_negative_credit_limit(&self, credit_limit: f64) -> bool {
        credit_limit.is_finite() && credit_limit >= 0.0
    }

    // ── Actions ────────────────────────────────────────────────────────

    pub fn login_user(&mut self, tracker: &BankStateTracker, args: &Args) -> Result<Outcome<bool>> {
        if !self.innate_permits(tracker, "login_user", args)? {
            return Ok(Outcome::Denied);
        }
        Ok(Outcome::Allowed(true))
    }

    pub fn logout_user(&mut self, tracker: &BankStateTracker, args: &Args) -> Result<Outcome<bool>> {
        if !self.innate_permits(tracker, "logout_user", args)? {
            return Ok(Outcome::Denied);
        }
        Ok(Outcome::Allowed(true))
    }

    pub fn authenticate_admin_password(&mut self, tracker: &BankStateTracker, args: &Args) -> Result<Outcome<bool>> {
        if !self.innate_permits(tracker, "authenticate_admin_password", args)? {
            return Ok(Outcome::Denied);
        }
        Ok(Outcome::Allowed(true))
    }

    pub fn set_admin_password(&mut self, tracker: &BankStateTracker, args: &Args) -> Result<Outcome<bool>> {
        const ACTION: &str = "set_admin_password";
        if !self.innate_permits(tracker, ACTION, args)? {
            return Ok(Outcome::Denied);
        }
        let username = args.require_str(ACTION, "username")?;
        let admin_password = args.require_str(ACTION, "admin_password")?;
        Ok(match self.database.account_mut(username) {
            Some(account) => {
                account.admin_password = admin_password.to_string();
                Outcome::Allowed(true)
            }
            None => Outcome::Denied,
        })
    }

    pub fn get_account_balance(&self, tracker: &BankStateTracker, args: &Args) -> Result<Outcome<f64>> {
        const ACTION: &str = "get_account_balance";
        if !self.innate_permits(tracker, ACTION, args)? {
            return Ok(Outcome::Denied);
        }
        let username = args.require_str(ACTION, "username")?;
        Ok(self.database.balance(username).map_or(Outcome::Denied, Outcome::Allowed))
    }

    /// Returns the new balance.
    pub fn deposit_funds(&mut self, tracker: &BankStateTracker, args: &Args) -> Result<Outcome<f64>> {
        const ACTION: &str = "deposit_funds";
        if !self.innate_permits(tracker, ACTION, args)? {
            return Ok(Outcome::Denied);
        }
        let username = args.require_str(ACTION, "username")?;
        let amount = args.require_f64(ACTION, "amount")?;
        Ok(match self.database.account_mut(username) {
            Some(account) => {
                account.balance += amount;
                Outcome::Allowed(account.balance)
            }
            None => Outcome::Denied,
        })
    }

    pub fn transfer_funds(&mut self, tracker: &BankStateTracker, args: &Args) -> Result<Outcome<bool>> {
        const ACTION: &str = "transfer_funds";
        if !self.innate_permits(tracker, ACTION, args)? {
            return Ok(Outcome::Denied);
        }
        let from = args.require_str(ACTION, "username")?;
        let to = args.require_str(ACTION, "destination_username")?;
        let amount = args.require_f64(ACTION, "amount")?;

        if from == to {
            return Ok(Outcome::Allowed(true));
        }
        let Some(source) = self.database.account_mut(from) else {
            return Ok(Outcome::Denied);
        };
        source.balance -= amount;
        match self.database.account_mut(to) {
            Some(destination) => destination.balance += amount,
            None => {
                // Undo the debit; destination vanished between check and write.
                if let Some(source) = self.database.account_mut(from) {
                    source.balance += amount;
                }
                return Ok(Outcome::Denied);
            }
        }
        debug!(from, to, amount, "Transferred funds");
        Ok(Outcome::Allowed(true))
    }

    /// Returns the new owed balance.
    pub fn apply_for_loan(&mut self, tracker: &BankStateTracker, args: &Args) -> Result<Outcome<f64>> {
        const ACTION: &str = "apply_for_loan";
        if !self.innate_permits(tracker, ACTION, args)? {
            return Ok(Outcome::Denied);
        }
        let username = args.require_str(ACTION, "username")?;
        let amount = args.require_f64(ACTION, "amount")?;
        Ok(match self.database.account_mut(username) {
            Some(account) => {
                account.balance += amount;
                account.owed_balance += amount;
                Outcome::Allowed(account.owed_balance)
            }
            None => Outcome::Denied,
        })
    }

    /// Pays down at most the owed balance. Returns what is still owed.
    pub fn pay_loan(&mut self, tracker: &BankStateTracker, args: &Args) -> Result<Outcome<f64>> {
        const ACTION: &str = "pay_loan";
        if !self.innate_permits(tracker, ACTION, args)? {
            return Ok(Outcome::Denied);
        }
        let username = args.require_str(ACTION, "username")?;
        let amount = args.require_f64(ACTION, "amount")?;
        Ok(match self.database.account_mut(username) {
            Some(account) => {
                let paid = amount.min(account.owed_balance);
                account.balance -= paid;
                account.owed_balance -= paid;
                Outcome::Allowed(account.owed_balance)
            }
            None => Outcome::Denied,
        })
    }

    pub fn get_credit_cards(
        &self,
        tracker: &BankStateTracker,
        args: &Args,
    ) -> Result<Outcome<BTreeMap<String, CreditCard>>> {
        const ACTION: &str = "get_credit_cards";
        if !self.innate_permits(tracker, ACTION, args)? {
            return Ok(Outcome::Denied);
        }
        let username = args.require_str(ACTION, "username")?;
        Ok(self
            .database
            .account(username)
            .map_or(Outcome::Denied, |a| Outcome::Allowed(a.credit_cards.clone())))
    }

    /// Refreshes the limit of a card already on file and resets its balance.
    ///
    /// Cards not yet on file are rejected by the innate check.
    // TODO: confirm whether new card numbers should be accepted here; today only existing ones are refreshed.
    pub fn add_credit_card(&mut self, tracker: &BankStateTracker, args: &Args) -> Result<Outcome<bool>> {
        const ACTION: &str = "add_credit_card";
        if !self.innate_permits(tracker, ACTION, args)? {
            return Ok(Outcome::Denied);
        }
        let username = args.require_str(ACTION, "username")?;
        let card_number = args.require_str(ACTION, "card_number")?;
        let credit_limit = args.require_f64(ACTION, "credit_limit")?;
        let Some(account) = self.database.account_mut(username) else {
            return Ok(Outcome::Denied);
        };
        account.credit_cards.insert(
            card_number.to_string(),
            CreditCard {
                credit_limit,
                credit_balance: 0.0,
            },
        );
        Ok(Outcome::Allowed(true))
    }

    pub fn remove_credit_card(&mut self, tracker: &BankStateTracker, args: &Args) -> Result<Outcome<bool>> {
        const ACTION: &str = "remove_credit_card";
        if !self.innate_permits(tracker, ACTION, args)? {
            return Ok(Outcome::Denied);
        }
        let username = args.require_str(ACTION, "username")?;
        let card_number = args.require_str(ACTION, "card_number")?;
        Ok(self
            .database
            .account_mut(username)
            .and_then(|a| a.credit_cards.remove(card_number))
            .map_or(Outcome::Denied, |_| Outcome::Allowed(true)))
    }
}

impl Domain for Bank {
    type Tracker = BankStateTracker;

    const NAME: &'static str = "bank";
    const ACTIONS: &'static [&'static str] = &[
        "login_user",
        "logout_user",
        "authenticate_admin_password",
        "set_admin_password",
        "get_account_balance",
        "deposit_funds",
        "transfer_funds",
        "apply_for_loan",
        "pay_loan",
        "get_credit_cards",
        "add_credit_card",
        "remove_credit_card",
    ];

    fn innate(&self) -> &DependencyRegistry {
        &self.innate
    }

    fn surfaces(&self) -> &Surfaces<Self, BankStateTracker> {
        &self.surfaces
    }

    fn session_effect(action: &str) -> Option<SessionEffect<BankStateTracker>> {
        let effect: SessionEffect<BankStateTracker> = match action {
            "login_user" => login_effect,
            "logout_user" => logout_effect,
            "authenticate_admin_password" => admin_effect,
            _ => return None,
        };
        Some(effect)
    }

    fn execute(&mut self, tracker: &BankStateTracker, action: &str, args: &Args) -> Result<Outcome> {
        let outcome = match action {
            "login_user" => self.login_user(tracker, args)?.into_value()?,
            "logout_user" => self.logout_user(tracker, args)?.into_value()?,
            "authenticate_admin_password" => self.authenticate_admin_password(tracker, args)?.into_value()?,
            "set_admin_password" => self.set_admin_password(tracker, args)?.into_value()?,
            "get_account_balance" => self.get_account_balance(tracker, args)?.into_value()?,
            "deposit_funds" => self.deposit_funds(tracker, args)?.into_value()?,
            "transfer_funds" => self.transfer_funds(tracker, args)?.into_value()?,
            "apply_for_loan" => self.apply_for_loan(tracker, args)?.into_value()?,
            "pay_loan" => self.pay_loan(tracker, args)?.into_value()?,
            "get_credit_cards" => self.get_credit_cards(tracker, args)?.into_value()?,
            "add_credit_card" => self.add_credit_card(tracker, args)?.into_value()?,
            "remove_credit_card" => self.remove_credit_card(tracker, args)?.into_value()?,
            other => {
                warn!(action = other, "Bank does not implement action");
                Outcome::Denied
            }
        };
        Ok(outcome)
    }

    fn snapshot(&self) -> Value {
        serde_json::to_value(&self.database).unwrap_or_default()
    }
}

fn login_effect(tracker: &mut BankStateTracker, args: &Args) {
    if let Some(username) = username(args) {
        tracker.set_login_user(username);
    }
}

fn logout_effect(tracker: &mut BankStateTracker, _: &Args) {
    tracker.set_logout_user();
}

fn admin_effect(tracker: &mut BankStateTracker, _: &Args) {
    tracker.set_authenticate_admin_password(true);
}

fn username(args: &Args) -> Option<&str> {
    args.str("username")
}

fn surfaces() -> Surfaces<Bank, BankStateTracker> {
    let tracker = PredicateSet::new()
        .with("logged_in_user", |_: &Bank, t: &BankStateTracker, a: &Args| {
            username(a).is_some_and(|u| t.logged_in_user(u))
        })
        .with("authenticated_admin_password", |_: &Bank, t: &BankStateTracker, a: &Args| {
            username(a).is_some_and(|u| t.authenticated_admin_password(u))
        })
        .with("accepted_unit", |_: &Bank, t: &BankStateTracker, a: &Args| {
            a.str("unit").is_some_and(|u| t.accepted_unit(u))
        })
        .with("sufficient_account_balance", |b: &Bank, t: &BankStateTracker, a: &Args| {
            match (username(a), a.f64("amount")) {
                (Some(u), Some(amount)) => t.sufficient_account_balance(&b.database, u, amount),
                _ => false,
            }
        })
        .with("within_maximum_owed_balance", |b: &Bank, t: &BankStateTracker, a: &Args| {
            match (username(a), a.f64("amount")) {
                (Some(u), Some(amount)) => t.within_maximum_owed_balance(&b.database, u, amount),
                _ => false,
            }
        });

    let body = PredicateSet::new()
        .with("internal_check_username_exist", |b: &Bank, _: &BankStateTracker, a: &Args| {
            username(a).is_some_and(|u| b.internal_check_username_exist(u))
        })
        .with("internal_check_password", |b: &Bank, _: &BankStateTracker, a: &Args| {
            match (username(a), a.str("password")) {
                (Some(u), Some(p)) => b.internal_check_password(u, p),
                _ => false,
            }
        })
        .with("internal_check_admin_password", |b: &Bank, _: &BankStateTracker, a: &Args| {
            match (username(a), a.str("admin_password")) {
                (Some(u), Some(p)) => b.internal_check_admin_password(u, p),
                _ => false,
            }
        })
        .with("internal_check_credit_card_exist", |b: &Bank, _: &BankStateTracker, a: &Args| {
            match (username(a), a.str("card_number")) {
                (Some(u), Some(card)) => b.internal_check_credit_card_exist(u, card),
                _ => false,
            }
        })
        .with("internal_positive_amount", |b: &Bank, _: &BankStateTracker, a: &Args| {
            a.f64("amount").is_some_and(|x| b.internal_positive_amount(x))
        })
        .with("internal_non_negative_credit_limit", |b: &Bank, _: &BankStateTracker, a: &Args| {
            a.f64("credit_limit").is_some_and(|x| b.internal_non_negative_credit_limit(x))
        });

    Surfaces::new(tracker, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actguard_core::{Error, args};

    fn logged_in(username: &str) -> BankStateTracker {
        let mut tracker = BankStateTracker::default();
        tracker.set_login_user(username);
        tracker
    }

    #[test]
    fn body_enforces_innate_checks_without_wrapper() {
        let mut bank = Bank::sample();
        let tracker = BankStateTracker::default();
        let outcome = bank
            .deposit_funds(&tracker, &args! {"username": "carol", "amount": 10, "unit": "dollars"})
            .unwrap();
        assert_eq!(outcome, Outcome::Denied);

        let outcome = bank
            .deposit_funds(&tracker, &args! {"username": "alice", "amount": 10, "unit": "dollars"})
            .unwrap();
        assert_eq!(outcome, Outcome::Allowed(110.0));
    }

    #[test]
    fn login_checks_password() {
        let mut bank = Bank::sample();
        let tracker = BankStateTracker::default();
        assert!(bank.login_user(&tracker, &args! {"username": "alice", "password": "p"}).unwrap().is_allowed());
        assert!(bank.login_user(&tracker, &args! {"username": "alice", "password": "x"}).unwrap().is_denied());
    }

    #[test]
    fn non_positive_amount_is_denied() {
        let mut bank = Bank::sample();
        let tracker = logged_in("alice");
        let before = bank.snapshot();
        for amount in [-5.0, 0.0] {
            let deposit = args! {"username": "alice", "amount": amount};
            assert_eq!(bank.deposit_funds(&tracker, &deposit).unwrap(), Outcome::Denied);
            let transfer = args! {"username": "alice", "destination_username": "bob", "amount": amount};
            assert_eq!(bank.transfer_funds(&tracker, &transfer).unwrap(), Outcome::Denied);
            let loan = args! {"username": "alice", "amount": amount};
            assert_eq!(bank.apply_for_loan(&tracker, &loan).unwrap(), Outcome::Denied);
            assert_eq!(bank.pay_loan(&tracker, &loan).unwrap(), Outcome::Denied);
        }
        assert_eq!(bank.snapshot(), before);
    }

    #[test]
    fn negative_credit_limit_is_denied() {
        let mut bank = Bank::sample();
        let tracker = logged_in("alice");
        let before = bank.snapshot();
        let card = args! {"username": "alice", "card_number": "4111-1111-1111-1111", "credit_limit": -1};
        assert_eq!(bank.add_credit_card(&tracker, &card).unwrap(), Outcome::Denied);
        assert_eq!(bank.snapshot(), before);
    }

    #[test]
    fn loans_raise_and_repay_owed_balance() {
        let mut bank = Bank::sample();
        let tracker = logged_in("bob");
        let owed = bank
            .apply_for_loan(&tracker, &args! {"username": "bob", "amount": 50})
            .unwrap();
        assert_eq!(owed, Outcome::Allowed(150.0));
        assert_eq!(bank.internal_get_database().balance("bob"), Some(300.0));

        // Overpaying only settles what is owed.
        let owed = bank.pay_loan(&tracker, &args! {"username": "bob", "amount": 1000}).unwrap();
        assert_eq!(owed, Outcome::Allowed(0.0));
        assert_eq!(bank.internal_get_database().balance("bob"), Some(150.0));
    }

    #[test]
    fn add_credit_card_only_refreshes_known_cards() {
        let mut bank = Bank::sample();
        let tracker = logged_in("alice");
        let known = args! {"username": "alice", "card_number": "4111-1111-1111-1111", "credit_limit": 2000};
        assert!(bank.add_credit_card(&tracker, &known).unwrap().is_allowed());
        let cards = bank.get_credit_cards(&tracker, &args! {"username": "alice"}).unwrap().allowed().unwrap();
        assert_eq!(cards["4111-1111-1111-1111"].credit_limit, 2000.0);

        let unknown = args! {"username": "alice", "card_number": "5500-0000-0000-0004", "credit_limit": 500};
        assert!(bank.add_credit_card(&tracker, &unknown).unwrap().is_denied());
        assert!(!bank.internal_check_credit_card_exist("alice", "5500-0000-0000-0004"));
    }

    #[test]
    fn remove_credit_card() {
        let mut bank = Bank::sample();
        let tracker = logged_in("alice");
        let card = args! {"username": "alice", "card_number": "4111-1111-1111-1111"};
        assert!(bank.remove_credit_card(&tracker, &card).unwrap().is_allowed());
        assert!(bank.remove_credit_card(&tracker, &card).unwrap().is_denied());
    }

    #[test]
    fn unknown_action_is_denied() {
        let mut bank = Bank::sample();
        let outcome = bank
            .execute(&BankStateTracker::default(), "close_account", &args! {"username": "alice"})
            .unwrap();
        assert_eq!(outcome, Outcome::Denied);
    }

    #[test]
    fn snapshot_reflects_mutations() {
        let mut bank = Bank::sample();
        bank.deposit_funds(&logged_in("alice"), &args! {"username": "alice", "amount": 1, "unit": "dollars"})
            .unwrap();
        assert_eq!(bank.snapshot()["accounts"]["alice"]["balance"], 101.0);
    }

    #[test]
    fn strict_bank_applies_config_overrides() {
        let mut config = BankConfig::default();
        config.dependencies.insert("get_account_balance".into(), String::new());
        let mut bank = strict_bank(&config, BankDatabase::sample()).unwrap();
        let balance = bank.call("get_account_balance", &args! {"username": "alice"}).unwrap();
        assert_eq!(balance, Outcome::Allowed(serde_json::json!(100.0)));
    }

    #[test]
    fn strict_bank_rejects_bad_overrides() {
        let mut config = BankConfig::default();
        config.dependencies.insert("close_account".into(), String::new());
        assert!(matches!(
            strict_bank(&config, BankDatabase::sample()),
            Err(Error::Constraint(actguard_core::ConstraintError::UnknownAction(_)))
        ));

        let mut config = BankConfig::default();
        config.dependencies.insert("deposit_funds".into(), "xor(a, b)".into());
        assert!(strict_bank(&config, BankDatabase::sample()).is_err());
    }
}
