//! Bank records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One customer account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub password: String,
    pub balance: f64,
    /// Outstanding loan principal.
    pub owed_balance: f64,
    pub admin_password: String,
    /// Card number → card.
    #[serde(default)]
    pub credit_cards: BTreeMap<String, CreditCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCard {
    pub credit_limit: f64,
    pub credit_balance: f64,
}

/// Every account the bank holds, keyed by username.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankDatabase {
    pub accounts: BTreeMap<String, Account>,
}

impl BankDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style account insertion.
    pub fn with_account(mut self, username: impl Into<String>, account: Account) -> Self {
        self.accounts.insert(username.into(), account);
        self
    }

    /// The fixture used across tests and demos.
    ///
    /// Returns a fresh value on every call.
    pub fn sample() -> Self {
        Self::new()
            .with_account(
                "alice",
                Account {
                    password: "p".into(),
                    balance: 100.0,
                    owed_balance: 0.0,
                    admin_password: "a".into(),
                    credit_cards: BTreeMap::from([(
                        "4111-1111-1111-1111".to_string(),
                        CreditCard {
                            credit_limit: 1000.0,
                            credit_balance: 0.0,
                        },
                    )]),
                },
            )
            .with_account(
                "bob",
                Account {
                    password: "b".into(),
                    balance: 250.0,
                    owed_balance: 100.0,
                    admin_password: "bb".into(),
                    credit_cards: BTreeMap::new(),
                },
            )
    }

    pub fn account(&self, username: &str) -> Option<&Account> {
        self.accounts.get(username)
    }

    pub fn account_mut(&mut self, username: &str) -> Option<&mut Account> {
        self.accounts.get_mut(username)
    }

    pub fn balance(&self, username: &str) -> Option<f64> {
        self.account(username).map(|a| a.balance)
    }

    pub fn owed_balance(&self, username: &str) -> Option<f64> {
        self.account(username).map(|a| a.owed_balance)
    }
}
