//! Default dependency tables for the bank.

use actguard_deps::{Constraint, DependencyRegistry};

fn user(predicate: &str) -> Constraint {
    Constraint::single(predicate, &[("username", "username")])
}

fn positive_amount() -> Constraint {
    Constraint::single("internal_positive_amount", &[("amount", "amount")])
}

/// Checks the bank body runs before touching its records.
pub fn innate() -> DependencyRegistry {
    DependencyRegistry::new()
        .with(
            "login_user",
            Constraint::chain([
                user("internal_check_username_exist"),
                Constraint::single(
                    "internal_check_password",
                    &[("username", "username"), ("password", "password")],
                ),
            ]),
        )
        .with_unconstrained("logout_user")
        .with(
            "authenticate_admin_password",
            Constraint::chain([
                user("internal_check_username_exist"),
                Constraint::single(
                    "internal_check_admin_password",
                    &[("username", "username"), ("admin_password", "admin_password")],
                ),
            ]),
        )
        .with("set_admin_password", user("internal_check_username_exist"))
        .with("get_account_balance", user("internal_check_username_exist"))
        .with(
            "deposit_funds",
            Constraint::chain([user("internal_check_username_exist"), positive_amount()]),
        )
        .with(
            "transfer_funds",
            Constraint::and([
                user("internal_check_username_exist"),
                Constraint::single("internal_check_username_exist", &[("username", "destination_username")]),
                positive_amount(),
            ]),
        )
        .with(
            "apply_for_loan",
            Constraint::chain([user("internal_check_username_exist"), positive_amount()]),
        )
        .with(
            "pay_loan",
            Constraint::chain([user("internal_check_username_exist"), positive_amount()]),
        )
        .with("get_credit_cards", user("internal_check_username_exist"))
        .with(
            "add_credit_card",
            Constraint::chain([
                user("internal_check_username_exist"),
                Constraint::single(
                    "internal_check_credit_card_exist",
                    &[("username", "username"), ("card_number", "card_number")],
                ),
                Constraint::single("internal_non_negative_credit_limit", &[("credit_limit", "credit_limit")]),
            ]),
        )
        .with(
            "remove_credit_card",
            Constraint::single(
                "internal_check_credit_card_exist",
                &[("username", "username"), ("card_number", "card_number")],
            ),
        )
}

/// Checks the strict wrapper runs before the call reaches the body.
pub fn customizable() -> DependencyRegistry {
    let admin = || Constraint::chain([user("logged_in_user"), user("authenticated_admin_password")]);
    let amount = |predicate: &str| Constraint::single(predicate, &[("username", "username"), ("amount", "amount")]);
    let unit = || Constraint::single("accepted_unit", &[("unit", "unit")]);

    DependencyRegistry::new()
        .with_unconstrained("login_user")
        .with("logout_user", user("logged_in_user"))
        .with("authenticate_admin_password", user("logged_in_user"))
        .with("set_admin_password", admin())
        .with("get_account_balance", user("logged_in_user"))
        .with("deposit_funds", Constraint::chain([user("logged_in_user"), unit()]))
        .with(
            "transfer_funds",
            Constraint::chain([admin(), unit(), amount("sufficient_account_balance")]),
        )
        .with(
            "apply_for_loan",
            Constraint::chain([admin(), amount("within_maximum_owed_balance")]),
        )
        .with(
            "pay_loan",
            Constraint::chain([user("logged_in_user"), amount("sufficient_account_balance")]),
        )
        .with("get_credit_cards", user("logged_in_user"))
        .with("add_credit_card", admin())
        .with("remove_credit_card", admin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actguard_deps::Entry;

    #[test]
    fn every_customizable_action_has_an_innate_entry() {
        let innate = innate();
        for action in customizable().actions() {
            assert!(innate.contains(action), "{action} missing from innate table");
        }
    }

    #[test]
    fn amount_actions_check_the_amount() {
        let innate = innate();
        for action in ["deposit_funds", "transfer_funds", "apply_for_loan", "pay_loan"] {
            let Entry::Constrained(constraint) = innate.entry(action) else {
                panic!("{action} should be constrained");
            };
            assert!(
                constraint.to_string().contains("internal_positive_amount(amount=amount)"),
                "{action}: {constraint}"
            );
        }
    }

    #[test]
    fn transfer_reads_like_its_text_form() {
        let registry = customizable();
        let Entry::Constrained(transfer) = registry.entry("transfer_funds") else {
            panic!("transfer_funds should be constrained");
        };
        assert_eq!(
            transfer.to_string(),
            "chain(chain(logged_in_user(username=username), authenticated_admin_password(username=username)), \
             accepted_unit(unit=unit), sufficient_account_balance(amount=amount, username=username))"
        );
    }
}
