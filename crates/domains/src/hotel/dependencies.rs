//! Default dependency tables for the hotel.

use actguard_deps::{Constraint, DependencyRegistry};

fn guest(predicate: &str) -> Constraint {
    Constraint::single(predicate, &[("guest_name", "guest_name")])
}

fn room(predicate: &str) -> Constraint {
    Constraint::single(predicate, &[("room_id", "room_id")])
}

fn booking(predicate: &str) -> Constraint {
    Constraint::single(predicate, &[("guest_name", "guest_name"), ("room_id", "room_id")])
}

pub fn innate() -> DependencyRegistry {
    DependencyRegistry::new()
        .with(
            "login_guest",
            Constraint::chain([
                guest("internal_check_guest_exist"),
                Constraint::single(
                    "internal_check_guest_password",
                    &[("guest_name", "guest_name"), ("password", "password")],
                ),
            ]),
        )
        .with_unconstrained("logout_guest")
        .with(
            "book_room",
            Constraint::chain([
                guest("internal_check_guest_exist"),
                room("internal_check_room_exist"),
                room("internal_check_room_available"),
            ]),
        )
        .with("cancel_booking", booking("internal_check_booking_exist"))
        .with("place_room_service_order", booking("internal_check_booking_exist"))
        .with("get_room_service_orders", guest("internal_check_guest_exist"))
        .with(
            "register_loyalty_member",
            Constraint::chain([
                guest("internal_check_guest_exist"),
                guest("not internal_is_loyalty_member"),
            ]),
        )
}

pub fn customizable() -> DependencyRegistry {
    DependencyRegistry::new()
        .with_unconstrained("login_guest")
        .with("logout_guest", guest("logged_in_guest"))
        .with("book_room", guest("logged_in_guest"))
        .with("cancel_booking", guest("logged_in_guest"))
        .with(
            "place_room_service_order",
            Constraint::chain([
                guest("logged_in_guest"),
                booking("within_room_service_order_daily_limit"),
            ]),
        )
        .with("get_room_service_orders", guest("logged_in_guest"))
        .with(
            "register_loyalty_member",
            Constraint::chain([
                guest("logged_in_guest"),
                guest("not internal_is_loyalty_member"),
            ]),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_cover_the_same_actions() {
        let innate: Vec<_> = innate().actions().map(String::from).collect();
        let customizable: Vec<_> = customizable().actions().map(String::from).collect();
        assert_eq!(innate, customizable);
    }
}
