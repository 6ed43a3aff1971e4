//! Hotel records.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guest {
    pub password: String,
    #[serde(default)]
    pub loyalty_member: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub nightly_rate: f64,
    /// Guest currently holding the room.
    #[serde(default)]
    pub booked_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomServiceOrder {
    pub guest_name: String,
    pub room_id: String,
    pub item: String,
    pub placed_on: NaiveDate,
}

/// Guests, rooms, and the room-service ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotelDatabase {
    pub guests: BTreeMap<String, Guest>,
    pub rooms: BTreeMap<String, Room>,
    #[serde(default)]
    pub room_service_orders: Vec<RoomServiceOrder>,
}

impl HotelDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_guest(mut self, name: impl Into<String>, guest: Guest) -> Self {
        self.guests.insert(name.into(), guest);
        self
    }

    pub fn with_room(mut self, room_id: impl Into<String>, room: Room) -> Self {
        self.rooms.insert(room_id.into(), room);
        self
    }

    /// The fixture used across tests and demos. Bob holds room 102.
    pub fn sample() -> Self {
        let guest = |password: &str, loyalty_member| Guest {
            password: password.into(),
            loyalty_member,
        };
        let room = |nightly_rate, booked_by: Option<&str>| Room {
            nightly_rate,
            booked_by: booked_by.map(String::from),
        };
        Self::new()
            .with_guest("alice", guest("p", false))
            .with_guest("bob", guest("b", true))
            .with_room("101", room(120.0, None))
            .with_room("102", room(150.0, Some("bob")))
            .with_room("201", room(300.0, None))
    }

    /// Whether `guest_name` currently holds `room_id`.
    pub fn holds_booking(&self, guest_name: &str, room_id: &str) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|r| r.booked_by.as_deref() == Some(guest_name))
    }

    /// Orders placed by a guest for a room on a given day.
    pub fn orders_on(&self, guest_name: &str, room_id: &str, day: NaiveDate) -> usize {
        self.room_service_orders
            .iter()
            .filter(|o| o.guest_name == guest_name && o.room_id == room_id && o.placed_on == day)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_bookings() {
        let db = HotelDatabase::sample();
        assert!(db.holds_booking("bob", "102"));
        assert!(!db.holds_booking("alice", "102"));
        assert!(!db.holds_booking("bob", "999"));
    }

    #[test]
    fn orders_are_counted_per_day() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut db = HotelDatabase::sample();
        for placed_on in [day, day, day.succ_opt().unwrap()] {
            db.room_service_orders.push(RoomServiceOrder {
                guest_name: "bob".into(),
                room_id: "102".into(),
                item: "tea".into(),
                placed_on,
            });
        }
        assert_eq!(db.orders_on("bob", "102", day), 2);
        assert_eq!(db.orders_on("alice", "102", day), 0);
    }
}
