//! Hotel session state.
//!
//! Several guests may be logged in at once, one session each.

use std::collections::BTreeSet;

use actguard_config::HotelConfig;
use actguard_deps::StateTracker;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::database::HotelDatabase;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelParameters {
    pub max_room_service_orders_per_day: u32,
}

impl Default for HotelParameters {
    fn default() -> Self {
        Self::from(&HotelConfig::default())
    }
}

impl From<&HotelConfig> for HotelParameters {
    fn from(config: &HotelConfig) -> Self {
        Self {
            max_room_service_orders_per_day: config.max_room_service_orders_per_day,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HotelStateTracker {
    logged_in_guests: BTreeSet<String>,
    parameters: HotelParameters,
}

impl HotelStateTracker {
    pub fn new(parameters: HotelParameters) -> Self {
        Self {
            logged_in_guests: BTreeSet::new(),
            parameters,
        }
    }

    pub fn parameters(&self) -> &HotelParameters {
        &self.parameters
    }

    pub fn set_login_guest(&mut self, guest_name: &str) {
        self.logged_in_guests.insert(guest_name.to_string());
    }

    pub fn set_logout_guest(&mut self, guest_name: &str) {
        self.logged_in_guests.remove(guest_name);
    }

    pub fn logged_in_guest(&self, guest_name: &str) -> bool {
        self.logged_in_guests.contains(guest_name)
    }

    pub fn within_room_service_order_daily_limit(
        &self,
        db: &HotelDatabase,
        guest_name: &str,
        room_id: &str,
        today: NaiveDate,
    ) -> bool {
        db.orders_on(guest_name, room_id, today) < self.parameters.max_room_service_orders_per_day as usize
    }
}

impl StateTracker for HotelStateTracker {
    fn dependency_parameters(&self) -> Value {
        serde_json::to_value(&self.parameters).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_are_per_guest() {
        let mut tracker = HotelStateTracker::default();
        tracker.set_login_guest("alice");
        tracker.set_login_guest("bob");
        tracker.set_logout_guest("alice");
        assert!(!tracker.logged_in_guest("alice"));
        assert!(tracker.logged_in_guest("bob"));
    }

    #[test]
    fn zero_limit_blocks_every_order() {
        let tracker = HotelStateTracker::new(HotelParameters {
            max_room_service_orders_per_day: 0,
        });
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert!(!tracker.within_room_service_order_daily_limit(&HotelDatabase::sample(), "bob", "102", today));
        assert_eq!(
            tracker.dependency_parameters(),
            serde_json::json!({"max_room_service_orders_per_day": 0})
        );
    }
}
