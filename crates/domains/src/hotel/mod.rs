//! The hotel domain.
//!
//! Guests book rooms and order room service against those bookings. The
//! body carries its own notion of "today" so daily limits are reproducible.

pub mod database;
pub mod dependencies;
pub mod tracker;

use actguard_config::HotelConfig;
use actguard_core::{Args, Outcome, Result};
use actguard_deps::{DependencyRegistry, Domain, PredicateSet, SessionEffect, StrictWrapper, Surfaces};
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

pub use database::{Guest, HotelDatabase, Room, RoomServiceOrder};
pub use tracker::{HotelParameters, HotelStateTracker};

pub type StrictHotel = StrictWrapper<Hotel>;

/// Build a strict hotel from configuration.
pub fn strict_hotel(config: &HotelConfig, database: HotelDatabase, today: NaiveDate) -> Result<StrictHotel> {
    let mut customizable = dependencies::customizable();
    customizable.apply_overrides(DependencyRegistry::from_text_entries(&config.dependencies)?);
    let tracker = HotelStateTracker::new(HotelParameters::from(config));
    Ok(StrictWrapper::new(Hotel::new(database, today), tracker, customizable)?)
}

pub struct Hotel {
    database: HotelDatabase,
    today: NaiveDate,
    innate: DependencyRegistry,
    surfaces: Surfaces<Hotel, HotelStateTracker>,
}

impl std::fmt::Debug for Hotel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hotel")
            .field("guests", &self.database.guests.len())
            .field("rooms", &self.database.rooms.len())
            .field("today", &self.today)
            .finish()
    }
}

impl Hotel {
    pub fn new(database: HotelDatabase, today: NaiveDate) -> Self {
        Self {
            database,
            today,
            innate: dependencies::innate(),
            surfaces: surfaces(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Move the hotel clock, e.g. to start a new day of orders.
    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = today;
    }

    pub fn internal_get_database(&self) -> &HotelDatabase {
        &self.database
    }

    pub fn internal_check_guest_exist(&self, guest_name: &str) -> bool {
        self.database.guests.contains_key(guest_name)
    }

    pub fn internal_check_guest_password(&self, guest_name: &str, password: &str) -> bool {
        self.database
            .guests
            .get(guest_name)
            .is_some_and(|g| g.password == password)
    }

    pub fn internal_check_room_exist(&self, room_id: &str) -> bool {
        self.database.rooms.contains_key(room_id)
    }

    pub fn internal_check_room_available(&self, room_id: &str) -> bool {
        self.database
            .rooms
            .get(room_id)
            .is_some_and(|r| r.booked_by.is_none())
    }

    pub fn internal_check_booking_exist(&self, guest_name: &str, room_id: &str) -> bool {
        self.database.holds_booking(guest_name, room_id)
    }

    pub fn internal_is_loyalty_member(&self, guest_name: &str) -> bool {
        self.database
            .guests
            .get(guest_name)
            .is_some_and(|g| g.loyalty_member)
    }

    pub fn login_guest(&mut self, tracker: &HotelStateTracker, args: &Args) -> Result<Outcome<bool>> {
        if !self.innate_permits(tracker, "login_guest", args)? {
            return Ok(Outcome::Denied);
        }
        Ok(Outcome::Allowed(true))
    }

    pub fn logout_guest(&mut self, tracker: &HotelStateTracker, args: &Args) -> Result<Outcome<bool>> {
        if !self.innate_permits(tracker, "logout_guest", args)? {
            return Ok(Outcome::Denied);
        }
        Ok(Outcome::Allowed(true))
    }

    /// Returns the nightly rate of the booked room.
    pub fn book_room(&mut self, tracker: &HotelStateTracker, args: &Args) -> Result<Outcome<f64>> {
        const ACTION: &str = "book_room";
        if !self.innate_permits(tracker, ACTION, args)? {
            return Ok(Outcome::Denied);
        }
        let guest_name = args.require_str(ACTION, "guest_name")?;
        let room_id = args.require_str(ACTION, "room_id")?;
        Ok(match self.database.rooms.get_mut(room_id) {
            Some(room) => {
                room.booked_by = Some(guest_name.to_string());
                debug!(guest_name, room_id, "Booked room");
                Outcome::Allowed(room.nightly_rate)
            }
            None => Outcome::Denied,
        })
    }

    pub fn cancel_booking(&mut self, tracker: &HotelStateTracker, args: &Args) -> Result<Outcome<bool>> {
        const ACTION: &str = "cancel_booking";
        if !self.innate_permits(tracker, ACTION, args)? {
            return Ok(Outcome::Denied);
        }
        let room_id = args.require_str(ACTION, "room_id")?;
        Ok(match self.database.rooms.get_mut(room_id) {
            Some(room) => {
                room.booked_by = None;
                Outcome::Allowed(true)
            }
            None => Outcome::Denied,
        })
    }

    /// Returns how many orders the guest has placed for the room today.
    pub fn place_room_service_order(&mut self, tracker: &HotelStateTracker, args: &Args) -> Result<Outcome<usize>> {
        const ACTION: &str = "place_room_service_order";
        if !self.innate_permits(tracker, ACTION, args)? {
            return Ok(Outcome::Denied);
        }
        let guest_name = args.require_str(ACTION, "guest_name")?;
        let room_id = args.require_str(ACTION, "room_id")?;
        let item = args.require_str(ACTION, "item")?;
        self.database.room_service_orders.push(RoomServiceOrder {
            guest_name: guest_name.to_string(),
            room_id: room_id.to_string(),
            item: item.to_string(),
            placed_on: self.today,
        });
        Ok(Outcome::Allowed(self.database.orders_on(guest_name, room_id, self.today)))
    }

    pub fn get_room_service_orders(
        &self,
        tracker: &HotelStateTracker,
        args: &Args,
    ) -> Result<Outcome<Vec<RoomServiceOrder>>> {
        const ACTION: &str = "get_room_service_orders";
        if !self.innate_permits(tracker, ACTION, args)? {
            return Ok(Outcome::Denied);
        }
        let guest_name = args.require_str(ACTION, "guest_name")?;
        Ok(Outcome::Allowed(
            self.database
                .room_service_orders
                .iter()
                .filter(|o| o.guest_name == guest_name)
                .cloned()
                .collect(),
        ))
    }

    pub fn register_loyalty_member(&mut self, tracker: &HotelStateTracker, args: &Args) -> Result<Outcome<bool>> {
        const ACTION: &str = "register_loyalty_member";
        if !self.innate_permits(tracker, ACTION, args)? {
            return Ok(Outcome::Denied);
        }
        let guest_name = args.require_str(ACTION, "guest_name")?;
        Ok(match self.database.guests.get_mut(guest_name) {
            Some(guest) => {
                guest.loyalty_member = true;
                Outcome::Allowed(true)
            }
            None => Outcome::Denied,
        })
    }
}

impl Domain for Hotel {
    type Tracker = HotelStateTracker;

    const NAME: &'static str = "hotel";
    const ACTIONS: &'static [&'static str] = &[
        "login_guest",
        "logout_guest",
        "book_room",
        "cancel_booking",
        "place_room_service_order",
        "get_room_service_orders",
        "register_loyalty_member",
    ];

    fn innate(&self) -> &DependencyRegistry {
        &self.innate
    }

    fn surfaces(&self) -> &Surfaces<Self, HotelStateTracker> {
        &self.surfaces
    }

    fn session_effect(action: &str) -> Option<SessionEffect<HotelStateTracker>> {
        let effect: SessionEffect<HotelStateTracker> = match action {
            "login_guest" => login_effect,
            "logout_guest" => logout_effect,
            _ => return None,
        };
        Some(effect)
    }

    fn execute(&mut self, tracker: &HotelStateTracker, action: &str, args: &Args) -> Result<Outcome> {
        let outcome = match action {
            "login_guest" => self.login_guest(tracker, args)?.into_value()?,
            "logout_guest" => self.logout_guest(tracker, args)?.into_value()?,
            "book_room" => self.book_room(tracker, args)?.into_value()?,
            "cancel_booking" => self.cancel_booking(tracker, args)?.into_value()?,
            "place_room_service_order" => self.place_room_service_order(tracker, args)?.into_value()?,
            "get_room_service_orders" => self.get_room_service_orders(tracker, args)?.into_value()?,
            "register_loyalty_member" => self.register_loyalty_member(tracker, args)?.into_value()?,
            other => {
                warn!(action = other, "Hotel does not implement action");
                Outcome::Denied
            }
        };
        Ok(outcome)
    }

    fn snapshot(&self) -> Value {
        serde_json::to_value(&self.database).unwrap_or_default()
    }
}

fn login_effect(tracker: &mut HotelStateTracker, args: &Args) {
    if let Some(guest_name) = args.str("guest_name") {
        tracker.set_login_guest(guest_name);
    }
}

fn logout_effect(tracker: &mut HotelStateTracker, args: &Args) {
    if let Some(guest_name) = args.str("guest_name") {
        tracker.set_logout_guest(guest_name);
    }
}

fn surfaces() -> Surfaces<Hotel, HotelStateTracker> {
    let tracker = PredicateSet::new()
        .with("logged_in_guest", |_: &Hotel, t: &HotelStateTracker, a: &Args| {
            a.str("guest_name").is_some_and(|g| t.logged_in_guest(g))
        })
        .with(
            "within_room_service_order_daily_limit",
            |h: &Hotel, t: &HotelStateTracker, a: &Args| match (a.str("guest_name"), a.str("room_id")) {
                (Some(g), Some(r)) => t.within_room_service_order_daily_limit(&h.database, g, r, h.today),
                _ => false,
            },
        );

    let body = PredicateSet::new()
        .with("internal_check_guest_exist", |h: &Hotel, _: &HotelStateTracker, a: &Args| {
            a.str("guest_name").is_some_and(|g| h.internal_check_guest_exist(g))
        })
        .with("internal_check_guest_password", |h: &Hotel, _: &HotelStateTracker, a: &Args| {
            match (a.str("guest_name"), a.str("password")) {
                (Some(g), Some(p)) => h.internal_check_guest_password(g, p),
                _ => false,
            }
        })
        .with("internal_check_room_exist", |h: &Hotel, _: &HotelStateTracker, a: &Args| {
            a.str("room_id").is_some_and(|r| h.internal_check_room_exist(r))
        })
        .with("internal_check_room_available", |h: &Hotel, _: &HotelStateTracker, a: &Args| {
            a.str("room_id").is_some_and(|r| h.internal_check_room_available(r))
        })
        .with("internal_check_booking_exist", |h: &Hotel, _: &HotelStateTracker, a: &Args| {
            match (a.str("guest_name"), a.str("room_id")) {
                (Some(g), Some(r)) => h.internal_check_booking_exist(g, r),
                _ => false,
            }
        })
        .with("internal_is_loyalty_member", |h: &Hotel, _: &HotelStateTracker, a: &Args| {
            a.str("guest_name").is_some_and(|g| h.internal_is_loyalty_member(g))
        });

    Surfaces::new(tracker, body)
}
