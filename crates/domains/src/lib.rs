//! Reference domains for the actguard dependency engine.
//!
//! Each domain provides a body (records and actions), a state tracker, the
//! default innate and customizable dependency tables, and a constructor that
//! wraps everything in a [`StrictWrapper`](actguard_deps::StrictWrapper)
//! using the loaded configuration.

pub mod bank;
pub mod hotel;

pub use bank::{Bank, BankDatabase, BankStateTracker, StrictBank, strict_bank};
pub use hotel::{Hotel, HotelDatabase, HotelStateTracker, StrictHotel, strict_hotel};
