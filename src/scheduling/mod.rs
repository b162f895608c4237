//! Availability and booking on top of the appointment store.

pub mod availability;
pub mod booking;
pub mod store;

pub use availability::{open_slots, window_bounds, AvailabilityChecker, SlotGrid};
pub use booking::{validate_tc_number, Scheduler};
pub use store::{AppointmentStore, SqliteAppointmentStore};
