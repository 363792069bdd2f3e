//! Domain model for participant availability.
//!
//! # Responsibility
//! - Define participants, slot keys, the time grid and the date window.
//! - Keep validation at construction time instead of at point of use.
//!
//! # Invariants
//! - Availability is a sparse set: absence of a key means "unavailable".
//! - The time grid is a process-wide constant.

pub mod date_window;
pub mod participant;
pub mod slot;
pub mod time_grid;
