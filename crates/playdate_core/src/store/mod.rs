//! Local optimistic state.
//!
//! # Responsibility
//! - Hold participant records and selection for one session.
//! - Apply add/update/remove/toggle mutations synchronously.
//!
//! # Invariants
//! - Local reads always observe every prior local write.
//! - Validation happens before mutation; errors leave state untouched.

pub mod participant_store;
