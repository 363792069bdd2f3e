//! Remote mirroring of session state.
//!
//! # Responsibility
//! - Define the shared store contract and its SQLite implementation.
//! - Encode/decode the persisted JSON shapes.
//! - Coordinate saves, loads and change-driven reloads.
//!
//! # Invariants
//! - Cross-client conflicts resolve as last writer wins per collection key.

pub mod coordinator;
pub mod remote_store;
pub mod wire;
