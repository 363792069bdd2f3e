//! Flutter bridge for the play date scheduler core.

pub mod api;
