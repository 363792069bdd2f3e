//! Pure queries recomputed from session state on demand.

pub mod aggregation;
pub mod range;
