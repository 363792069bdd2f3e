//! Core availability engine for the play date scheduler.
//! Owns participant availability, derived slot queries, meeting-range detection
//! and synchronization with the shared remote record.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod session;
pub mod store;
pub mod sync;

pub use config::{ConfigError, IntensityRule, SchedulerConfig};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::date_window::{DateWindow, DateWindowError};
pub use model::participant::{Participant, ParticipantId, ParticipantValidationError};
pub use model::slot::SlotKey;
pub use model::time_grid::{time_grid, TimeSlot};
pub use query::aggregation::{AggregationEngine, RankedSlot, SlotIntensity};
pub use query::range::{detect_range, MeetingRange};
pub use session::Session;
pub use store::participant_store::{ParticipantStore, StoreError, StoreResult};
pub use sync::coordinator::{SaveStatus, SyncCoordinator, SyncError, SyncResult};
pub use sync::remote_store::{
    ChangeNotice, CollectionKey, RemoteError, RemoteResult, RemoteStore, SqliteRemoteStore,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
