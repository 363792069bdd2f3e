//! Owned session context.
//!
//! # Responsibility
//! - Hold the participant store, date window and configuration for one session.
//! - Give the query engines a single place to read state from.
//!
//! # Invariants
//! - Replacing the date window never mutates participant availability.
//! - A session is created by `init` and ended by `teardown`; there is no
//!   process-global session state in core.

use crate::config::SchedulerConfig;
use crate::model::date_window::DateWindow;
use crate::model::participant::Participant;
use crate::query::aggregation::{AggregationEngine, RankedSlot};
use crate::query::range::{detect_range, MeetingRange};
use crate::store::participant_store::ParticipantStore;
use chrono::{NaiveDate, NaiveTime};
use log::info;

#[derive(Debug, Clone)]
pub struct Session {
    config: SchedulerConfig,
    participants: ParticipantStore,
    window: DateWindow,
}

impl Session {
    /// Starts a session with an empty store and the default window from `today`.
    pub fn init(config: SchedulerConfig, today: NaiveDate) -> Self {
        let window = DateWindow::starting_at(today, config.default_window_days);
        info!(
            "event=session_init module=session status=ok window_start={} window_days={}",
            window.start(),
            window.len()
        );
        Self {
            participants: ParticipantStore::new(config.require_phone),
            window,
            config,
        }
    }

    /// Ends the session, releasing its state.
    pub fn teardown(self) {
        info!(
            "event=session_teardown module=session status=ok participants={} unsaved={}",
            self.participants.len(),
            self.participants.is_dirty()
        );
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn participants(&self) -> &ParticipantStore {
        &self.participants
    }

    pub fn participants_mut(&mut self) -> &mut ParticipantStore {
        &mut self.participants
    }

    pub fn window(&self) -> &DateWindow {
        &self.window
    }

    /// Replaces the displayed dates wholesale.
    pub fn set_window(&mut self, window: DateWindow) {
        self.window = window;
    }

    /// Swaps in a reloaded remote snapshot.
    pub fn replace_remote_state(&mut self, participants: Vec<Participant>, window: DateWindow) {
        self.participants.replace_all(participants);
        self.window = window;
    }

    pub fn aggregation(&self) -> AggregationEngine<'_> {
        AggregationEngine::with_rule(&self.participants, &self.window, self.config.intensity_rule)
    }

    /// Top cells using the configured limit unless one is given.
    pub fn top_slots(&self, limit: Option<usize>) -> Vec<RankedSlot<'_>> {
        self.aggregation()
            .top_slots(limit.unwrap_or(self.config.top_slot_limit))
    }

    /// Meeting window around a cell for the selected participant.
    pub fn propose_range(&self, date: NaiveDate, time: NaiveTime) -> Option<MeetingRange> {
        let current = self.participants.selected_id()?;
        detect_range(&self.participants, current, date, time)
    }
}
