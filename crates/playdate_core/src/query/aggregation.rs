//! Derived availability queries.
//!
//! # Responsibility
//! - Answer "who is free at this cell" over the current session state.
//! - Classify cells for coloring and rank the best cells in the window.
//!
//! # Invariants
//! - Nothing is cached: every call reads the current store and window.
//! - Participant order always follows store iteration order.
//! - Ranking ties keep chronological (date, time) order.

use crate::config::IntensityRule;
use crate::model::date_window::DateWindow;
use crate::model::participant::Participant;
use crate::model::time_grid::{time_grid, TimeSlot};
use crate::store::participant_store::ParticipantStore;
use chrono::{NaiveDate, NaiveTime};

/// Coloring tier of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotIntensity {
    Empty,
    Partial,
    Full,
}

/// One ranked cell returned by `top_slots`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedSlot<'a> {
    pub date: NaiveDate,
    pub slot: &'static TimeSlot,
    pub participants: Vec<&'a Participant>,
}

impl RankedSlot<'_> {
    pub fn count(&self) -> usize {
        self.participants.len()
    }

    /// Comma-joined participant names, in store order.
    pub fn names(&self) -> String {
        join_names(&self.participants)
    }
}

/// Read-only view over a participant store and a date window.
#[derive(Debug, Clone, Copy)]
pub struct AggregationEngine<'a> {
    store: &'a ParticipantStore,
    window: &'a DateWindow,
    rule: IntensityRule,
}

impl<'a> AggregationEngine<'a> {
    pub fn new(store: &'a ParticipantStore, window: &'a DateWindow) -> Self {
        Self::with_rule(store, window, IntensityRule::default())
    }

    pub fn with_rule(
        store: &'a ParticipantStore,
        window: &'a DateWindow,
        rule: IntensityRule,
    ) -> Self {
        Self {
            store,
            window,
            rule,
        }
    }

    /// Participants whose availability contains `(date, time)`.
    pub fn available_at(&self, date: NaiveDate, time: NaiveTime) -> Vec<&'a Participant> {
        self.store
            .iter()
            .filter(|participant| participant.is_available(date, time))
            .collect()
    }

    pub fn classify(&self, date: NaiveDate, time: NaiveTime) -> SlotIntensity {
        let count = self.available_at(date, time).len();
        classify_count(count, self.store.len(), self.rule)
    }

    /// Whether the selected participant is available at the cell.
    pub fn current_available(&self, date: NaiveDate, time: NaiveTime) -> bool {
        self.store
            .selected()
            .is_some_and(|participant| participant.is_available(date, time))
    }

    /// Comma-joined names of everyone available at the cell (hover text).
    pub fn names_at(&self, date: NaiveDate, time: NaiveTime) -> String {
        join_names(&self.available_at(date, time))
    }

    /// Best `limit` cells of the window, most participants first.
    ///
    /// Empty cells never appear. Equal counts keep their chronological order.
    pub fn top_slots(&self, limit: usize) -> Vec<RankedSlot<'a>> {
        let mut ranked = Vec::new();
        for date in self.window.dates() {
            for slot in time_grid() {
                let participants = self.available_at(*date, slot.time);
                if !participants.is_empty() {
                    ranked.push(RankedSlot {
                        date: *date,
                        slot,
                        participants,
                    });
                }
            }
        }

        // `sort_by` is stable, so the enumeration order breaks ties.
        ranked.sort_by(|a, b| b.count().cmp(&a.count()));
        ranked.truncate(limit);
        ranked
    }
}

/// Maps an available count onto a tier.
///
/// `total` is the number of participants in the store and only matters for
/// `IntensityRule::Share`.
pub fn classify_count(count: usize, total: usize, rule: IntensityRule) -> SlotIntensity {
    if count == 0 {
        return SlotIntensity::Empty;
    }

    let full = match rule {
        IntensityRule::Count { full_min } => count >= full_min.max(1),
        IntensityRule::Share { full_ratio } => {
            total > 0 && count as f64 / total as f64 >= full_ratio
        }
    };
    if full {
        SlotIntensity::Full
    } else {
        SlotIntensity::Partial
    }
}

fn join_names(participants: &[&Participant]) -> String {
    participants
        .iter()
        .map(|participant| participant.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
