//! Bookable time-of-day slots.
//!
//! # Invariants
//! - The grid runs from 09:00 to 20:00 inclusive in 30-minute steps.
//! - Order is fixed for the process lifetime; index adjacency means time adjacency.

use crate::model::slot::format_time;
use chrono::{Duration, NaiveTime};
use once_cell::sync::Lazy;

const FIRST_HOUR: u32 = 9;
const LAST_HOUR: u32 = 20;
/// Length of one slot in minutes.
pub const SLOT_MINUTES: i64 = 30;

static TIME_GRID: Lazy<Vec<TimeSlot>> = Lazy::new(build_grid);

/// One bookable half-hour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSlot {
    pub time: NaiveTime,
    /// 24-hour `HH:MM` key used inside slot keys.
    pub key: String,
    /// 12-hour label, e.g. `9:30 AM`.
    pub display: String,
}

/// Returns the process-wide slot sequence.
pub fn time_grid() -> &'static [TimeSlot] {
    &TIME_GRID
}

/// Position of `time` in the grid, if it is a bookable slot start.
pub fn slot_index(time: NaiveTime) -> Option<usize> {
    TIME_GRID.iter().position(|slot| slot.time == time)
}

/// Label for the end of the slot at `index` (its start plus one slot length).
pub fn end_label(index: usize) -> Option<String> {
    TIME_GRID
        .get(index)
        .map(|slot| display_label(slot.time + Duration::minutes(SLOT_MINUTES)))
}

/// Formats a time of day as a 12-hour label.
pub fn display_label(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

fn build_grid() -> Vec<TimeSlot> {
    let first = NaiveTime::from_hms_opt(FIRST_HOUR, 0, 0).unwrap_or_default();
    let last = NaiveTime::from_hms_opt(LAST_HOUR, 0, 0).unwrap_or_default();

    let mut slots = Vec::new();
    let mut time = first;
    while time <= last {
        slots.push(TimeSlot {
            time,
            key: format_time(time),
            display: display_label(time),
        });
        time += Duration::minutes(SLOT_MINUTES);
    }
    slots
}
