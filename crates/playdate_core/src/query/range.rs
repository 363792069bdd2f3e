//! Contiguous meeting-window detection.
//!
//! # Responsibility
//! - Grow a clicked cell into the widest run of adjacent grid slots that keeps
//!   the same group of other participants together with the current one.
//!
//! # Invariants
//! - Expansion requires the current participant at every included slot.
//! - Expansion requires `others(slot) ⊇ others(anchor)`; extra people at a slot
//!   do not stop the walk, and are never added to the reported group.
//! - "No range" is a normal outcome, not an error.

use crate::model::participant::{Participant, ParticipantId};
use crate::model::time_grid::{end_label, slot_index, time_grid, SLOT_MINUTES};
use crate::store::participant_store::ParticipantStore;
use chrono::{Duration, NaiveDate, NaiveTime};
use std::collections::BTreeSet;

/// Proposed meeting window on one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingRange {
    pub date: NaiveDate,
    pub start: NaiveTime,
    /// End of the last included half-hour.
    pub end: NaiveTime,
    pub start_display: String,
    pub end_display: String,
    /// The other participants available at the anchor slot, in store order.
    pub participants: Vec<Participant>,
}

impl MeetingRange {
    /// Phone numbers of the reported participants, skipping those without one.
    pub fn phones(&self) -> Vec<&str> {
        self.participants
            .iter()
            .filter_map(|participant| participant.phone.as_deref())
            .collect()
    }

    /// Number of half-hour slots covered.
    pub fn slot_count(&self) -> usize {
        let minutes = (self.end - self.start).num_minutes();
        usize::try_from(minutes / SLOT_MINUTES).unwrap_or(0)
    }
}

/// Computes the meeting window around `(date, time)` for `current`.
///
/// Returns `None` when fewer than two participants are free at the clicked
/// cell, when `current` is not one of them, or when `time` is off-grid.
pub fn detect_range(
    store: &ParticipantStore,
    current: &ParticipantId,
    date: NaiveDate,
    time: NaiveTime,
) -> Option<MeetingRange> {
    let anchor = slot_index(time)?;
    let current_participant = store.get(current)?;

    let available = store
        .iter()
        .filter(|participant| participant.is_available(date, time))
        .count();
    if available < 2 || !current_participant.is_available(date, time) {
        return None;
    }

    let base = others_at(store, current, date, time);
    if base.is_empty() {
        return None;
    }

    let grid = time_grid();
    let qualifies = |index: usize| {
        let slot_time = grid[index].time;
        current_participant.is_available(date, slot_time)
            && others_at(store, current, date, slot_time).is_superset(&base)
    };

    let mut first = anchor;
    while first > 0 && qualifies(first - 1) {
        first -= 1;
    }
    let mut last = anchor;
    while last + 1 < grid.len() && qualifies(last + 1) {
        last += 1;
    }

    let participants = store
        .iter()
        .filter(|participant| base.contains(&participant.id))
        .cloned()
        .collect();

    Some(MeetingRange {
        date,
        start: grid[first].time,
        end: grid[last].time + Duration::minutes(SLOT_MINUTES),
        start_display: grid[first].display.clone(),
        end_display: end_label(last)?,
        participants,
    })
}

fn others_at<'a>(
    store: &'a ParticipantStore,
    current: &ParticipantId,
    date: NaiveDate,
    time: NaiveTime,
) -> BTreeSet<&'a ParticipantId> {
    store
        .iter()
        .filter(|participant| &participant.id != current && participant.is_available(date, time))
        .map(|participant| &participant.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::detect_range;
    use crate::model::participant::ParticipantId;
    use crate::store::participant_store::ParticipantStore;
    use chrono::{NaiveDate, NaiveTime};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 21).unwrap()
    }

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn mark(store: &mut ParticipantStore, id: &ParticipantId, times: &[(u32, u32)]) {
        for (hour, minute) in times {
            store.toggle_slot(id, day(), at(*hour, *minute)).unwrap();
        }
    }

    #[test]
    fn shrinking_group_stops_expansion() {
        let mut store = ParticipantStore::new(true);
        let a = store.add("A", Some("555-1")).unwrap();
        let b = store.add("B", Some("555-2")).unwrap();
        let c = store.add("C", Some("555-3")).unwrap();
        mark(&mut store, &a.id, &[(10, 0), (10, 30)]);
        mark(&mut store, &b.id, &[(10, 0), (10, 30)]);
        mark(&mut store, &c.id, &[(10, 0)]);

        let range = detect_range(&store, &a.id, day(), at(10, 0)).unwrap();
        assert_eq!(range.start_display, "10:00 AM");
        assert_eq!(range.end_display, "10:30 AM");
        assert_eq!(range.slot_count(), 1);
        let names = range
            .participants
            .iter()
            .map(|participant| participant.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["B", "C"]);
        assert_eq!(range.phones(), vec!["555-2", "555-3"]);
    }

    #[test]
    fn expands_both_ways_and_tolerates_extra_people() {
        let mut store = ParticipantStore::new(false);
        let a = store.add("A", None).unwrap();
        let b = store.add("B", None).unwrap();
        let c = store.add("C", None).unwrap();
        mark(&mut store, &a.id, &[(9, 30), (10, 0), (10, 30), (11, 0), (11, 30)]);
        mark(&mut store, &b.id, &[(10, 0), (10, 30), (11, 0), (11, 30)]);
        // C joins only at 11:00, which must not stop the walk.
        mark(&mut store, &c.id, &[(11, 0)]);

        let range = detect_range(&store, &a.id, day(), at(10, 30)).unwrap();
        assert_eq!(range.start, at(10, 0));
        assert_eq!(range.end, at(12, 0));
        assert_eq!(range.start_display, "10:00 AM");
        assert_eq!(range.end_display, "12:00 PM");
        assert_eq!(range.participants.len(), 1);
        assert_eq!(range.participants[0].id, b.id);
    }

    #[test]
    fn stops_where_current_participant_is_busy() {
        let mut store = ParticipantStore::new(false);
        let a = store.add("A", None).unwrap();
        let b = store.add("B", None).unwrap();
        mark(&mut store, &a.id, &[(14, 0), (15, 0)]);
        mark(&mut store, &b.id, &[(14, 0), (14, 30), (15, 0)]);

        let range = detect_range(&store, &a.id, day(), at(14, 0)).unwrap();
        assert_eq!(range.end_display, "2:30 PM");
    }

    #[test]
    fn reaches_grid_boundaries() {
        let mut store = ParticipantStore::new(false);
        let a = store.add("A", None).unwrap();
        let b = store.add("B", None).unwrap();
        mark(&mut store, &a.id, &[(19, 30), (20, 0)]);
        mark(&mut store, &b.id, &[(19, 30), (20, 0)]);

        let range = detect_range(&store, &a.id, day(), at(20, 0)).unwrap();
        assert_eq!(range.start_display, "7:30 PM");
        assert_eq!(range.end_display, "8:30 PM");
    }

    #[test]
    fn returns_none_when_preconditions_fail() {
        let mut store = ParticipantStore::new(false);
        let a = store.add("A", None).unwrap();
        let b = store.add("B", None).unwrap();
        let c = store.add("C", None).unwrap();

        // Only one participant free.
        mark(&mut store, &a.id, &[(9, 0)]);
        assert!(detect_range(&store, &a.id, day(), at(9, 0)).is_none());

        // Two free, but not the current participant.
        mark(&mut store, &b.id, &[(12, 0)]);
        mark(&mut store, &c.id, &[(12, 0)]);
        assert!(detect_range(&store, &a.id, day(), at(12, 0)).is_none());

        // Off-grid time and unknown participant.
        assert!(detect_range(&store, &a.id, day(), at(9, 15)).is_none());
        let missing = ParticipantId::from("missing");
        assert!(detect_range(&store, &missing, day(), at(12, 0)).is_none());
    }
}
