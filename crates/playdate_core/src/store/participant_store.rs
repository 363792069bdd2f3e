//! In-memory participant records and selection.
//!
//! # Responsibility
//! - Own every participant record and its availability set.
//! - Track the "currently selected" participant.
//! - Flag the snapshot dirty whenever a mutation lands.
//!
//! # Invariants
//! - Ids are unique; iteration order is insertion order.
//! - The selection, when set, always names an existing record.
//! - Failed operations never mutate state.

use crate::model::participant::{
    ContactDetails, Participant, ParticipantId, ParticipantValidationError,
};
use crate::model::slot::SlotKey;
use crate::model::time_grid::{slot_index, time_grid};
use chrono::{NaiveDate, NaiveTime};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Validation(ParticipantValidationError),
    NotFound(ParticipantId),
    /// Time does not start a grid slot.
    OffGrid(NaiveTime),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "participant not found: {id}"),
            Self::OffGrid(time) => write!(f, "{} is not a slot start", time.format("%H:%M")),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) | Self::OffGrid(_) => None,
        }
    }
}

impl From<ParticipantValidationError> for StoreError {
    fn from(value: ParticipantValidationError) -> Self {
        Self::Validation(value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParticipantStore {
    participants: Vec<Participant>,
    selected: Option<ParticipantId>,
    require_phone: bool,
    dirty: bool,
}

impl ParticipantStore {
    pub fn new(require_phone: bool) -> Self {
        Self {
            require_phone,
            ..Self::default()
        }
    }

    /// Adds a participant and makes it the current selection.
    ///
    /// # Errors
    /// - `Validation` when the name (or a required phone) is blank.
    pub fn add(&mut self, name: &str, phone: Option<&str>) -> StoreResult<Participant> {
        let details = ContactDetails::parse(name, phone, self.require_phone)?;
        let participant = Participant::new(details);

        self.participants.push(participant.clone());
        self.selected = Some(participant.id.clone());
        self.dirty = true;
        debug!(
            "event=participant_add module=store status=ok id={} count={}",
            participant.id,
            self.participants.len()
        );
        Ok(participant)
    }

    /// Renames / re-phones a participant, keeping its availability.
    pub fn update(
        &mut self,
        id: &ParticipantId,
        name: &str,
        phone: Option<&str>,
    ) -> StoreResult<Participant> {
        let require_phone = self.require_phone;
        let participant = self.find_mut(id)?;
        let details = ContactDetails::parse(name, phone, require_phone)?;
        participant.apply_details(details);
        let updated = participant.clone();

        self.dirty = true;
        debug!("event=participant_update module=store status=ok id={id}");
        Ok(updated)
    }

    /// Deletes a participant. Unknown ids are a no-op.
    pub fn remove(&mut self, id: &ParticipantId) {
        let before = self.participants.len();
        self.participants.retain(|participant| &participant.id != id);
        if self.participants.len() == before {
            return;
        }

        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        self.dirty = true;
        debug!(
            "event=participant_remove module=store status=ok id={id} count={}",
            self.participants.len()
        );
    }

    /// Flips one slot; returns whether the participant is now available there.
    ///
    /// # Errors
    /// - `OffGrid` when `time` is not one of the grid's slot starts.
    /// - `NotFound` when `id` names no participant.
    pub fn toggle_slot(
        &mut self,
        id: &ParticipantId,
        date: NaiveDate,
        time: NaiveTime,
    ) -> StoreResult<bool> {
        if slot_index(time).is_none() {
            return Err(StoreError::OffGrid(time));
        }
        let available = self.find_mut(id)?.toggle(SlotKey::new(date, time));
        self.dirty = true;
        Ok(available)
    }

    /// Fills every grid slot of `date`, or clears them all when the day is already full.
    ///
    /// Returns whether the day ended up filled.
    pub fn toggle_all_slots_for_date(
        &mut self,
        id: &ParticipantId,
        date: NaiveDate,
    ) -> StoreResult<bool> {
        let participant = self.find_mut(id)?;
        let keys = time_grid()
            .iter()
            .map(|slot| SlotKey::new(date, slot.time))
            .collect::<Vec<_>>();

        // One snapshot decides the direction for the whole day.
        let all_selected = keys
            .iter()
            .all(|key| participant.availability.contains(key));
        if all_selected {
            for key in &keys {
                participant.availability.remove(key);
            }
        } else {
            participant.availability.extend(keys);
        }

        self.dirty = true;
        debug!(
            "event=participant_toggle_day module=store status=ok id={id} date={date} filled={}",
            !all_selected
        );
        Ok(!all_selected)
    }

    /// Whether every grid slot of `date` is marked for `id`.
    pub fn day_is_full(&self, id: &ParticipantId, date: NaiveDate) -> bool {
        self.get(id).is_some_and(|participant| {
            time_grid()
                .iter()
                .all(|slot| participant.is_available(date, slot.time))
        })
    }

    pub fn select(&mut self, id: &ParticipantId) -> StoreResult<()> {
        if self.get(id).is_none() {
            return Err(StoreError::NotFound(id.clone()));
        }
        self.selected = Some(id.clone());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected_id(&self) -> Option<&ParticipantId> {
        self.selected.as_ref()
    }

    pub fn selected(&self) -> Option<&Participant> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|participant| &participant.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    pub fn as_slice(&self) -> &[Participant] {
        &self.participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Replaces every record with a reloaded snapshot.
    ///
    /// The selection survives when its id is still present. The store is clean
    /// afterwards: anything not yet saved is gone.
    pub fn replace_all(&mut self, participants: Vec<Participant>) {
        self.participants = participants;
        if let Some(id) = &self.selected {
            if self.get(id).is_none() {
                self.selected = None;
            }
        }
        self.dirty = false;
    }

    /// Whether local mutations happened since the last save or reload.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn find_mut(&mut self, id: &ParticipantId) -> StoreResult<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|participant| &participant.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::{ParticipantStore, StoreError};
    use crate::model::participant::{ParticipantId, ParticipantValidationError};
    use crate::model::time_grid::time_grid;
    use chrono::{NaiveDate, NaiveTime};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()
    }

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn add_selects_new_participant_and_marks_dirty() {
        let mut store = ParticipantStore::new(true);
        let ann = store.add("Ann", Some("555-1")).unwrap();
        assert_eq!(store.selected_id(), Some(&ann.id));
        assert!(store.is_dirty());

        let bo = store.add("Bo", Some("555-2")).unwrap();
        assert_ne!(ann.id, bo.id);
        assert_eq!(store.selected_id(), Some(&bo.id));
    }

    #[test]
    fn add_rejects_blank_input_without_mutating() {
        let mut store = ParticipantStore::new(true);
        let err = store.add("Ann", Some(" ")).unwrap_err();
        assert_eq!(
            err,
            StoreError::Validation(ParticipantValidationError::EmptyPhone)
        );
        assert!(store.is_empty());
        assert!(!store.is_dirty());
        assert!(store.selected_id().is_none());
    }

    #[test]
    fn phone_is_optional_when_not_required() {
        let mut store = ParticipantStore::new(false);
        let ann = store.add("Ann", None).unwrap();
        assert_eq!(ann.phone, None);
    }

    #[test]
    fn update_keeps_availability_and_reports_missing_ids() {
        let mut store = ParticipantStore::new(true);
        let ann = store.add("Ann", Some("555-1")).unwrap();
        store.toggle_slot(&ann.id, day(), at(10, 0)).unwrap();

        let updated = store.update(&ann.id, "Annie", Some("555-9")).unwrap();
        assert_eq!(updated.name, "Annie");
        assert_eq!(updated.phone.as_deref(), Some("555-9"));
        assert_eq!(updated.availability.len(), 1);

        let missing = ParticipantId::from("missing");
        assert_eq!(
            store.update(&missing, "X", Some("1")).unwrap_err(),
            StoreError::NotFound(missing)
        );
        assert!(matches!(
            store.update(&ann.id, "", Some("1")),
            Err(StoreError::Validation(ParticipantValidationError::EmptyName))
        ));
        assert_eq!(store.get(&ann.id).unwrap().name, "Annie");
    }

    #[test]
    fn remove_is_idempotent_and_clears_selection() {
        let mut store = ParticipantStore::new(true);
        let ann = store.add("Ann", Some("555-1")).unwrap();
        let bo = store.add("Bo", Some("555-2")).unwrap();
        store.select(&ann.id).unwrap();

        store.remove(&bo.id);
        assert_eq!(store.selected_id(), Some(&ann.id));
        store.remove(&ann.id);
        assert!(store.selected_id().is_none());
        store.remove(&ann.id);
        assert!(store.is_empty());
    }

    #[test]
    fn toggle_slot_round_trips_and_rejects_unknown_ids() {
        let mut store = ParticipantStore::new(true);
        let ann = store.add("Ann", Some("555-1")).unwrap();

        assert!(store.toggle_slot(&ann.id, day(), at(14, 0)).unwrap());
        assert!(!store.toggle_slot(&ann.id, day(), at(14, 0)).unwrap());
        assert!(store.get(&ann.id).unwrap().availability.is_empty());

        let missing = ParticipantId::from("missing");
        assert!(matches!(
            store.toggle_slot(&missing, day(), at(14, 0)),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn toggle_slot_rejects_times_outside_the_grid() {
        let mut store = ParticipantStore::new(true);
        let ann = store.add("Ann", Some("555-1")).unwrap();
        store.mark_clean();

        for time in [at(9, 15), at(8, 30), at(20, 30)] {
            assert_eq!(
                store.toggle_slot(&ann.id, day(), time),
                Err(StoreError::OffGrid(time))
            );
        }
        assert!(store.get(&ann.id).unwrap().availability.is_empty());
        assert!(!store.is_dirty());
        assert_eq!(
            StoreError::OffGrid(at(9, 15)).to_string(),
            "09:15 is not a slot start"
        );
    }

    #[test]
    fn toggle_day_fills_partial_day_then_clears_it() {
        let mut store = ParticipantStore::new(true);
        let ann = store.add("Ann", Some("555-1")).unwrap();
        for slot in time_grid().iter().skip(1) {
            store.toggle_slot(&ann.id, day(), slot.time).unwrap();
        }
        assert!(!store.day_is_full(&ann.id, day()));

        assert!(store.toggle_all_slots_for_date(&ann.id, day()).unwrap());
        assert!(store.day_is_full(&ann.id, day()));
        assert_eq!(
            store.get(&ann.id).unwrap().availability.len(),
            time_grid().len()
        );

        assert!(!store.toggle_all_slots_for_date(&ann.id, day()).unwrap());
        assert!(store.get(&ann.id).unwrap().availability.is_empty());
    }

    #[test]
    fn toggle_day_twice_restores_previous_state_of_other_days() {
        let mut store = ParticipantStore::new(true);
        let ann = store.add("Ann", Some("555-1")).unwrap();
        let other_day = day().succ_opt().unwrap();
        store.toggle_slot(&ann.id, other_day, at(9, 0)).unwrap();
        let before = store.get(&ann.id).unwrap().availability.clone();

        store.toggle_all_slots_for_date(&ann.id, day()).unwrap();
        store.toggle_all_slots_for_date(&ann.id, day()).unwrap();
        assert_eq!(store.get(&ann.id).unwrap().availability, before);
    }

    #[test]
    fn replace_all_drops_stale_selection_and_cleans() {
        let mut store = ParticipantStore::new(true);
        let ann = store.add("Ann", Some("555-1")).unwrap();
        store.replace_all(Vec::new());
        assert!(store.selected_id().is_none());
        assert!(!store.is_dirty());
        assert!(store.select(&ann.id).is_err());
    }
}
