//! Participant domain model.
//!
//! # Responsibility
//! - Define the record tracked for every child whose availability is collected.
//! - Normalize and validate name/phone input at construction time.
//!
//! # Invariants
//! - `id` is stable and never reused for another participant.
//! - `name` is trimmed and never empty.
//! - `phone` is trimmed; a blank phone is stored as `None`.
//! - `availability` only ever holds "available" keys (sparse set).

use crate::model::slot::SlotKey;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque participant identifier.
///
/// New ids are UUID v4 strings. Older clients wrote millisecond timestamps as
/// JSON numbers; those deserialize into their decimal string form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ParticipantId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ParticipantId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for ParticipantId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(u64),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Text(value) => Ok(Self(value)),
            RawId::Number(value) => Ok(Self(value.to_string())),
        }
    }
}

/// Validation errors for participant name/phone input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantValidationError {
    EmptyName,
    EmptyPhone,
}

impl Display for ParticipantValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "participant name cannot be empty"),
            Self::EmptyPhone => write!(f, "participant phone number is required"),
        }
    }
}

impl Error for ParticipantValidationError {}

/// Normalized name/phone pair accepted by add and update paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactDetails {
    pub name: String,
    pub phone: Option<String>,
}

impl ContactDetails {
    /// Trims input and enforces the emptiness rules.
    ///
    /// # Errors
    /// - `EmptyName` when `name` is blank.
    /// - `EmptyPhone` when `require_phone` is set and `phone` is missing or blank.
    pub fn parse(
        name: &str,
        phone: Option<&str>,
        require_phone: bool,
    ) -> Result<Self, ParticipantValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ParticipantValidationError::EmptyName);
        }

        let phone = phone
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        if require_phone && phone.is_none() {
            return Err(ParticipantValidationError::EmptyPhone);
        }

        Ok(Self {
            name: name.to_string(),
            phone,
        })
    }
}

/// One participant and the slots they marked as available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub phone: Option<String>,
    pub availability: BTreeSet<SlotKey>,
}

impl Participant {
    /// Creates a participant with a generated id and no availability.
    pub fn new(details: ContactDetails) -> Self {
        Self::with_id(ParticipantId::generate(), details)
    }

    /// Creates a participant with a caller-provided id.
    ///
    /// Used by reload paths where identity already exists remotely.
    pub fn with_id(id: ParticipantId, details: ContactDetails) -> Self {
        Self {
            id,
            name: details.name,
            phone: details.phone,
            availability: BTreeSet::new(),
        }
    }

    /// Replaces name and phone, keeping id and availability.
    pub fn apply_details(&mut self, details: ContactDetails) {
        self.name = details.name;
        self.phone = details.phone;
    }

    pub fn is_available(&self, date: NaiveDate, time: NaiveTime) -> bool {
        self.availability.contains(&SlotKey::new(date, time))
    }

    /// Flips one slot and returns whether it is now available.
    pub fn toggle(&mut self, key: SlotKey) -> bool {
        if self.availability.remove(&key) {
            false
        } else {
            self.availability.insert(key);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ContactDetails, Participant, ParticipantId, ParticipantValidationError};
    use crate::model::slot::SlotKey;
    use chrono::{NaiveDate, NaiveTime};

    fn slot() -> SlotKey {
        SlotKey::new(
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        )
    }

    #[test]
    fn parse_trims_and_drops_blank_phone() {
        let details = ContactDetails::parse("  Ann ", Some("   "), false).unwrap();
        assert_eq!(details.name, "Ann");
        assert_eq!(details.phone, None);
    }

    #[test]
    fn parse_rejects_blank_name_and_missing_required_phone() {
        assert_eq!(
            ContactDetails::parse(" ", Some("555-1"), true),
            Err(ParticipantValidationError::EmptyName)
        );
        assert_eq!(
            ContactDetails::parse("Ann", None, true),
            Err(ParticipantValidationError::EmptyPhone)
        );
    }

    #[test]
    fn toggle_twice_restores_availability() {
        let details = ContactDetails::parse("Ann", Some("555-1"), true).unwrap();
        let mut participant = Participant::new(details);
        let before = participant.availability.clone();

        assert!(participant.toggle(slot()));
        assert!(!participant.toggle(slot()));
        assert_eq!(participant.availability, before);
    }

    #[test]
    fn id_deserializes_from_number_or_string() {
        let from_number: ParticipantId = serde_json::from_str("1718000000000").unwrap();
        assert_eq!(from_number.as_str(), "1718000000000");
        let from_text: ParticipantId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(from_text, ParticipantId::from("abc"));
    }
}
