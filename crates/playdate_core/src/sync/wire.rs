//! JSON shapes of the shared `children` and `dates` records.
//!
//! # Invariants
//! - Availability is written as `{"<date>-<time>": true}`; `false` is never written.
//! - A `false` value read from the store counts as absent.
//! - Decoding rejects malformed records as a whole instead of dropping parts.

use crate::model::date_window::{DateWindow, DateWindowError};
use crate::model::participant::{ContactDetails, Participant, ParticipantId};
use crate::model::slot::{SlotKey, SlotKeyParseError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum WireError {
    Json(serde_json::Error),
    InvalidData(String),
}

impl Display for WireError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "malformed shared record: {err}"),
            Self::InvalidData(message) => write!(f, "invalid shared record: {message}"),
        }
    }
}

impl Error for WireError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<serde_json::Error> for WireError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<SlotKeyParseError> for WireError {
    fn from(value: SlotKeyParseError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

impl From<DateWindowError> for WireError {
    fn from(value: DateWindowError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ParticipantRecord {
    id: ParticipantId,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
    #[serde(default)]
    availability: BTreeMap<String, bool>,
}

impl From<&Participant> for ParticipantRecord {
    fn from(participant: &Participant) -> Self {
        Self {
            id: participant.id.clone(),
            name: participant.name.clone(),
            phone: participant.phone.clone(),
            availability: participant
                .availability
                .iter()
                .map(|key| (key.to_string(), true))
                .collect(),
        }
    }
}

impl TryFrom<ParticipantRecord> for Participant {
    type Error = WireError;

    fn try_from(record: ParticipantRecord) -> Result<Self, Self::Error> {
        // Remote records may predate the phone requirement.
        let details = ContactDetails::parse(&record.name, record.phone.as_deref(), false)
            .map_err(|err| WireError::InvalidData(format!("participant {}: {err}", record.id)))?;

        let mut participant = Participant::with_id(record.id, details);
        for (key, available) in record.availability {
            if available {
                participant.availability.insert(key.parse::<SlotKey>()?);
            }
        }
        Ok(participant)
    }
}

pub fn encode_participants(participants: &[Participant]) -> Result<String, WireError> {
    let records = participants
        .iter()
        .map(ParticipantRecord::from)
        .collect::<Vec<_>>();
    Ok(serde_json::to_string(&records)?)
}

pub fn decode_participants(json: &str) -> Result<Vec<Participant>, WireError> {
    let records: Vec<ParticipantRecord> = serde_json::from_str(json)?;
    let mut seen = HashSet::new();
    let mut participants = Vec::with_capacity(records.len());

    for record in records {
        if !seen.insert(record.id.clone()) {
            return Err(WireError::InvalidData(format!(
                "duplicate participant id {}",
                record.id
            )));
        }
        participants.push(Participant::try_from(record)?);
    }
    Ok(participants)
}

pub fn encode_dates(window: &DateWindow) -> Result<String, WireError> {
    Ok(serde_json::to_string(window.dates())?)
}

pub fn decode_dates(json: &str) -> Result<DateWindow, WireError> {
    let dates: Vec<NaiveDate> = serde_json::from_str(json)?;
    Ok(DateWindow::from_dates(dates)?)
}
