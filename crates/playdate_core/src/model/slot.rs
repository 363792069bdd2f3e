//! Availability cell identifier.
//!
//! A `SlotKey` names one half-hour on one calendar date. Its wire form is
//! `"<YYYY-MM-DD>-<HH:MM>"`, matching the keys of the persisted availability map.

use chrono::{NaiveDate, NaiveTime};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl SlotKey {
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self { date, time }
    }
}

impl Display for SlotKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}",
            self.date.format(DATE_FORMAT),
            self.time.format(TIME_FORMAT)
        )
    }
}

/// Rejected slot key text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotKeyParseError(pub String);

impl Display for SlotKeyParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid slot key `{}`", self.0)
    }
}

impl Error for SlotKeyParseError {}

impl FromStr for SlotKey {
    type Err = SlotKeyParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || SlotKeyParseError(value.to_string());
        // Dates contain dashes, times never do.
        let (date, time) = value.rsplit_once('-').ok_or_else(invalid)?;
        Ok(Self {
            date: parse_date(date).ok_or_else(invalid)?,
            time: parse_time(time).ok_or_else(invalid)?,
        })
    }
}

/// Parses an ISO `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Parses a 24-hour `HH:MM` time of day.
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT).ok()
}

/// Formats a date the way it is persisted.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Formats a time the way it is persisted.
pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}
