//! Displayed calendar date span.
//!
//! # Invariants
//! - Dates are ascending and contiguous (step of one day).
//! - A window always holds at least one date.
//! - Replacing a window never touches participant availability.

use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Number of dates in the window created on first run.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateWindowError {
    /// `start` falls after `end`.
    Reversed { start: NaiveDate, end: NaiveDate },
    /// No dates supplied.
    Empty,
    /// Supplied dates skip or repeat a day.
    NotContiguous { previous: NaiveDate, next: NaiveDate },
}

impl Display for DateWindowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reversed { start, end } => {
                write!(f, "date window start {start} is after end {end}")
            }
            Self::Empty => write!(f, "date window cannot be empty"),
            Self::NotContiguous { previous, next } => {
                write!(f, "date window jumps from {previous} to {next}")
            }
        }
    }
}

impl Error for DateWindowError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    dates: Vec<NaiveDate>,
}

impl DateWindow {
    /// Builds every date from `start` to `end` inclusive.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateWindowError> {
        if start > end {
            return Err(DateWindowError::Reversed { start, end });
        }
        Ok(Self {
            dates: start.iter_days().take_while(|date| *date <= end).collect(),
        })
    }

    /// Window of `days` dates starting at `start` (at least one date).
    ///
    /// Stops early at the last representable date instead of overflowing.
    pub fn starting_at(start: NaiveDate, days: u32) -> Self {
        let days = usize::try_from(days.max(1)).unwrap_or(usize::MAX);
        Self {
            dates: start.iter_days().take(days).collect(),
        }
    }

    /// First-run default: `today` and the six following days.
    pub fn default_from(today: NaiveDate) -> Self {
        Self::starting_at(today, DEFAULT_WINDOW_DAYS)
    }

    /// Validates an externally supplied date list.
    pub fn from_dates(dates: Vec<NaiveDate>) -> Result<Self, DateWindowError> {
        if dates.is_empty() {
            return Err(DateWindowError::Empty);
        }
        for pair in dates.windows(2) {
            if pair[0].succ_opt() != Some(pair[1]) {
                return Err(DateWindowError::NotContiguous {
                    previous: pair[0],
                    next: pair[1],
                });
            }
        }
        Ok(Self { dates })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn start(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn end(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.binary_search(&date).is_ok()
    }
}
