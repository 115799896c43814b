//! Inclusive date-window range filter.

use std::fmt;

use chrono::{Datelike as _, NaiveDate, NaiveDateTime};
use crash_report_record_models::{Month, Record};
use thiserror::Error;

/// Errors building a [`DateWindow`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// Start date is after end date.
    #[error("date window start {start} is after end {end}")]
    Inverted {
        /// Configured start.
        start: NaiveDate,
        /// Configured end.
        end: NaiveDate,
    },

    /// Year has no representable January 1st / December 31st.
    #[error("year {0} is out of range")]
    InvalidYear(i32),
}

/// An inclusive `[start, end]` range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    /// Creates a window covering `start` through `end`, both inclusive.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::Inverted`] if `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, WindowError> {
        if start > end {
            return Err(WindowError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a window covering one calendar year.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::InvalidYear`] if the year is out of `chrono`'s
    /// range.
    pub fn calendar_year(year: i32) -> Result<Self, WindowError> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(WindowError::InvalidYear(year))?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31).ok_or(WindowError::InvalidYear(year))?;
        Self::new(start, end)
    }

    /// First day of the window.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the window.
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Returns `true` if `date` falls inside the window.
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Returns `true` if the record has a timestamp inside the window.
    #[must_use]
    pub fn contains(&self, record: &Record) -> bool {
        self.admit(record).is_some()
    }

    /// Admits `record` if its timestamp is present and its date falls
    /// inside the window. Records with a missing timestamp are never
    /// admitted.
    #[must_use]
    pub fn admit<'a>(&self, record: &'a Record) -> Option<Admitted<'a>> {
        let timestamp = record.timestamp?;
        if !self.contains_date(timestamp.date()) {
            return None;
        }
        let month = Month::from_number(timestamp.month())?;
        Some(Admitted {
            record,
            timestamp,
            month,
        })
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// A record that passed a [`DateWindow`], together with its (present)
/// timestamp.
#[derive(Debug, Clone, Copy)]
pub struct Admitted<'a> {
    record: &'a Record,
    timestamp: NaiveDateTime,
    month: Month,
}

impl<'a> Admitted<'a> {
    /// The admitted record.
    #[must_use]
    pub const fn record(&self) -> &'a Record {
        self.record
    }

    /// The record's timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Calendar month of the timestamp.
    #[must_use]
    pub const fn month(&self) -> Month {
        self.month
    }
}

/// How many rows the range filter saw, and why it dropped the ones it
/// dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Rows seen.
    pub rows_seen: u64,
    /// Rows dropped because the timestamp was missing or unparseable.
    pub missing_timestamp: u64,
    /// Rows dropped because the date was outside the window.
    pub out_of_window: u64,
    /// Rows admitted into aggregation.
    pub admitted: u64,
}

impl FilterStats {
    /// Adds another set of counts to this one.
    pub const fn merge(&mut self, other: Self) {
        self.rows_seen += other.rows_seen;
        self.missing_timestamp += other.missing_timestamp;
        self.out_of_window += other.out_of_window;
        self.admitted += other.admitted;
    }
}
