#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Normalized collision record types.
//!
//! Every input row, whatever its quality, is turned into exactly one
//! [`Record`]. Fields that could not be parsed are represented explicitly
//! (`None` timestamps, zero counts, absent text) so that downstream
//! filtering and aggregation never have to deal with raw strings.

use chrono::{Datelike as _, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Maximum number of vehicle-type columns a dataset may map.
pub const VEHICLE_SLOTS: usize = 5;

/// Where a row came from: which configured input and which data row within
/// it (0-based, header excluded).
///
/// Positions order first by input, then by row, which is exactly the order
/// a single sequential pass over all inputs would visit them.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RowPosition {
    /// Index of the input in the configured input list.
    pub input: u32,
    /// Index of the data row within that input.
    pub row: u64,
}

impl RowPosition {
    /// Creates a position for `row` of input `input`.
    #[must_use]
    pub const fn new(input: u32, row: u64) -> Self {
        Self { input, row }
    }
}

/// A non-negative person count, kept in thousandths.
///
/// Some extracts write counts as decimals. Storing thousandths lets sums of
/// those values stay exact integers, so rounding happens once on the total
/// instead of once per row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PersonCount(u64);

impl PersonCount {
    /// Thousandths per whole person.
    pub const SCALE: u64 = 1000;

    /// Zero persons.
    pub const ZERO: Self = Self(0);

    /// Count of `persons` whole persons, saturating at the largest
    /// representable count.
    #[must_use]
    pub const fn whole(persons: u64) -> Self {
        Self(persons.saturating_mul(Self::SCALE))
    }

    /// Count from a value in thousandths.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// The count in thousandths.
    #[must_use]
    pub const fn millis(self) -> u64 {
        self.0
    }
}

/// One collision event, normalized from a single input row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// Position of the source row.
    pub position: RowPosition,
    /// Combined crash date and time. `None` when either part is missing or
    /// does not match the dataset's format.
    pub timestamp: Option<NaiveDateTime>,
    /// Number of persons injured (0 when missing or unparseable).
    pub injured: PersonCount,
    /// Number of persons killed (0 when missing or unparseable).
    pub killed: PersonCount,
    /// Street the crash occurred on.
    pub street_primary: Option<String>,
    /// Nearest cross street.
    pub street_secondary: Option<String>,
    /// Vehicle type per mapped column, in column order.
    pub vehicle_types: [Option<String>; VEHICLE_SLOTS],
    /// Borough (low-cardinality category).
    pub borough: Option<String>,
}

impl Record {
    /// Returns the calendar month of the timestamp, if there is one.
    #[must_use]
    pub fn month(&self) -> Option<Month> {
        self.timestamp.and_then(|ts| Month::from_number(ts.month()))
    }

    /// Iterates the non-null street mentions as `(slot, name)` pairs,
    /// primary first.
    pub fn streets(&self) -> impl Iterator<Item = (u8, &str)> {
        [&self.street_primary, &self.street_secondary]
            .into_iter()
            .zip(0u8..)
            .filter_map(|(street, slot)| street.as_deref().map(|s| (slot, s)))
    }

    /// Iterates the non-null vehicle-type mentions as `(slot, name)` pairs,
    /// in column order.
    pub fn vehicles(&self) -> impl Iterator<Item = (u8, &str)> {
        self.vehicle_types
            .iter()
            .zip(0u8..)
            .filter_map(|(vehicle, slot)| vehicle.as_deref().map(|v| (slot, v)))
    }
}

/// Calendar month.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Month {
    January = 1,
    February = 2,
    March = 3,
    April = 4,
    May = 5,
    June = 6,
    July = 7,
    August = 8,
    September = 9,
    October = 10,
    November = 11,
    December = 12,
}

impl Month {
    /// All months, January first.
    pub const ALL: [Self; 12] = [
        Self::January,
        Self::February,
        Self::March,
        Self::April,
        Self::May,
        Self::June,
        Self::July,
        Self::August,
        Self::September,
        Self::October,
        Self::November,
        Self::December,
    ];

    /// Returns the month for a 1-based month number.
    #[must_use]
    pub const fn from_number(number: u32) -> Option<Self> {
        if number >= 1 && number <= 12 {
            Some(Self::ALL[(number - 1) as usize])
        } else {
            None
        }
    }

    /// Returns the 1-based month number.
    #[must_use]
    pub const fn number(self) -> u32 {
        self as u32
    }

    /// Returns the 0-based index into [`Self::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize - 1
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn whole_person_counts_scale_and_saturate() {
        assert_eq!(PersonCount::whole(3).millis(), 3000);
        assert_eq!(PersonCount::whole(0), PersonCount::ZERO);
        assert_eq!(PersonCount::whole(u64::MAX).millis(), u64::MAX);
    }

    #[test]
    fn month_numbers_round_trip() {
        for (i, month) in Month::ALL.iter().enumerate() {
            assert_eq!(month.index(), i);
            assert_eq!(Month::from_number(month.number()), Some(*month));
        }
        assert_eq!(Month::from_number(0), None);
        assert_eq!(Month::from_number(13), None);
    }

    #[test]
    fn month_displays_full_name() {
        assert_eq!(Month::March.to_string(), "March");
        assert_eq!("September".parse::<Month>().unwrap(), Month::September);
    }

    #[test]
    fn record_month_follows_timestamp() {
        let record = Record {
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(14, 30, 0),
            ..Record::default()
        };
        assert_eq!(record.month(), Some(Month::March));
        assert_eq!(Record::default().month(), None);
    }

    #[test]
    fn streets_and_vehicles_skip_empty_slots() {
        let record = Record {
            street_secondary: Some("ELM ST".to_string()),
            vehicle_types: [
                Some("Sedan".to_string()),
                None,
                Some("Bike".to_string()),
                None,
                None,
            ],
            ..Record::default()
        };
        assert_eq!(record.streets().collect::<Vec<_>>(), vec![(1, "ELM ST")]);
        assert_eq!(
            record.vehicles().collect::<Vec<_>>(),
            vec![(0, "Sedan"), (2, "Bike")]
        );
    }

    #[test]
    fn positions_order_by_input_then_row() {
        assert!(RowPosition::new(0, 99) < RowPosition::new(1, 0));
        assert!(RowPosition::new(1, 1) < RowPosition::new(1, 2));
    }
}
