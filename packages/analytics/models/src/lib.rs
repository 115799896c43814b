#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Collision report value types.
//!
//! A [`Report`] is everything a presentation layer (terminal output, menu,
//! CSV export, JSON) needs. It is produced from aggregate state by the
//! finalizer and never refers back to it.

use crash_report_record_models::Month;
use serde::{Deserialize, Serialize};

/// A ranked value with its mention count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    /// Street name, vehicle type, borough, etc.
    pub name: String,
    /// Number of mentions.
    pub count: u64,
}

impl RankedEntry {
    /// Creates a ranked entry.
    #[must_use]
    pub fn new(name: impl Into<String>, count: u64) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

/// The month with the most collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeakMonth {
    /// Calendar month.
    pub month: Month,
    /// Collisions in that month.
    pub count: u64,
}

/// Collisions in one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCount {
    /// Calendar month.
    pub month: Month,
    /// Collisions in that month (summed across years in the window).
    pub count: u64,
}

/// Summary statistics for the collisions inside a date window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Number of collisions in the window.
    pub total_collisions: u64,
    /// Persons injured.
    pub total_injured: u64,
    /// Persons killed.
    pub total_killed: u64,
    /// Most mentioned streets (on and cross streets combined), most
    /// frequent first.
    pub top_streets: Vec<RankedEntry>,
    /// Most mentioned vehicle type across all vehicle columns. `None` when
    /// no admitted collision lists a vehicle.
    pub top_vehicle: Option<RankedEntry>,
    /// Month with the most collisions. `None` when the window matched no
    /// collisions.
    pub peak_month: Option<PeakMonth>,
    /// Collisions per calendar month, January first; always twelve entries.
    pub monthly_counts: Vec<MonthlyCount>,
    /// Boroughs with the most collisions, most frequent first.
    pub top_boroughs: Vec<RankedEntry>,
}

impl Report {
    /// Returns `true` if the window matched no collisions.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total_collisions == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case_with_null_peak() {
        let report = Report {
            total_collisions: 0,
            total_injured: 0,
            total_killed: 0,
            top_streets: Vec::new(),
            top_vehicle: None,
            peak_month: None,
            monthly_counts: Vec::new(),
            top_boroughs: Vec::new(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["totalCollisions"], 0);
        assert!(json["peakMonth"].is_null());
        assert!(json["topVehicle"].is_null());
        assert!(report.is_empty());
    }

    #[test]
    fn serializes_peak_month_by_name() {
        let peak = PeakMonth {
            month: Month::March,
            count: 4,
        };
        let json = serde_json::to_value(peak).unwrap();
        assert_eq!(json["month"], "March");
        assert_eq!(json["count"], 4);
    }
}
