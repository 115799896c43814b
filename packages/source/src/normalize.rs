//! Row normalization.
//!
//! Turns [`RawRow`]s into typed [`Record`]s, one for one and in order.
//! Normalization never fails and never drops a row: an unparseable
//! timestamp becomes `None`, unparseable counts become zero, blank text
//! becomes absent. Deciding which records count is the range filter's job.

use crash_report_record_models::Record;

use crate::dataset::{ColumnIndices, TimestampFormat};
use crate::parsing::{clean_text, parse_count, parse_timestamp};
use crate::reader::{RawBatch, RawRow};

/// Converts raw rows of one dataset into [`Record`]s.
#[derive(Debug, Clone)]
pub struct Normalizer {
    columns: ColumnIndices,
    timestamp: TimestampFormat,
}

impl Normalizer {
    /// Creates a normalizer for rows laid out as `columns`.
    #[must_use]
    pub const fn new(columns: ColumnIndices, timestamp: TimestampFormat) -> Self {
        Self { columns, timestamp }
    }

    /// Normalizes a single raw row.
    #[must_use]
    pub fn normalize_row(&self, row: &RawRow) -> Record {
        let columns = &self.columns;
        let text = |index: usize| row.get(index).and_then(clean_text).map(String::from);

        let timestamp = parse_timestamp(
            row.get(columns.date),
            row.get(columns.time),
            &self.timestamp,
        );
        if timestamp.is_none() {
            log::trace!(
                "Unparseable crash date/time at row {} of input {}",
                row.position.row,
                row.position.input
            );
        }

        let mut record = Record {
            position: row.position,
            timestamp,
            injured: parse_count(row.get(columns.injured)),
            killed: parse_count(row.get(columns.killed)),
            street_primary: text(columns.street_primary),
            street_secondary: text(columns.street_secondary),
            vehicle_types: Default::default(),
            borough: columns.borough.and_then(text),
        };

        for (slot, &index) in record.vehicle_types.iter_mut().zip(&columns.vehicle_types) {
            *slot = text(index);
        }

        record
    }

    /// Normalizes every row of a batch, preserving order.
    #[must_use]
    pub fn normalize_batch(&self, batch: &RawBatch) -> Vec<Record> {
        batch
            .rows
            .iter()
            .map(|row| self.normalize_row(row))
            .collect()
    }
}
