//! Incremental, mergeable aggregate state.
//!
//! [`AggregateState`] is a commutative monoid: [`AggregateState::default`]
//! is the identity, and [`AggregateState::merge`] is associative and
//! commutative. Folding records one at a time, folding chunks into
//! separate states and merging them, or merging per-input states on
//! different tasks all yield equal states.

use crash_report_record_models::{Month, PersonCount, Record};

use crate::frequency::{FrequencyTable, MentionOrder};
use crate::window::{Admitted, DateWindow, FilterStats};

/// Exact sum of [`PersonCount`]s, in thousandths.
///
/// Addition saturates, so no input can overflow it. Rounding to whole
/// persons happens only in [`PersonTotal::rounded`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PersonTotal(u128);

impl PersonTotal {
    /// Adds one row's count.
    pub fn add(&mut self, count: PersonCount) {
        self.0 = self.0.saturating_add(u128::from(count.millis()));
    }

    /// Adds another total.
    pub const fn merge(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }

    /// The total in thousandths.
    #[must_use]
    pub const fn millis(self) -> u128 {
        self.0
    }

    /// The total rounded to whole persons, halves rounding up. Saturates at
    /// `u64::MAX`.
    #[must_use]
    pub fn rounded(self) -> u64 {
        let scale = u128::from(PersonCount::SCALE);
        u64::try_from(self.0.saturating_add(scale / 2) / scale).unwrap_or(u64::MAX)
    }
}

/// Running totals and frequency tables for admitted collisions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateState {
    total_count: u64,
    total_injured: PersonTotal,
    total_killed: PersonTotal,
    street_frequency: FrequencyTable,
    vehicle_frequency: FrequencyTable,
    borough_frequency: FrequencyTable,
    month_frequency: [u64; 12],
}

impl AggregateState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one admitted record into the state.
    pub fn fold(&mut self, admitted: Admitted<'_>) {
        let record = admitted.record();
        let position = record.position;

        self.total_count += 1;
        self.total_injured.add(record.injured);
        self.total_killed.add(record.killed);
        self.month_frequency[admitted.month().index()] += 1;

        for (slot, street) in record.streets() {
            self.street_frequency
                .record(street, MentionOrder::new(position, slot));
        }
        for (slot, vehicle) in record.vehicles() {
            self.vehicle_frequency
                .record(vehicle, MentionOrder::new(position, slot));
        }
        if let Some(borough) = record.borough.as_deref() {
            self.borough_frequency
                .record(borough, MentionOrder::new(position, 0));
        }
    }

    /// Filters `records` through `window` and folds the admitted ones,
    /// returning what the filter saw.
    pub fn fold_batch(&mut self, records: &[Record], window: &DateWindow) -> FilterStats {
        let mut stats = FilterStats::default();
        for record in records {
            stats.rows_seen += 1;
            if record.timestamp.is_none() {
                stats.missing_timestamp += 1;
                continue;
            }
            match window.admit(record) {
                Some(admitted) => {
                    stats.admitted += 1;
                    self.fold(admitted);
                }
                None => stats.out_of_window += 1,
            }
        }
        stats
    }

    /// Merges `other` into this state.
    pub fn merge(&mut self, other: Self) {
        self.total_count += other.total_count;
        self.total_injured.merge(other.total_injured);
        self.total_killed.merge(other.total_killed);
        self.street_frequency.merge(other.street_frequency);
        self.vehicle_frequency.merge(other.vehicle_frequency);
        self.borough_frequency.merge(other.borough_frequency);
        for (ours, theirs) in self.month_frequency.iter_mut().zip(other.month_frequency) {
            *ours += theirs;
        }
    }

    /// Returns the merge of `self` and `other`.
    #[must_use]
    pub fn merged(mut self, other: Self) -> Self {
        self.merge(other);
        self
    }

    /// Merges any number of states by pairwise reduction. Returns the empty
    /// state when `states` is empty.
    #[must_use]
    pub fn merge_all(states: impl IntoIterator<Item = Self>) -> Self {
        let mut level: Vec<Self> = states.into_iter().collect();
        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            let mut pairs = level.into_iter();
            while let Some(left) = pairs.next() {
                next.push(match pairs.next() {
                    Some(right) => left.merged(right),
                    None => left,
                });
            }
            level = next;
        }
        level.pop().unwrap_or_default()
    }

    /// Admitted collisions.
    #[must_use]
    pub const fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Persons injured across admitted collisions.
    #[must_use]
    pub const fn total_injured(&self) -> PersonTotal {
        self.total_injured
    }

    /// Persons killed across admitted collisions.
    #[must_use]
    pub const fn total_killed(&self) -> PersonTotal {
        self.total_killed
    }

    /// Street mentions (primary and cross street).
    #[must_use]
    pub const fn street_frequency(&self) -> &FrequencyTable {
        &self.street_frequency
    }

    /// Vehicle-type mentions across all vehicle columns.
    #[must_use]
    pub const fn vehicle_frequency(&self) -> &FrequencyTable {
        &self.vehicle_frequency
    }

    /// Borough mentions.
    #[must_use]
    pub const fn borough_frequency(&self) -> &FrequencyTable {
        &self.borough_frequency
    }

    /// Collisions per month, January first.
    #[must_use]
    pub const fn month_frequency(&self) -> &[u64; 12] {
        &self.month_frequency
    }

    /// Collisions in `month`.
    #[must_use]
    pub const fn month_count(&self, month: Month) -> u64 {
        self.month_frequency[month.index()]
    }

    /// Sum of the monthly counts. Always equals [`Self::total_count`].
    #[must_use]
    pub fn month_total(&self) -> u64 {
        self.month_frequency.iter().sum()
    }

    /// Returns `true` if no collision has been folded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total_count == 0
    }
}

/// Aggregates one batch of normalized records from scratch.
#[must_use]
pub fn aggregate_batch(records: &[Record], window: &DateWindow) -> (AggregateState, FilterStats) {
    let mut state = AggregateState::new();
    let stats = state.fold_batch(records, window);
    (state, stats)
}
