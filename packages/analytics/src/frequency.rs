//! Mergeable value → count tables with deterministic tie-breaking.
//!
//! Each entry remembers the earliest position at which its value was
//! mentioned. Ranking breaks count ties by that position, which is the
//! order a single sequential pass would have first inserted the values.
//! Because merging keeps the minimum position, the ranking does not
//! depend on how the input was chunked or in which order partial tables
//! were merged.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crash_report_record_models::RowPosition;

/// Where a single mention occurred: the row, and which column of a
/// multi-column group (e.g. vehicle type 1..5) it came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MentionOrder {
    /// Source row.
    pub position: RowPosition,
    /// Column slot within the row's field group.
    pub slot: u8,
}

impl MentionOrder {
    /// Creates a mention order.
    #[must_use]
    pub const fn new(position: RowPosition, slot: u8) -> Self {
        Self { position, slot }
    }
}

/// Count and first occurrence of one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    /// Number of mentions.
    pub count: u64,
    /// Earliest mention.
    pub first_seen: MentionOrder,
}

/// Value → [`Tally`] mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    entries: BTreeMap<String, Tally>,
}

impl FrequencyTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Records one mention of `name` at `order`.
    pub fn record(&mut self, name: &str, order: MentionOrder) {
        if let Some(tally) = self.entries.get_mut(name) {
            tally.count += 1;
            tally.first_seen = tally.first_seen.min(order);
        } else {
            self.entries.insert(
                name.to_string(),
                Tally {
                    count: 1,
                    first_seen: order,
                },
            );
        }
    }

    /// Adds every entry of `other` into this table.
    pub fn merge(&mut self, other: Self) {
        for (name, theirs) in other.entries {
            match self.entries.entry(name) {
                Entry::Vacant(slot) => {
                    slot.insert(theirs);
                }
                Entry::Occupied(mut slot) => {
                    let ours = slot.get_mut();
                    ours.count += theirs.count;
                    ours.first_seen = ours.first_seen.min(theirs.first_seen);
                }
            }
        }
    }

    /// Mentions of `name` (0 if never seen).
    #[must_use]
    pub fn count(&self, name: &str) -> u64 {
        self.entries.get(name).map_or(0, |t| t.count)
    }

    /// Tally of `name`, if seen.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Tally> {
        self.entries.get(name)
    }

    /// Number of distinct values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts.
    #[must_use]
    pub fn total_mentions(&self) -> u64 {
        self.entries.values().map(|t| t.count).sum()
    }

    /// All entries, highest count first; ties go to the earliest first
    /// mention.
    #[must_use]
    pub fn ranked(&self) -> Vec<(&str, Tally)> {
        let mut ranked: Vec<(&str, Tally)> = self
            .entries
            .iter()
            .map(|(name, tally)| (name.as_str(), *tally))
            .collect();
        ranked.sort_unstable_by_key(|(_, t)| (Reverse(t.count), t.first_seen));
        ranked
    }

    /// The `k` highest ranked `(value, count)` pairs.
    #[must_use]
    pub fn top(&self, k: usize) -> Vec<(&str, u64)> {
        self.ranked()
            .into_iter()
            .take(k)
            .map(|(name, t)| (name, t.count))
            .collect()
    }

    /// The single highest ranked `(value, count)` pair.
    #[must_use]
    pub fn leader(&self) -> Option<(&str, u64)> {
        self.entries
            .iter()
            .min_by_key(|(_, t)| (Reverse(t.count), t.first_seen))
            .map(|(name, t)| (name.as_str(), t.count))
    }
}
