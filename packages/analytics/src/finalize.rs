//! Derives a [`Report`] from aggregate state.

use std::num::NonZeroUsize;

use crash_report_analytics_models::{MonthlyCount, PeakMonth, RankedEntry, Report};
use crash_report_record_models::Month;

use crate::frequency::FrequencyTable;
use crate::state::AggregateState;

/// Number of ranked entries reported when nothing else is configured.
pub const DEFAULT_TOP_K: NonZeroUsize = match NonZeroUsize::new(5) {
    Some(k) => k,
    None => unreachable!(),
};

/// Builds the report for `state`, keeping the `top_k` most frequent streets
/// and boroughs.
///
/// Pure: finalizing the same state twice yields equal reports, and the
/// state itself is left untouched, so more records may be folded in
/// afterwards.
#[must_use]
pub fn finalize(state: &AggregateState, top_k: NonZeroUsize) -> Report {
    let report = Report {
        total_collisions: state.total_count(),
        total_injured: state.total_injured().rounded(),
        total_killed: state.total_killed().rounded(),
        top_streets: ranked(state.street_frequency(), top_k.get()),
        top_vehicle: state
            .vehicle_frequency()
            .leader()
            .map(|(name, count)| RankedEntry::new(name, count)),
        peak_month: peak_month(state),
        monthly_counts: Month::ALL
            .iter()
            .map(|&month| MonthlyCount {
                month,
                count: state.month_count(month),
            })
            .collect(),
        top_boroughs: ranked(state.borough_frequency(), top_k.get()),
    };

    log::debug!(
        "Finalized report: {} collisions, {} distinct streets, {} distinct vehicle types",
        report.total_collisions,
        state.street_frequency().len(),
        state.vehicle_frequency().len(),
    );

    report
}

fn ranked(table: &FrequencyTable, k: usize) -> Vec<RankedEntry> {
    table
        .top(k)
        .into_iter()
        .map(|(name, count)| RankedEntry::new(name, count))
        .collect()
}

/// First month (January-first) holding the maximum count. `None` when
/// nothing was admitted.
fn peak_month(state: &AggregateState) -> Option<PeakMonth> {
    let mut peak: Option<PeakMonth> = None;
    for month in Month::ALL {
        let count = state.month_count(month);
        if count > peak.map_or(0, |p| p.count) {
            peak = Some(PeakMonth { month, count });
        }
    }
    peak
}
