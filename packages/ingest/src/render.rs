//! Plain-text rendering of a [`Report`].

use std::fmt::Write as _;

use crash_report_analytics::DateWindow;
use crash_report_analytics_models::{MonthlyCount, Report};

/// Width of the longest bar in the monthly chart.
const BAR_WIDTH: u64 = 40;

/// One-line summary of the total collisions.
#[must_use]
pub fn total_collisions(report: &Report) -> String {
    format!("Total: {}", report.total_collisions)
}

/// One-line summary of persons injured.
#[must_use]
pub fn total_injured(report: &Report) -> String {
    format!("Total: {} persons", report.total_injured)
}

/// One-line summary of persons killed.
#[must_use]
pub fn total_killed(report: &Report) -> String {
    format!("Total: {} persons", report.total_killed)
}

/// One-line summary of the peak month.
#[must_use]
pub fn peak_month(report: &Report) -> String {
    report.peak_month.map_or_else(
        || "No collisions in window".to_string(),
        |peak| format!("{} with {} accidents", peak.month, peak.count),
    )
}

/// One-line summary of the most common vehicle type.
#[must_use]
pub fn top_vehicle(report: &Report) -> String {
    report.top_vehicle.as_ref().map_or_else(
        || "No vehicle types recorded".to_string(),
        |v| format!("'{}' (involved in {} incidents)", v.name, v.count),
    )
}

/// Bulleted list of the top streets.
#[must_use]
pub fn top_streets(report: &Report) -> String {
    if report.top_streets.is_empty() {
        return "No streets recorded".to_string();
    }
    let mut out = String::new();
    for street in &report.top_streets {
        let _ = writeln!(out, "   - {} ({})", street.name, street.count);
    }
    out
}

/// Bulleted list of the top boroughs.
#[must_use]
pub fn top_boroughs(report: &Report) -> String {
    if report.top_boroughs.is_empty() {
        return "No boroughs recorded".to_string();
    }
    let mut out = String::new();
    for borough in &report.top_boroughs {
        let _ = writeln!(out, "   - {} ({})", borough.name, borough.count);
    }
    out
}

/// Full multi-line report.
#[must_use]
pub fn report(report: &Report, window: &DateWindow) -> String {
    let mut out = String::new();
    let rule = "=".repeat(45);

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Collision report for {window}");
    let _ = writeln!(out, "{rule}");

    if report.is_empty() {
        let _ = writeln!(out, "No collisions found in this date window.");
        return out;
    }

    let _ = writeln!(out, "  - Total Collisions: {}", total_collisions(report));
    let _ = writeln!(out, "  - Total Injured: {}", total_injured(report));
    let _ = writeln!(out, "  - Total Killed: {}", total_killed(report));
    let _ = writeln!(out, "  - Peak Accident Month: {}", peak_month(report));
    let _ = writeln!(out, "  - Most Common Vehicle Type: {}", top_vehicle(report));
    let _ = writeln!(
        out,
        "  - Top {} Accident Streets:\n{}",
        report.top_streets.len(),
        top_streets(report).trim_end()
    );
    if !report.top_boroughs.is_empty() {
        let _ = writeln!(
            out,
            "  - Top Boroughs:\n{}",
            top_boroughs(report).trim_end()
        );
    }

    out
}

/// Horizontal bar chart of collisions per month.
#[must_use]
pub fn monthly_trend(monthly: &[MonthlyCount]) -> String {
    let max = monthly.iter().map(|m| m.count).max().unwrap_or(0);
    let mut out = String::new();

    let _ = writeln!(out, "Monthly trend of collisions");
    for entry in monthly {
        let len = if max == 0 {
            0
        } else {
            entry.count * BAR_WIDTH / max
        };
        let bar = "#".repeat(usize::try_from(len).unwrap_or(0));
        let _ = writeln!(out, "{:<10} {:>8} {bar}", entry.month.as_ref(), entry.count);
    }

    out
}
