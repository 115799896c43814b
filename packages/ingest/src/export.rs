//! Two-column `Metric,Value` summary CSV.

use std::io::Write;
use std::path::Path;

use crash_report_analytics::DateWindow;
use crash_report_analytics_models::Report;

use crate::IngestError;

/// Builds the summary rows for `report`, in file order.
#[must_use]
pub fn summary_rows(report: &Report, window: &DateWindow) -> Vec<(String, String)> {
    let mut rows = vec![
        ("Date Window".to_string(), window.to_string()),
        (
            "Total Collisions".to_string(),
            report.total_collisions.to_string(),
        ),
        (
            "Total Persons Injured".to_string(),
            report.total_injured.to_string(),
        ),
        (
            "Total Persons Killed".to_string(),
            report.total_killed.to_string(),
        ),
        (
            "Month with Most Accidents".to_string(),
            report.peak_month.map_or_else(
                || "None".to_string(),
                |peak| format!("{} ({} accidents)", peak.month, peak.count),
            ),
        ),
        (
            "Most Common Vehicle Type".to_string(),
            report.top_vehicle.as_ref().map_or_else(
                || "None".to_string(),
                |vehicle| format!("{} ({} incidents)", vehicle.name, vehicle.count),
            ),
        ),
    ];

    rows.extend(report.top_streets.iter().enumerate().map(|(i, street)| {
        (
            format!("Top {} Accident Street", i + 1),
            format!("{} ({} accidents)", street.name, street.count),
        )
    }));

    rows
}

/// Writes the summary CSV for `report` to `writer`.
///
/// # Errors
///
/// Returns [`csv::Error`] if writing fails.
pub fn write_summary<W: Write>(
    report: &Report,
    window: &DateWindow,
    writer: W,
) -> Result<(), csv::Error> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["Metric", "Value"])?;
    for (metric, value) in summary_rows(report, window) {
        csv.write_record([metric, value])?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes the summary CSV for `report` to `path`, replacing any existing
/// file.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be created or written.
pub fn export_summary(
    report: &Report,
    window: &DateWindow,
    path: &Path,
) -> Result<(), IngestError> {
    let file = std::fs::File::create(path)?;
    write_summary(report, window, std::io::BufWriter::new(file))?;
    log::info!("Summary exported to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use crash_report_analytics_models::{PeakMonth, RankedEntry};
    use crash_report_record_models::Month;

    use super::*;

    fn report() -> Report {
        Report {
            total_collisions: 3,
            total_injured: 4,
            total_killed: 1,
            top_streets: vec![
                RankedEntry::new("MAIN ST", 2),
                RankedEntry::new("ELM ST, EAST", 1),
            ],
            top_vehicle: Some(RankedEntry::new("Sedan", 2)),
            peak_month: Some(PeakMonth {
                month: Month::March,
                count: 2,
            }),
            monthly_counts: Vec::new(),
            top_boroughs: Vec::new(),
        }
    }

    fn window() -> DateWindow {
        DateWindow::calendar_year(2024).unwrap()
    }

    #[test]
    fn writes_metric_value_layout() {
        let mut out = Vec::new();
        write_summary(&report(), &window(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            vec![
                "Metric,Value",
                "Date Window,2024-01-01 to 2024-12-31",
                "Total Collisions,3",
                "Total Persons Injured,4",
                "Total Persons Killed,1",
                "Month with Most Accidents,March (2 accidents)",
                "Most Common Vehicle Type,Sedan (2 incidents)",
                "Top 1 Accident Street,MAIN ST (2 accidents)",
                "Top 2 Accident Street,\"ELM ST, EAST (1 accidents)\"",
            ]
        );
    }

    #[test]
    fn empty_report_writes_none_markers() {
        let empty = Report {
            total_collisions: 0,
            total_injured: 0,
            total_killed: 0,
            top_streets: Vec::new(),
            top_vehicle: None,
            peak_month: None,
            monthly_counts: Vec::new(),
            top_boroughs: Vec::new(),
        };
        let rows = summary_rows(&empty, &window());
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[4].1, "None");
        assert_eq!(rows[5].1, "None");
    }

    #[test]
    fn exports_to_file() {
        let path = std::env::temp_dir().join(format!(
            "crash_report_export_{}.csv",
            std::process::id()
        ));
        export_summary(&report(), &window(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next(), Some("Metric,Value"));
        assert!(text.contains("Top 1 Accident Street,MAIN ST (2 accidents)"));
        std::fs::remove_file(&path).ok();
    }
}
