#![allow(clippy::module_name_repetitions)]

//! Interactive menu for browsing a collision report.
//!
//! Builds the report once, then lets the user pick which metric to show
//! using `dialoguer`, without re-reading the input.

use std::path::PathBuf;

use chrono::NaiveDate;
use crash_report_analytics::DateWindow;
use crash_report_analytics_models::Report;
use crash_report_cli_utils::{IndicatifProgress, MultiProgress};
use dialoguer::{Input, Select};

use crate::settings::{ConfigError, Overrides, Settings, SettingsFile};
use crate::{export, render};

/// Default file name offered by the export action.
pub const DEFAULT_EXPORT_FILE: &str = "collision_summary_report.csv";

/// Actions available in the report menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportAction {
    TotalCollisions,
    TotalInjured,
    TotalKilled,
    PeakMonth,
    TopStreets,
    TopVehicle,
    TopBoroughs,
    ShowAll,
    MonthlyTrend,
    Export,
    Exit,
}

impl ReportAction {
    const ALL: &[Self] = &[
        Self::TotalCollisions,
        Self::TotalInjured,
        Self::TotalKilled,
        Self::PeakMonth,
        Self::TopStreets,
        Self::TopVehicle,
        Self::TopBoroughs,
        Self::ShowAll,
        Self::MonthlyTrend,
        Self::Export,
        Self::Exit,
    ];

    #[must_use]
    const fn label(self) -> &'static str {
        match self {
            Self::TotalCollisions => "Total collisions",
            Self::TotalInjured => "Total injured",
            Self::TotalKilled => "Total killed",
            Self::PeakMonth => "Peak accident month",
            Self::TopStreets => "Top accident streets",
            Self::TopVehicle => "Most common vehicle type",
            Self::TopBoroughs => "Top boroughs",
            Self::ShowAll => "Show all",
            Self::MonthlyTrend => "Show monthly trend",
            Self::Export => "Export summary CSV",
            Self::Exit => "Exit",
        }
    }

    /// Text shown for a single-metric action, `None` for the others.
    fn metric(self, report: &Report) -> Option<String> {
        let text = match self {
            Self::TotalCollisions => render::total_collisions(report),
            Self::TotalInjured => render::total_injured(report),
            Self::TotalKilled => render::total_killed(report),
            Self::PeakMonth => render::peak_month(report),
            Self::TopStreets => format!("\n{}", render::top_streets(report).trim_end()),
            Self::TopVehicle => render::top_vehicle(report),
            Self::TopBoroughs => format!("\n{}", render::top_boroughs(report).trim_end()),
            Self::ShowAll | Self::MonthlyTrend | Self::Export | Self::Exit => return None,
        };
        Some(text)
    }
}

/// Resolves settings (prompting for a date window if none is configured),
/// builds the report, and runs the menu loop until the user exits.
///
/// # Errors
///
/// Returns an error if settings are invalid, reading any input fails, or
/// a prompt cannot be shown.
pub async fn run(
    file: SettingsFile,
    overrides: Overrides,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = match Settings::resolve(file.clone(), overrides.clone()) {
        Ok(settings) => settings,
        Err(ConfigError::MissingWindow) => {
            let window = prompt_window()?;
            Settings::resolve(
                file,
                Overrides {
                    start: Some(window.start()),
                    end: Some(window.end()),
                    year: None,
                    ..overrides
                },
            )?
        }
        Err(e) => return Err(e.into()),
    };

    let inputs_bar = IndicatifProgress::steps_bar(multi, "Inputs", settings.inputs.len() as u64);
    let (report, _) = crate::build_report(
        &settings,
        |location| IndicatifProgress::rows_bar(multi, &location.to_string()),
        inputs_bar.as_ref(),
    )
    .await?;
    inputs_bar.finish(format!("{} input(s) read", settings.inputs.len()));

    if report.is_empty() {
        println!("No collisions were found between {}.", settings.window);
        return Ok(());
    }

    menu_loop(&report, &settings.window)
}

fn menu_loop(report: &Report, window: &DateWindow) -> Result<(), Box<dyn std::error::Error>> {
    let labels: Vec<&str> = ReportAction::ALL
        .iter()
        .map(|action| action.label())
        .collect();

    loop {
        println!();
        let idx = Select::new()
            .with_prompt(format!("Collision analysis for {window}"))
            .items(&labels)
            .default(0)
            .interact()?;

        let action = ReportAction::ALL[idx];
        match action {
            ReportAction::Exit => break,
            ReportAction::ShowAll => print!("{}", render::report(report, window)),
            ReportAction::MonthlyTrend => {
                print!("{}", render::monthly_trend(&report.monthly_counts));
            }
            ReportAction::Export => {
                let path: String = Input::new()
                    .with_prompt("Export file")
                    .default(DEFAULT_EXPORT_FILE.to_string())
                    .interact_text()?;
                let path = PathBuf::from(path.trim());
                match export::export_summary(report, window, &path) {
                    Ok(()) => println!("Report export complete to {}.", path.display()),
                    Err(e) => log::error!("Failed to export {}: {e}", path.display()),
                }
            }
            _ => {
                if let Some(text) = action.metric(report) {
                    println!("--- {} ---", action.label());
                    println!("{text}");
                }
            }
        }
    }

    Ok(())
}

/// Prompts for an inclusive date window, re-asking until the dates parse
/// and are in order.
fn prompt_window() -> Result<DateWindow, Box<dyn std::error::Error>> {
    loop {
        let start = prompt_date("Start date (YYYY-MM-DD)", "2024-01-01")?;
        let end = prompt_date("End date (YYYY-MM-DD)", "2024-12-31")?;
        match DateWindow::new(start, end) {
            Ok(window) => return Ok(window),
            Err(e) => println!("{e}"),
        }
    }
}

fn prompt_date(prompt: &str, default: &str) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    let text: String = Input::new()
        .with_prompt(prompt)
        .default(default.to_string())
        .validate_with(|input: &String| {
            NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()?;
    Ok(NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")?)
}
