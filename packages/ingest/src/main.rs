#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the collision report tool.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use crash_report_cli_utils::IndicatifProgress;
use crash_report_ingest::settings::{Overrides, Settings, SettingsFile};
use crash_report_ingest::{all_datasets, export, render};

#[derive(Parser)]
#[command(name = "crash_report", about = "Collision statistics for large CSV extracts")]
struct Cli {
    /// Settings file (TOML). Falls back to the `CRASH_REPORT_CONFIG`
    /// environment variable.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute and print the report for a date window
    Report {
        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,
        /// Also write the `Metric,Value` summary CSV to this file
        #[arg(long)]
        export: Option<PathBuf>,
        /// Also print the monthly trend chart
        #[arg(long)]
        trend: bool,
    },
    /// List built-in dataset definitions
    Datasets,
}

/// Settings overrides, accepted before or after the subcommand.
#[derive(Args)]
struct RunArgs {
    /// Built-in dataset id (e.g., "`nyc_collisions`")
    #[arg(long, global = true)]
    dataset: Option<String>,
    /// Input path or URL; repeat for several inputs (e.g., yearly extracts)
    #[arg(long = "input", global = true)]
    inputs: Vec<String>,
    /// Rows per batch
    #[arg(long, global = true)]
    chunk_size: Option<usize>,
    /// Number of ranked streets and boroughs to report
    #[arg(long, global = true)]
    top_k: Option<usize>,
    /// First day of the window (YYYY-MM-DD)
    #[arg(long, global = true)]
    start: Option<NaiveDate>,
    /// Last day of the window (YYYY-MM-DD)
    #[arg(long, global = true)]
    end: Option<NaiveDate>,
    /// Analyze one calendar year (overrides --start/--end)
    #[arg(long, global = true)]
    year: Option<i32>,
}

impl From<RunArgs> for Overrides {
    fn from(args: RunArgs) -> Self {
        Self {
            dataset: args.dataset,
            inputs: args.inputs,
            chunk_size: args.chunk_size,
            top_k: args.top_k,
            start: args.start,
            end: args.end,
            year: args.year,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = crash_report_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        let file = SettingsFile::discover(cli.config.as_deref())?;
        return crash_report_ingest::interactive::run(file, cli.run.into(), &multi).await;
    };

    match command {
        Commands::Datasets => {
            let datasets = all_datasets();
            println!("{:<24} NAME", "ID");
            println!("{}", "-".repeat(60));
            for dataset in &datasets {
                println!("{:<24} {}", dataset.id(), dataset.name());
            }
        }
        Commands::Report {
            json,
            export: export_path,
            trend,
        } => {
            let file = SettingsFile::discover(cli.config.as_deref())?;
            let settings = Settings::resolve(file, cli.run.into())?;

            let inputs_bar =
                IndicatifProgress::steps_bar(&multi, "Inputs", settings.inputs.len() as u64);
            let (report, _) = crash_report_ingest::build_report(
                &settings,
                |location| IndicatifProgress::rows_bar(&multi, &location.to_string()),
                inputs_bar.as_ref(),
            )
            .await?;
            inputs_bar.finish(format!("{} input(s) read", settings.inputs.len()));

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render::report(&report, &settings.window));
                if trend && !report.is_empty() {
                    println!();
                    print!("{}", render::monthly_trend(&report.monthly_counts));
                }
            }

            if let Some(path) = export_path {
                export::export_summary(&report, &settings.window, &path)?;
            }
        }
    }

    Ok(())
}
