#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Collision dataset definitions, the chunked record source, and row
//! normalization.
//!
//! A [`dataset::DatasetDefinition`] names the columns of a collision CSV.
//! A [`reader::RecordSource`] streams that CSV in bounded batches of raw
//! rows, and a [`normalize::Normalizer`] turns each raw row into a typed
//! [`crash_report_record_models::Record`].

pub mod dataset;
pub mod normalize;
pub mod parsing;
pub mod progress;
pub mod reader;
pub mod registry;

/// Errors that can occur while opening or reading a collision dataset.
///
/// All of these are terminal: the pipeline aborts on the first one.
/// Row-level problems (bad dates, bad numbers) are never reported here.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error (file open/read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV stream could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The input has no header row.
    #[error("input has no header row")]
    MissingHeader,

    /// A configured column does not exist in the header row.
    #[error("required column '{column}' not found in header")]
    MissingColumn {
        /// Configured column name.
        column: String,
    },

    /// A configured column name appears more than once in the header row.
    #[error("column '{column}' appears more than once in header")]
    AmbiguousColumn {
        /// Configured column name.
        column: String,
    },

    /// More vehicle-type columns were configured than a record can hold.
    #[error("{count} vehicle type columns configured, at most {max} supported")]
    TooManyVehicleColumns {
        /// Number of configured columns.
        count: usize,
        /// Supported maximum.
        max: usize,
    },

    /// Dataset definition could not be parsed.
    #[error("Dataset definition error: {0}")]
    Definition(#[from] toml::de::Error),
}
