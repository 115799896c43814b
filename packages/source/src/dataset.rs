//! Config-driven collision dataset definition.
//!
//! [`DatasetDefinition`] captures everything unique about a collision CSV
//! (where it lives, how its timestamps are written, which header names hold
//! which fields) in a serializable config struct. Column names are resolved
//! against the header row exactly once, when a
//! [`RecordSource`](crate::reader::RecordSource) is constructed, so a
//! misconfigured dataset fails before any row is read.

use crash_report_record_models::VEHICLE_SLOTS;
use serde::Deserialize;

use crate::SourceError;

// ── Top-level dataset definition ─────────────────────────────────────────

/// A complete, config-driven collision dataset definition.
///
/// Built-in definitions are embedded from TOML at compile time (see
/// [`crate::registry`]); custom ones can be loaded with
/// [`parse_dataset_toml`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatasetDefinition {
    /// Unique identifier (e.g., `"nyc_collisions"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Default path or URL of the CSV, used when no input is given
    /// explicitly.
    #[serde(default)]
    pub location: Option<String>,
    /// Field delimiter (default: comma).
    #[serde(default)]
    pub delimiter: Option<String>,
    /// Compression of the input stream. Inputs ending in `.gz` are treated
    /// as gzip regardless.
    #[serde(default)]
    pub compressed: Option<Compression>,
    /// How crash date and time are written.
    #[serde(default)]
    pub timestamp: TimestampFormat,
    /// Header names for each canonical field.
    pub columns: ColumnMapping,
}

/// Compression format of an input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    /// gzip (`.gz`).
    Gzip,
}

/// `chrono` format strings for the separate date and time columns.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimestampFormat {
    /// Format of the date column.
    pub date_format: String,
    /// Format of the time column.
    pub time_format: String,
}

impl Default for TimestampFormat {
    fn default() -> Self {
        Self {
            date_format: "%m/%d/%Y".to_string(),
            time_format: "%H:%M".to_string(),
        }
    }
}

// ── Column mapping ───────────────────────────────────────────────────────

/// Maps canonical record fields to CSV header names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnMapping {
    /// Crash date column.
    pub date: String,
    /// Crash time column.
    pub time: String,
    /// Persons injured column.
    pub injured: String,
    /// Persons killed column.
    pub killed: String,
    /// Primary ("on") street column.
    pub street_primary: String,
    /// Secondary ("cross") street column.
    pub street_secondary: String,
    /// Vehicle type columns, in slot order (at most
    /// [`VEHICLE_SLOTS`]).
    #[serde(default)]
    pub vehicle_types: Vec<String>,
    /// Borough column, if the dataset has one.
    #[serde(default)]
    pub borough: Option<String>,
}

/// Column positions resolved against a concrete header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIndices {
    /// Crash date position.
    pub date: usize,
    /// Crash time position.
    pub time: usize,
    /// Persons injured position.
    pub injured: usize,
    /// Persons killed position.
    pub killed: usize,
    /// Primary street position.
    pub street_primary: usize,
    /// Secondary street position.
    pub street_secondary: usize,
    /// Vehicle type positions, in slot order.
    pub vehicle_types: Vec<usize>,
    /// Borough position.
    pub borough: Option<usize>,
}

impl ColumnMapping {
    /// Checks that the mapping fits into a [`Record`](crash_report_record_models::Record).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::TooManyVehicleColumns`] if more than
    /// [`VEHICLE_SLOTS`] vehicle columns are configured.
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.vehicle_types.len() > VEHICLE_SLOTS {
            return Err(SourceError::TooManyVehicleColumns {
                count: self.vehicle_types.len(),
                max: VEHICLE_SLOTS,
            });
        }
        Ok(())
    }

    /// Resolves every configured column name to its position in `headers`.
    ///
    /// Header names are compared exactly after trimming whitespace (and a
    /// leading byte-order mark). Extra header columns are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingColumn`] if a configured name is absent,
    /// [`SourceError::AmbiguousColumn`] if it occurs more than once, or
    /// [`SourceError::TooManyVehicleColumns`] if the mapping is invalid.
    pub fn resolve(&self, headers: &csv::StringRecord) -> Result<ColumnIndices, SourceError> {
        self.validate()?;

        let names: Vec<&str> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim())
            .collect();

        let find = |column: &str| -> Result<usize, SourceError> {
            let mut matches = names
                .iter()
                .enumerate()
                .filter(|(_, name)| **name == column)
                .map(|(i, _)| i);
            let Some(index) = matches.next() else {
                return Err(SourceError::MissingColumn {
                    column: column.to_string(),
                });
            };
            if matches.next().is_some() {
                return Err(SourceError::AmbiguousColumn {
                    column: column.to_string(),
                });
            }
            Ok(index)
        };

        Ok(ColumnIndices {
            date: find(&self.date)?,
            time: find(&self.time)?,
            injured: find(&self.injured)?,
            killed: find(&self.killed)?,
            street_primary: find(&self.street_primary)?,
            street_secondary: find(&self.street_secondary)?,
            vehicle_types: self
                .vehicle_types
                .iter()
                .map(|column| find(column.as_str()))
                .collect::<Result<_, _>>()?,
            borough: self.borough.as_deref().map(find).transpose()?,
        })
    }
}

impl DatasetDefinition {
    /// Returns the unique dataset identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the human-readable dataset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the delimiter byte, defaulting to a comma.
    #[must_use]
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter
            .as_deref()
            .and_then(|d| d.as_bytes().first().copied())
            .unwrap_or(b',')
    }
}

/// Parses and validates a [`DatasetDefinition`] from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is malformed, is missing required fields,
/// or maps too many vehicle columns.
pub fn parse_dataset_toml(toml_str: &str) -> Result<DatasetDefinition, SourceError> {
    let definition: DatasetDefinition = toml::de::from_str(toml_str)?;
    definition.columns.validate()?;
    Ok(definition)
}
