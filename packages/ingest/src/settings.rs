//! Run settings: built-in defaults, an optional TOML settings file, and
//! command-line overrides, resolved once into a validated [`Settings`].
//!
//! ```toml
//! dataset = "nyc_collisions"
//! inputs = ["crashes_2023.csv.gz", "crashes_2024.csv.gz"]
//! chunk_size = 50000
//! top_k = 5
//!
//! [date_window]
//! start_date = "2024-01-01"
//! end_date = "2024-12-31"
//! ```
//!
//! `dataset` may also be an inline table holding a complete dataset
//! definition.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use crash_report_analytics::finalize::DEFAULT_TOP_K;
use crash_report_analytics::{DateWindow, WindowError};
use crash_report_source::SourceError;
use crash_report_source::dataset::DatasetDefinition;
use crash_report_source::reader::InputLocation;
use crash_report_source::registry::{self, DEFAULT_DATASET_ID};
use serde::Deserialize;

/// Environment variable naming a settings file when `--config` is absent.
pub const CONFIG_ENV_VAR: &str = "CRASH_REPORT_CONFIG";

/// Rows per batch when nothing else is configured.
pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = match NonZeroUsize::new(50_000) {
    Some(n) => n,
    None => unreachable!(),
};

/// Errors resolving settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Settings file could not be read.
    #[error("failed to read settings file {}: {source}", path.display())]
    Read {
        /// Settings file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Settings file is not valid TOML or has unknown keys.
    #[error("invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Dataset id is not in the built-in registry.
    #[error("unknown dataset '{id}'. Available: {available}")]
    UnknownDataset {
        /// Requested id.
        id: String,
        /// Comma-separated built-in ids.
        available: String,
    },

    /// An inline dataset definition is unusable.
    #[error("invalid dataset definition: {0}")]
    InvalidDataset(#[from] SourceError),

    /// No inputs were given and the dataset has no default location.
    #[error("no inputs configured and dataset '{dataset}' has no default location")]
    NoInputs {
        /// Dataset id.
        dataset: String,
    },

    /// Neither a year nor a start and end date were given.
    #[error("a date window is required: pass --year, or --start and --end")]
    MissingWindow,

    /// The date window is invalid.
    #[error(transparent)]
    Window(#[from] WindowError),

    /// `chunk_size` was zero.
    #[error("chunk_size must be positive")]
    ZeroChunkSize,

    /// `top_k` was zero.
    #[error("top_k must be positive")]
    ZeroTopK,
}

// ── Settings file ────────────────────────────────────────────────────────

/// Dataset chosen by a settings file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DatasetSelection {
    /// Built-in dataset id.
    Id(String),
    /// Complete inline definition.
    Inline(Box<DatasetDefinition>),
}

/// Inclusive date range as written in a settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateWindowSettings {
    /// First day.
    pub start_date: Option<NaiveDate>,
    /// Last day.
    pub end_date: Option<NaiveDate>,
}

/// Contents of a settings file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    /// Dataset id or inline definition.
    pub dataset: Option<DatasetSelection>,
    /// Paths or URLs to read.
    pub inputs: Option<Vec<String>>,
    /// Rows per batch.
    pub chunk_size: Option<usize>,
    /// Ranked entries to report.
    pub top_k: Option<usize>,
    /// Date range to analyze.
    pub date_window: Option<DateWindowSettings>,
}

impl SettingsFile {
    /// Parses settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads settings from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Loading settings from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Loads the settings file named by `explicit`, or by the
    /// [`CONFIG_ENV_VAR`] environment variable. Returns empty settings when
    /// neither is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a named file cannot be read or parsed.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

        path.map_or_else(|| Ok(Self::default()), |path| Self::load(&path))
    }
}

// ── Overrides ────────────────────────────────────────────────────────────

/// Values given on the command line. Each one that is set wins over the
/// settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Built-in dataset id.
    pub dataset: Option<String>,
    /// Inputs; replaces the file's list when non-empty.
    pub inputs: Vec<String>,
    /// Rows per batch.
    pub chunk_size: Option<usize>,
    /// Ranked entries to report.
    pub top_k: Option<usize>,
    /// Window start.
    pub start: Option<NaiveDate>,
    /// Window end.
    pub end: Option<NaiveDate>,
    /// Whole calendar year; takes precedence over `start`/`end`.
    pub year: Option<i32>,
}

// ── Resolved settings ────────────────────────────────────────────────────

/// Fully resolved, validated settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Dataset layout.
    pub dataset: DatasetDefinition,
    /// Inputs, in order; position in this list is the input index.
    pub inputs: Vec<InputLocation>,
    /// Rows per batch.
    pub chunk_size: NonZeroUsize,
    /// Date window.
    pub window: DateWindow,
    /// Ranked entries to report.
    pub top_k: NonZeroUsize,
}

impl Settings {
    /// Resolves `file` and `overrides` over the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for unknown datasets, missing inputs, a
    /// missing or inverted window, or a zero `chunk_size`/`top_k`.
    pub fn resolve(file: SettingsFile, overrides: Overrides) -> Result<Self, ConfigError> {
        let dataset = match (overrides.dataset, file.dataset) {
            (Some(id), _) | (None, Some(DatasetSelection::Id(id))) => lookup_dataset(&id)?,
            (None, Some(DatasetSelection::Inline(definition))) => {
                definition.columns.validate()?;
                *definition
            }
            (None, None) => lookup_dataset(DEFAULT_DATASET_ID)?,
        };

        let inputs: Vec<InputLocation> = if overrides.inputs.is_empty() {
            file.inputs
                .filter(|inputs| !inputs.is_empty())
                .or_else(|| dataset.location.clone().map(|location| vec![location]))
                .ok_or_else(|| ConfigError::NoInputs {
                    dataset: dataset.id().to_string(),
                })?
                .iter()
                .map(|s| InputLocation::from(s.as_str()))
                .collect()
        } else {
            overrides
                .inputs
                .iter()
                .map(|s| InputLocation::from(s.as_str()))
                .collect()
        };

        let chunk_size = overrides
            .chunk_size
            .or(file.chunk_size)
            .map_or(Ok(DEFAULT_CHUNK_SIZE), |n| {
                NonZeroUsize::new(n).ok_or(ConfigError::ZeroChunkSize)
            })?;

        let top_k = overrides
            .top_k
            .or(file.top_k)
            .map_or(Ok(DEFAULT_TOP_K), |n| {
                NonZeroUsize::new(n).ok_or(ConfigError::ZeroTopK)
            })?;

        let window = if let Some(year) = overrides.year {
            DateWindow::calendar_year(year)?
        } else {
            let file_window = file.date_window.unwrap_or_default();
            let start = overrides.start.or(file_window.start_date);
            let end = overrides.end.or(file_window.end_date);
            match (start, end) {
                (Some(start), Some(end)) => DateWindow::new(start, end)?,
                _ => return Err(ConfigError::MissingWindow),
            }
        };

        log::debug!(
            "Resolved settings: dataset={} inputs={} chunk_size={chunk_size} top_k={top_k} window={window}",
            dataset.id(),
            inputs.len(),
        );

        Ok(Self {
            dataset,
            inputs,
            chunk_size,
            window,
            top_k,
        })
    }
}

fn lookup_dataset(id: &str) -> Result<DatasetDefinition, ConfigError> {
    registry::find_dataset(id).ok_or_else(|| ConfigError::UnknownDataset {
        id: id.to_string(),
        available: registry::all_datasets()
            .iter()
            .map(|d| d.id().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn year_2024() -> Overrides {
        Overrides {
            year: Some(2024),
            ..Overrides::default()
        }
    }

    #[test]
    fn defaults_apply_when_nothing_is_configured() {
        let settings = Settings::resolve(SettingsFile::default(), year_2024()).unwrap();
        assert_eq!(settings.dataset.id(), DEFAULT_DATASET_ID);
        assert_eq!(settings.chunk_size.get(), 50_000);
        assert_eq!(settings.top_k.get(), 5);
        assert_eq!(settings.inputs.len(), 1);
        assert!(matches!(settings.inputs[0], InputLocation::Url(_)));
        assert_eq!(settings.window, DateWindow::calendar_year(2024).unwrap());
    }

    #[test]
    fn file_values_override_defaults() {
        let file = SettingsFile::from_toml_str(
            r#"
            inputs = ["a.csv", "b.csv.gz"]
            chunk_size = 1000
            top_k = 3

            [date_window]
            start_date = "2023-06-01"
            end_date = "2023-06-30"
            "#,
        )
        .unwrap();
        let settings = Settings::resolve(file, Overrides::default()).unwrap();
        assert_eq!(settings.chunk_size.get(), 1000);
        assert_eq!(settings.top_k.get(), 3);
        assert_eq!(
            settings.inputs,
            vec![InputLocation::from("a.csv"), InputLocation::from("b.csv.gz")]
        );
        assert_eq!(settings.window.start(), date(2023, 6, 1));
        assert_eq!(settings.window.end(), date(2023, 6, 30));
    }

    #[test]
    fn cli_overrides_win_over_file() {
        let file = SettingsFile::from_toml_str(
            r#"
            inputs = ["a.csv"]
            chunk_size = 1000

            [date_window]
            start_date = "2023-06-01"
            end_date = "2023-06-30"
            "#,
        )
        .unwrap();
        let overrides = Overrides {
            inputs: vec!["c.csv".to_string()],
            chunk_size: Some(10),
            end: Some(date(2023, 7, 31)),
            ..Overrides::default()
        };
        let settings = Settings::resolve(file, overrides).unwrap();
        assert_eq!(settings.inputs, vec![InputLocation::from("c.csv")]);
        assert_eq!(settings.chunk_size.get(), 10);
        assert_eq!(settings.window.start(), date(2023, 6, 1));
        assert_eq!(settings.window.end(), date(2023, 7, 31));
    }

    #[test]
    fn year_takes_precedence_over_dates() {
        let overrides = Overrides {
            start: Some(date(2020, 1, 1)),
            end: Some(date(2020, 2, 1)),
            year: Some(2022),
            ..Overrides::default()
        };
        let settings = Settings::resolve(SettingsFile::default(), overrides).unwrap();
        assert_eq!(settings.window, DateWindow::calendar_year(2022).unwrap());
    }

    #[test]
    fn window_is_required() {
        let err = Settings::resolve(SettingsFile::default(), Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingWindow));

        let half = Overrides {
            start: Some(date(2024, 1, 1)),
            ..Overrides::default()
        };
        let err = Settings::resolve(SettingsFile::default(), half).unwrap_err();
        assert!(matches!(err, ConfigError::MissingWindow));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let inverted = Overrides {
            start: Some(date(2024, 2, 1)),
            end: Some(date(2024, 1, 1)),
            ..Overrides::default()
        };
        assert!(matches!(
            Settings::resolve(SettingsFile::default(), inverted),
            Err(ConfigError::Window(WindowError::Inverted { .. }))
        ));

        let zero_chunk = Overrides {
            chunk_size: Some(0),
            ..year_2024()
        };
        assert!(matches!(
            Settings::resolve(SettingsFile::default(), zero_chunk),
            Err(ConfigError::ZeroChunkSize)
        ));

        let zero_top = Overrides {
            top_k: Some(0),
            ..year_2024()
        };
        assert!(matches!(
            Settings::resolve(SettingsFile::default(), zero_top),
            Err(ConfigError::ZeroTopK)
        ));

        let unknown = Overrides {
            dataset: Some("nope".to_string()),
            ..year_2024()
        };
        match Settings::resolve(SettingsFile::default(), unknown) {
            Err(ConfigError::UnknownDataset { id, available }) => {
                assert_eq!(id, "nope");
                assert!(available.contains(DEFAULT_DATASET_ID));
            }
            other => panic!("expected UnknownDataset, got {other:?}"),
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            SettingsFile::from_toml_str("chunksize = 10"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn unreadable_settings_file_names_the_path() {
        let path = std::env::temp_dir().join("crash_report_no_such_settings.toml");
        let err = SettingsFile::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        let message = err.to_string();
        assert!(
            message.starts_with(&format!("failed to read settings file {}: ", path.display())),
            "{message}"
        );
    }

    #[test]
    fn inline_dataset_definition() {
        let file = SettingsFile::from_toml_str(
            r#"
            inputs = ["local.csv"]

            [dataset]
            id = "local"
            name = "Local extract"

            [dataset.columns]
            date = "date"
            time = "time"
            injured = "hurt"
            killed = "dead"
            street_primary = "on"
            street_secondary = "cross"
            vehicle_types = ["v1", "v2"]
            "#,
        )
        .unwrap();
        let settings = Settings::resolve(file, year_2024()).unwrap();
        assert_eq!(settings.dataset.id(), "local");
        assert_eq!(settings.dataset.columns.vehicle_types.len(), 2);
        assert_eq!(settings.dataset.columns.borough, None);
    }

    #[test]
    fn inline_dataset_without_location_needs_inputs() {
        let file = SettingsFile::from_toml_str(
            r#"
            [dataset]
            id = "local"
            name = "Local extract"

            [dataset.columns]
            date = "date"
            time = "time"
            injured = "hurt"
            killed = "dead"
            street_primary = "on"
            street_secondary = "cross"
            "#,
        )
        .unwrap();
        assert!(matches!(
            Settings::resolve(file, year_2024()),
            Err(ConfigError::NoInputs { .. })
        ));
    }
}
