#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Streams collision CSV extracts through the record source, normalizer,
//! range filter and aggregator, and turns the merged state into a report.
//!
//! Each input is read by its own worker: a blocking producer reads
//! bounded batches and hands them over a small channel to an async
//! consumer that normalizes, filters and folds them. Worker states are
//! combined with one tree merge at the end.

pub mod export;
pub mod interactive;
pub mod render;
pub mod settings;

use std::io::Read;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use crash_report_analytics::{AggregateState, DateWindow, FilterStats, aggregate_batch, finalize};
use crash_report_analytics_models::Report;
use crash_report_source::SourceError;
use crash_report_source::dataset::DatasetDefinition;
use crash_report_source::normalize::Normalizer;
use crash_report_source::progress::ProgressCallback;
use crash_report_source::reader::{InputLocation, RawBatch, RecordSource};
use crash_report_source::registry;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::settings::{ConfigError, Settings};

/// Batches the producer may read ahead of the consumer.
pub const BATCH_CHANNEL_BUFFER: usize = 2;

/// Errors that abort a run. No partial report is produced.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Reading an input failed.
    #[error("{location}: {source}")]
    Source {
        /// Input that failed.
        location: String,
        /// Underlying error.
        source: SourceError,
    },

    /// Settings could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A worker task panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Writing the summary CSV failed.
    #[error("export failed: {0}")]
    Export(#[from] csv::Error),

    /// Other I/O failure (export file, stdout).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Report could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// More inputs than row positions can distinguish.
    #[error("too many inputs ({0})")]
    TooManyInputs(usize),
}

/// What one worker read from one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSummary {
    /// Input index.
    pub input: u32,
    /// Input path or URL.
    pub location: String,
    /// Data rows read.
    pub rows_read: u64,
    /// Rows the CSV parser rejected.
    pub malformed_rows: u64,
    /// Batches processed.
    pub batches: u64,
    /// Range filter counts.
    pub stats: FilterStats,
}

/// Merged result of every input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Aggregate state over all inputs.
    pub state: AggregateState,
    /// Range filter counts over all inputs.
    pub stats: FilterStats,
    /// Per-input summaries, in input order.
    pub inputs: Vec<InputSummary>,
}

/// Returns all built-in dataset definitions.
#[must_use]
pub fn all_datasets() -> Vec<DatasetDefinition> {
    registry::all_datasets()
}

/// Folds every batch of one already-opened reader into a fresh state.
///
/// The CSV is parsed on a blocking thread, at most
/// [`BATCH_CHANNEL_BUFFER`] batches ahead of aggregation.
///
/// # Errors
///
/// Returns [`IngestError::Source`] if the header does not fit the dataset
/// or reading fails midway, and [`IngestError::Join`] if a task dies.
pub async fn aggregate_reader<R>(
    input: u32,
    label: String,
    reader: R,
    dataset: Arc<DatasetDefinition>,
    chunk_size: NonZeroUsize,
    window: DateWindow,
    progress: Arc<dyn ProgressCallback>,
) -> Result<(AggregateState, InputSummary), IngestError>
where
    R: Read + Send + 'static,
{
    let source = {
        let dataset = Arc::clone(&dataset);
        tokio::task::spawn_blocking(move || RecordSource::new(reader, &dataset, chunk_size, input))
            .await?
            .map_err(|source| IngestError::Source {
                location: label.clone(),
                source,
            })?
    };

    drive(input, label, source, &dataset, window, progress).await
}

/// Opens `location` and folds every batch into a fresh state.
///
/// # Errors
///
/// Returns [`IngestError::Source`] if the input cannot be opened, its
/// header does not fit the dataset, or reading fails midway.
pub async fn aggregate_input(
    input: u32,
    location: InputLocation,
    dataset: Arc<DatasetDefinition>,
    chunk_size: NonZeroUsize,
    window: DateWindow,
    progress: Arc<dyn ProgressCallback>,
) -> Result<(AggregateState, InputSummary), IngestError> {
    let label = location.to_string();
    log::info!("[input {input}] reading {label}");

    let source = {
        let dataset = Arc::clone(&dataset);
        tokio::task::spawn_blocking(move || {
            RecordSource::open(&location, &dataset, chunk_size, input)
        })
        .await?
        .map_err(|source| IngestError::Source {
            location: label.clone(),
            source,
        })?
    };

    drive(input, label, source, &dataset, window, progress).await
}

/// Totals the producer reports when it stops.
struct ProducerTotals {
    rows_read: u64,
    malformed_rows: u64,
}

/// Runs the producer/consumer pair for one opened source.
async fn drive<R>(
    input: u32,
    label: String,
    source: RecordSource<R>,
    dataset: &DatasetDefinition,
    window: DateWindow,
    progress: Arc<dyn ProgressCallback>,
) -> Result<(AggregateState, InputSummary), IngestError>
where
    R: Read + Send + 'static,
{
    let start = Instant::now();
    let normalizer = Normalizer::new(source.columns().clone(), dataset.timestamp.clone());

    let (tx, mut rx) = mpsc::channel::<RawBatch>(BATCH_CHANNEL_BUFFER);
    let producer = {
        let progress = Arc::clone(&progress);
        tokio::task::spawn_blocking(move || produce_batches(source, &tx, progress.as_ref()))
    };

    let mut state = AggregateState::new();
    let mut stats = FilterStats::default();
    let mut batches: u64 = 0;

    while let Some(batch) = rx.recv().await {
        let records = normalizer.normalize_batch(&batch);
        let (partial, batch_stats) = aggregate_batch(&records, &window);
        state.merge(partial);
        stats.merge(batch_stats);
        batches += 1;
        progress.set_message(format!("{label} ({} admitted)", stats.admitted));

        log::debug!(
            "[input {input}] batch {}: {} rows, {} admitted",
            batch.index,
            batch.len(),
            batch_stats.admitted,
        );
    }

    let totals = producer.await?.map_err(|source| IngestError::Source {
        location: label.clone(),
        source,
    })?;

    if totals.malformed_rows > 0 {
        log::warn!(
            "[input {input}] {} malformed CSV rows were counted as missing data",
            totals.malformed_rows
        );
    }

    progress.finish(format!("{label}: {} rows", totals.rows_read));
    log::info!(
        "[input {input}] {label}: {} rows in {batches} batches, {} admitted ({} missing date, {} outside window), took {:.1}s",
        totals.rows_read,
        stats.admitted,
        stats.missing_timestamp,
        stats.out_of_window,
        start.elapsed().as_secs_f64(),
    );

    Ok((
        state,
        InputSummary {
            input,
            location: label,
            rows_read: totals.rows_read,
            malformed_rows: totals.malformed_rows,
            batches,
            stats,
        },
    ))
}

/// Reads batches from `source` and sends them until the input ends or the
/// receiver goes away.
fn produce_batches<R: Read>(
    mut source: RecordSource<R>,
    tx: &mpsc::Sender<RawBatch>,
    progress: &dyn ProgressCallback,
) -> Result<ProducerTotals, SourceError> {
    for batch in source.by_ref() {
        let batch = batch?;
        progress.inc(batch.len() as u64);
        if tx.blocking_send(batch).is_err() {
            log::debug!("Batch receiver closed, stopping read");
            break;
        }
    }

    Ok(ProducerTotals {
        rows_read: source.rows_read(),
        malformed_rows: source.malformed_rows(),
    })
}

/// Aggregates every configured input on its own task and merges the
/// results.
///
/// `progress` is called once per input to obtain that input's row
/// reporter. `inputs` advances by one as each input finishes.
///
/// # Errors
///
/// Returns the first error any worker reports, as soon as it reports it;
/// the other workers are cancelled.
pub async fn aggregate_all<F>(
    settings: &Settings,
    mut progress: F,
    inputs: &dyn ProgressCallback,
) -> Result<IngestOutcome, IngestError>
where
    F: FnMut(&InputLocation) -> Arc<dyn ProgressCallback>,
{
    let count = settings.inputs.len();
    if u32::try_from(count).is_err() {
        return Err(IngestError::TooManyInputs(count));
    }

    log::info!(
        "Aggregating {count} input(s) of '{}' for {}",
        settings.dataset.name(),
        settings.window
    );

    let dataset = Arc::new(settings.dataset.clone());
    let mut workers = JoinSet::new();
    for (location, input) in settings.inputs.iter().zip(0u32..) {
        workers.spawn(aggregate_input(
            input,
            location.clone(),
            Arc::clone(&dataset),
            settings.chunk_size,
            settings.window,
            progress(location),
        ));
    }

    let mut finished = Vec::with_capacity(count);
    while let Some(joined) = workers.join_next().await {
        match joined.map_err(IngestError::from).and_then(|result| result) {
            Ok(done) => {
                inputs.inc(1);
                finished.push(done);
            }
            Err(e) => {
                workers.abort_all();
                return Err(e);
            }
        }
    }
    finished.sort_by_key(|(_, summary)| summary.input);

    let mut stats = FilterStats::default();
    let mut summaries = Vec::with_capacity(count);
    let mut states = Vec::with_capacity(count);
    for (state, summary) in finished {
        stats.merge(summary.stats);
        states.push(state);
        summaries.push(summary);
    }

    let state = AggregateState::merge_all(states);
    debug_assert_eq!(state.month_total(), state.total_count());

    if state.is_empty() {
        log::warn!(
            "No collisions matched {} ({} rows read)",
            settings.window,
            stats.rows_seen
        );
    }

    Ok(IngestOutcome {
        state,
        stats,
        inputs: summaries,
    })
}

/// Aggregates every configured input and finalizes the report.
///
/// # Errors
///
/// See [`aggregate_all`].
pub async fn build_report<F>(
    settings: &Settings,
    progress: F,
    inputs: &dyn ProgressCallback,
) -> Result<(Report, IngestOutcome), IngestError>
where
    F: FnMut(&InputLocation) -> Arc<dyn ProgressCallback>,
{
    let start = Instant::now();
    let outcome = aggregate_all(settings, progress, inputs).await?;
    let report = finalize(&outcome.state, settings.top_k);

    log::info!(
        "Report complete: {} collisions, {} injured, {} killed from {} rows, took {:.1}s",
        report.total_collisions,
        report.total_injured,
        report.total_killed,
        outcome.stats.rows_seen,
        start.elapsed().as_secs_f64(),
    );

    Ok((report, outcome))
}
