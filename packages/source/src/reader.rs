//! Chunked CSV record source.
//!
//! [`open_input`] turns a path or URL into a byte stream (decompressing gzip
//! on the fly), and [`RecordSource`] reads that stream as CSV, yielding
//! batches of at most `chunk_size` raw rows. Nothing beyond the current
//! batch is held in memory and the input is read exactly once, front to
//! back.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::iter::FusedIterator;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;

use crash_report_record_models::RowPosition;

use crate::SourceError;
use crate::dataset::{ColumnIndices, Compression, DatasetDefinition};

// ── Input location ───────────────────────────────────────────────────────

/// Where a collision CSV lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLocation {
    /// Local file.
    Path(PathBuf),
    /// HTTP(S) URL, streamed.
    Url(String),
}

impl InputLocation {
    /// Returns `true` if the location name ends in `.gz` (ignoring any URL
    /// query string).
    #[must_use]
    pub fn has_gzip_suffix(&self) -> bool {
        match self {
            Self::Path(path) => path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("gz")),
            Self::Url(url) => {
                let path = url.split(['?', '#']).next().unwrap_or(url);
                path.to_ascii_lowercase().ends_with(".gz")
            }
        }
    }
}

impl FromStr for InputLocation {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(Self::Url(s.to_string()))
        } else {
            Ok(Self::Path(PathBuf::from(s)))
        }
    }
}

impl From<&str> for InputLocation {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(location) => location,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for InputLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Opens `location` for streaming reads.
///
/// URLs are fetched with a blocking HTTP client whose response body is read
/// incrementally; gzip input (configured, or detected from a `.gz` suffix)
/// is decoded as it is read.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be opened, the request fails,
/// or the server answers with a non-success status.
pub fn open_input(
    location: &InputLocation,
    compressed: Option<Compression>,
) -> Result<Box<dyn Read + Send>, SourceError> {
    let raw: Box<dyn Read + Send> = match location {
        InputLocation::Path(path) => {
            log::info!("Opening {}", path.display());
            Box::new(BufReader::new(File::open(path)?))
        }
        InputLocation::Url(url) => {
            log::info!("Streaming {url}");
            let response = reqwest::blocking::Client::builder()
                .timeout(None::<std::time::Duration>)
                .build()?
                .get(url)
                .send()?
                .error_for_status()?;
            Box::new(BufReader::new(response))
        }
    };

    if compressed == Some(Compression::Gzip) || location.has_gzip_suffix() {
        log::debug!("Decompressing gzip stream from {location}");
        return Ok(Box::new(flate2::read::GzDecoder::new(raw)));
    }

    Ok(raw)
}

// ── Raw rows ─────────────────────────────────────────────────────────────

/// One unparsed data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// Where the row came from.
    pub position: RowPosition,
    /// Field values, in header order. Empty for rows the CSV parser
    /// rejected.
    pub fields: csv::StringRecord,
}

impl RawRow {
    /// Returns the field at `index`, if the row has that many fields.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index)
    }
}

/// A bounded group of consecutive raw rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBatch {
    /// 0-based batch number within its input.
    pub index: u64,
    /// Rows in input order.
    pub rows: Vec<RawRow>,
}

impl RawBatch {
    /// Number of rows in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the batch holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ── Record source ────────────────────────────────────────────────────────

/// Lazily reads a CSV stream as batches of raw rows.
///
/// The header row is read and the dataset's column mapping resolved when
/// the source is constructed. Iteration then yields `Ok(batch)` until the
/// input is exhausted; an I/O failure is yielded once as `Err` and ends the
/// iteration.
pub struct RecordSource<R> {
    reader: csv::Reader<R>,
    columns: ColumnIndices,
    chunk_size: NonZeroUsize,
    input: u32,
    next_row: u64,
    next_batch: u64,
    malformed: u64,
    record: csv::ByteRecord,
    finished: bool,
}

impl RecordSource<Box<dyn Read + Send>> {
    /// Opens `location` and prepares a source over it.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the input cannot be opened or its header
    /// does not match the dataset's column mapping.
    pub fn open(
        location: &InputLocation,
        dataset: &DatasetDefinition,
        chunk_size: NonZeroUsize,
        input: u32,
    ) -> Result<Self, SourceError> {
        let reader = open_input(location, dataset.compressed)?;
        Self::new(reader, dataset, chunk_size, input)
    }
}

impl<R: Read> RecordSource<R> {
    /// Creates a source reading CSV from `reader`.
    ///
    /// `input` is the index stamped into every row's [`RowPosition`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingHeader`] for an empty input, a column
    /// resolution error if the header does not fit the dataset, or an I/O
    /// error if the header cannot be read.
    pub fn new(
        reader: R,
        dataset: &DatasetDefinition,
        chunk_size: NonZeroUsize,
        input: u32,
    ) -> Result<Self, SourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(dataset.delimiter_byte())
            .flexible(true)
            .from_reader(reader);

        let headers = csv::StringRecord::from_byte_record_lossy(reader.byte_headers()?.clone());
        if headers.is_empty() {
            return Err(SourceError::MissingHeader);
        }

        let columns = dataset.columns.resolve(&headers)?;
        log::debug!(
            "[{}] resolved {} header columns: {columns:?}",
            dataset.id(),
            headers.len()
        );

        Ok(Self {
            reader,
            columns,
            chunk_size,
            input,
            next_row: 0,
            next_batch: 0,
            malformed: 0,
            record: csv::ByteRecord::new(),
            finished: false,
        })
    }

    /// Column positions resolved from the header row.
    #[must_use]
    pub const fn columns(&self) -> &ColumnIndices {
        &self.columns
    }

    /// Number of data rows read so far.
    #[must_use]
    pub const fn rows_read(&self) -> u64 {
        self.next_row
    }

    /// Number of rows the CSV parser rejected (passed on as empty rows).
    #[must_use]
    pub const fn malformed_rows(&self) -> u64 {
        self.malformed
    }

    /// Reads the next data row, or `None` at end of input.
    fn read_row(&mut self) -> Result<Option<RawRow>, SourceError> {
        let fields = match self.reader.read_byte_record(&mut self.record) {
            Ok(false) => return Ok(None),
            Ok(true) => csv::StringRecord::from_byte_record_lossy(self.record.clone()),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                log::warn!(
                    "Malformed CSV row {} in input {}: {e}",
                    self.next_row,
                    self.input
                );
                self.malformed += 1;
                csv::StringRecord::new()
            }
        };

        let position = RowPosition::new(self.input, self.next_row);
        self.next_row += 1;
        Ok(Some(RawRow { position, fields }))
    }
}

impl<R: Read> Iterator for RecordSource<R> {
    type Item = Result<RawBatch, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut rows = Vec::with_capacity(self.chunk_size.get());
        while rows.len() < self.chunk_size.get() {
            match self.read_row() {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => {
                    self.finished = true;
                    break;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }

        if rows.is_empty() {
            return None;
        }

        let batch = RawBatch {
            index: self.next_batch,
            rows,
        };
        self.next_batch += 1;
        log::debug!(
            "Input {} batch {}: {} rows (total {})",
            self.input,
            batch.index,
            batch.len(),
            self.next_row
        );
        Some(Ok(batch))
    }
}

impl<R: Read> FusedIterator for RecordSource<R> {}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write as _};

    use super::*;
    use crate::dataset::{ColumnMapping, TimestampFormat};

    const CSV: &str = "CRASH DATE,CRASH TIME,INJURED,KILLED,ON STREET,CROSS STREET,V1,BOROUGH\n\
                       01/01/2024,1:00,1,0,MAIN ST,,Sedan,BROOKLYN\n\
                       01/02/2024,2:00,0,0,ELM ST,OAK ST,,QUEENS\n\
                       01/03/2024,3:00,2,1,,,Bike,\n\
                       01/04/2024,4:00,0,0,OAK ST,,Sedan,BRONX\n\
                       01/05/2024,5:00,0,0,MAIN ST,,Taxi,BROOKLYN\n";

    fn dataset() -> DatasetDefinition {
        DatasetDefinition {
            id: "test".to_string(),
            name: "Test".to_string(),
            location: None,
            delimiter: None,
            compressed: None,
            timestamp: TimestampFormat::default(),
            columns: ColumnMapping {
                date: "CRASH DATE".to_string(),
                time: "CRASH TIME".to_string(),
                injured: "INJURED".to_string(),
                killed: "KILLED".to_string(),
                street_primary: "ON STREET".to_string(),
                street_secondary: "CROSS STREET".to_string(),
                vehicle_types: vec!["V1".to_string()],
                borough: Some("BOROUGH".to_string()),
            },
        }
    }

    fn source(data: &str, chunk: usize) -> RecordSource<Cursor<Vec<u8>>> {
        RecordSource::new(
            Cursor::new(data.as_bytes().to_vec()),
            &dataset(),
            NonZeroUsize::new(chunk).unwrap(),
            0,
        )
        .unwrap()
    }

    #[test]
    fn yields_bounded_batches_in_order() {
        let batches: Vec<RawBatch> = source(CSV, 2).map(Result::unwrap).collect();
        assert_eq!(
            batches.iter().map(RawBatch::len).collect::<Vec<_>>(),
            vec![2, 2, 1]
        );
        assert_eq!(
            batches.iter().map(|b| b.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );

        let rows: Vec<u64> = batches
            .iter()
            .flat_map(|b| b.rows.iter().map(|r| r.position.row))
            .collect();
        assert_eq!(rows, vec![0, 1, 2, 3, 4]);
        assert_eq!(batches[0].rows[1].get(4), Some("ELM ST"));
        assert_eq!(batches[1].rows[0].get(4), Some(""));
        assert_eq!(batches[1].rows[1].get(4), Some("OAK ST"));
        assert_eq!(batches[2].rows[0].get(4), Some("MAIN ST"));
    }

    #[test]
    fn exact_multiple_has_no_empty_trailing_batch() {
        let mut src = source(CSV, 5);
        assert_eq!(src.next().unwrap().unwrap().len(), 5);
        assert!(src.next().is_none());
        assert!(src.next().is_none());
        assert_eq!(src.rows_read(), 5);
    }

    #[test]
    fn header_only_input_yields_nothing() {
        let mut src = source(
            "CRASH DATE,CRASH TIME,INJURED,KILLED,ON STREET,CROSS STREET,V1,BOROUGH\n",
            10,
        );
        assert!(src.next().is_none());
    }

    #[test]
    fn empty_input_is_missing_header() {
        let result = RecordSource::new(
            Cursor::new(Vec::new()),
            &dataset(),
            NonZeroUsize::new(1).unwrap(),
            0,
        );
        assert!(matches!(result, Err(SourceError::MissingHeader)));
    }

    #[test]
    fn missing_column_fails_at_construction() {
        let result = RecordSource::new(
            Cursor::new(b"CRASH DATE,CRASH TIME\n01/01/2024,1:00\n".to_vec()),
            &dataset(),
            NonZeroUsize::new(1).unwrap(),
            0,
        );
        assert!(matches!(result, Err(SourceError::MissingColumn { .. })));
    }

    #[test]
    fn short_and_invalid_utf8_rows_are_passed_through() {
        let mut data = b"CRASH DATE,CRASH TIME,INJURED,KILLED,ON STREET,CROSS STREET,V1,BOROUGH\n\
                         01/01/2024,1:00\n"
            .to_vec();
        data.extend_from_slice(b"01/02/2024,2:00,1,0,\xff\xfe ST,,,\n");
        let mut src = RecordSource::new(
            Cursor::new(data),
            &dataset(),
            NonZeroUsize::new(10).unwrap(),
            3,
        )
        .unwrap();

        let batch = src.next().unwrap().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.rows[0].get(1), Some("1:00"));
        assert_eq!(batch.rows[0].get(4), None);
        assert!(batch.rows[1].get(4).unwrap().ends_with(" ST"));
        assert_eq!(batch.rows[1].position, RowPosition::new(3, 1));
    }

    struct FailingReader {
        data: Cursor<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.data.read(buf)?;
            if n == 0 {
                return Err(std::io::Error::other("connection reset"));
            }
            Ok(n)
        }
    }

    #[test]
    fn io_error_is_terminal() {
        let reader = FailingReader {
            data: Cursor::new(CSV.as_bytes().to_vec()),
        };
        let mut src =
            RecordSource::new(reader, &dataset(), NonZeroUsize::new(100).unwrap(), 0).unwrap();
        assert!(matches!(src.next(), Some(Err(SourceError::Csv(_)))));
        assert!(src.next().is_none());
    }

    #[test]
    fn opens_gzip_file_by_suffix() {
        let path = std::env::temp_dir().join("crash_report_reader_test.csv.gz");
        let file = File::create(&path).unwrap();
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        encoder.write_all(CSV.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let location = InputLocation::Path(path.clone());
        assert!(location.has_gzip_suffix());
        let src =
            RecordSource::open(&location, &dataset(), NonZeroUsize::new(3).unwrap(), 0).unwrap();
        let rows: usize = src.map(|b| b.unwrap().len()).sum();
        assert_eq!(rows, 5);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_io_error() {
        let location = InputLocation::from("/definitely/not/here.csv");
        assert!(matches!(
            open_input(&location, None),
            Err(SourceError::Io(_))
        ));
    }

    #[test]
    fn parses_locations() {
        assert_eq!(
            InputLocation::from("https://example.com/rows.csv.gz?x=1"),
            InputLocation::Url("https://example.com/rows.csv.gz?x=1".to_string())
        );
        assert!(InputLocation::from("https://example.com/rows.csv.gz?x=1").has_gzip_suffix());
        assert!(!InputLocation::from("https://example.com/rows.csv?f=.gz").has_gzip_suffix());
        assert_eq!(
            InputLocation::from(" data/crashes.csv "),
            InputLocation::Path(PathBuf::from("data/crashes.csv"))
        );
    }
}
