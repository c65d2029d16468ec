//! Chunked header scan.
//!
//! The file is parsed from the start in bounded chunks. The column header is
//! captured once and every chunk is checked against the reference header; the
//! first mismatch ends the scan. Two interchangeable engines implement
//! [`ChunkedValidator`]: [`StreamingValidator`] keeps at most one chunk of
//! records in memory, `ColumnarValidator` (feature `columnar`) loads the whole
//! file into an Arrow batch first and re-slices it.
//!
//! Both engines share one record-width rule: a record shorter than the header
//! is accepted (missing fields are empty), a record wider than the header
//! fails the scan with [`StructuralError::TooManyFields`].

use csv_async::{AsyncReaderBuilder, ByteRecord};
use thiserror::Error;

use crate::delimiter::Delimiter;
use crate::error::{StructuralError, ValidateResult};
use crate::io::{Source, READ_BUFFER};
use crate::schema::ExpectedSchema;

/// Upper bound on up-front allocation; chunk sizes derived from free memory
/// can be in the tens of millions.
const MAX_PREALLOC_ROWS: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("header mismatch in chunk {chunk}: expected {expected:?}, found {actual:?}")]
pub struct SchemaMismatch {
    pub chunk: u64,
    pub expected: Vec<String>,
    pub actual: Vec<String>,
}

/// Header the chunks are compared against.
#[derive(Debug, Clone, Copy)]
pub enum Reference<'a> {
    /// The file's own header (first row).
    FileHeader,
    /// An externally declared column list.
    Expected(&'a ExpectedSchema),
}

impl Reference<'_> {
    /// `header` is the file's own header captured at the start of the scan,
    /// `columns` the header carried by chunk number `chunk`.
    fn check(&self, header: &[String], columns: &[String], chunk: u64) -> Option<SchemaMismatch> {
        let (accepted, expected) = match *self {
            Reference::FileHeader => (header == columns, header),
            Reference::Expected(schema) => (schema.matches(columns), schema.columns()),
        };
        (!accepted).then(|| SchemaMismatch {
            chunk,
            expected: expected.to_vec(),
            actual: columns.to_vec(),
        })
    }
}

pub struct ScanRequest<'a> {
    pub source: &'a Source,
    pub delimiter: Delimiter,
    pub reference: Reference<'a>,
    /// Rows per chunk, at least 1.
    pub chunk_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub header: Vec<String>,
    /// Data rows processed before the scan finished or stopped.
    pub rows: u64,
    /// Chunks that passed the header check.
    pub chunks: u64,
    pub mismatch: Option<SchemaMismatch>,
}

impl ScanOutcome {
    fn start(header: Vec<String>) -> Self {
        Self {
            header,
            rows: 0,
            chunks: 0,
            mismatch: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.mismatch.is_none()
    }
}

/// Line number of the `index`-th (0-based) data record; the header is line 1.
fn record_line(index: u64) -> u64 {
    index + 2
}

/// Capability shared by the scan engines. Both must give the same pass/fail
/// answer for the same request.
#[allow(async_fn_in_trait)]
pub trait ChunkedValidator {
    fn name(&self) -> &'static str;

    async fn scan(&self, request: &ScanRequest<'_>) -> ValidateResult<ScanOutcome>;
}

/// csv-async record reader; at most `chunk_size` records are held at once.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingValidator;

impl ChunkedValidator for StreamingValidator {
    fn name(&self) -> &'static str {
        "streaming"
    }

    async fn scan(&self, request: &ScanRequest<'_>) -> ValidateResult<ScanOutcome> {
        let reader = request.source.open().await?;
        let mut rdr = AsyncReaderBuilder::new()
            .delimiter(request.delimiter.as_byte())
            .has_headers(true)
            .flexible(true)
            .buffer_capacity(READ_BUFFER)
            .create_reader(reader);

        let header: Vec<String> = rdr.headers().await?.iter().map(str::to_owned).collect();
        let width = header.len();
        let chunk_size = request.chunk_size.max(1);

        let mut outcome = ScanOutcome::start(header);
        let mut chunk: Vec<ByteRecord> = Vec::with_capacity(chunk_size.min(MAX_PREALLOC_ROWS));
        let mut record = ByteRecord::new();

        loop {
            // every chunk shares the header captured above
            if let Some(mismatch) =
                request
                    .reference
                    .check(&outcome.header, &outcome.header, outcome.chunks)
            {
                outcome.mismatch = Some(mismatch);
                return Ok(outcome);
            }

            chunk.clear();
            while chunk.len() < chunk_size && rdr.read_byte_record(&mut record).await? {
                if record.len() > width {
                    let index = outcome.rows + chunk.len() as u64;
                    return Err(StructuralError::TooManyFields {
                        line: record_line(index),
                        expected: width,
                    }
                    .into());
                }
                chunk.push(std::mem::replace(&mut record, ByteRecord::new()));
            }
            // a header-only file is still one (empty) chunk
            if chunk.is_empty() && outcome.chunks > 0 {
                break;
            }

            outcome.rows += chunk.len() as u64;
            outcome.chunks += 1;
            tracing::debug!(
                path = %request.source.path().display(),
                engine = self.name(),
                chunk = outcome.chunks,
                rows = chunk.len(),
                "processed chunk"
            );

            if chunk.len() < chunk_size {
                break;
            }
        }

        Ok(outcome)
    }
}

#[cfg(feature = "columnar")]
pub use columnar::ColumnarValidator;

#[cfg(feature = "columnar")]
mod columnar {
    use std::io::{BufRead, BufReader, Read};
    use std::sync::Arc;

    use arrow::compute::concat_batches;
    use arrow::csv::reader::Format;
    use arrow::csv::ReaderBuilder;
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::error::ArrowError;
    use arrow::record_batch::RecordBatch;
    use tokio_util::io::SyncIoBridge;

    use super::{record_line, ChunkedValidator, ScanOutcome, ScanRequest};
    use crate::error::{StructuralError, ValidateError, ValidateResult};
    use crate::io::READ_BUFFER;

    const ARROW_BATCH_ROWS: usize = 64 * 1024;

    /// Materializes the whole file as one Arrow batch (every column Utf8,
    /// short rows null-padded), then re-slices it into `chunk_size` windows.
    /// Trades memory for a columnar copy of the data.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ColumnarValidator;

    impl ChunkedValidator for ColumnarValidator {
        fn name(&self) -> &'static str {
            "columnar"
        }

        async fn scan(&self, request: &ScanRequest<'_>) -> ValidateResult<ScanOutcome> {
            let reader = SyncIoBridge::new(request.source.open().await?);
            let delimiter = request.delimiter.as_byte();
            let (header, table) =
                tokio::task::spawn_blocking(move || load_table(reader, delimiter)).await??;

            let mut outcome = ScanOutcome::start(header);
            if let Some(mismatch) = request.reference.check(&outcome.header, &outcome.header, 0) {
                outcome.mismatch = Some(mismatch);
                return Ok(outcome);
            }
            let table = table.map_err(|err| match too_many_fields(&err) {
                Some(wide) => ValidateError::Structural(wide),
                None => ValidateError::Columnar(err),
            })?;

            let chunk_size = request.chunk_size.max(1);
            let total = table.num_rows();
            let mut offset = 0;
            loop {
                let len = (total - offset).min(chunk_size);
                let window = table.slice(offset, len);
                if let Some(mismatch) = request.reference.check(
                    &outcome.header,
                    &column_names(&window),
                    outcome.chunks,
                ) {
                    outcome.mismatch = Some(mismatch);
                    return Ok(outcome);
                }

                outcome.rows += len as u64;
                outcome.chunks += 1;
                offset += len;
                tracing::debug!(
                    path = %request.source.path().display(),
                    engine = self.name(),
                    chunk = outcome.chunks,
                    rows = len,
                    "processed columnar window"
                );
                if offset >= total {
                    break;
                }
            }

            Ok(outcome)
        }
    }

    fn column_names(batch: &RecordBatch) -> Vec<String> {
        batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Arrow rejects a record wider than the schema with
    /// `incorrect number of fields for line N, expected E got G` (or
    /// `got more than G` when its field buffer fills first). `N` counts data
    /// records from 1 because the header never reaches the Arrow reader.
    pub(super) fn too_many_fields(err: &ArrowError) -> Option<StructuralError> {
        let ArrowError::CsvError(message) = err else {
            return None;
        };
        let rest = message.strip_prefix("incorrect number of fields for line ")?;
        let (record, rest) = rest.split_once(", expected ")?;
        let (expected, got) = rest.split_once(" got ")?;
        let record: u64 = record.parse().ok()?;
        let expected: usize = expected.parse().ok()?;
        let wider = match got.strip_prefix("more than ") {
            Some(_) => true,
            None => got.parse::<usize>().ok()? > expected,
        };
        wider.then(|| StructuralError::TooManyFields {
            line: record_line(record.saturating_sub(1)),
            expected,
        })
    }

    /// Header names plus the data records as one batch. Header I/O errors
    /// fail the task; data errors are returned alongside the header so the
    /// header check still runs first.
    #[allow(clippy::type_complexity)]
    fn load_table<R: Read>(
        reader: R,
        delimiter: u8,
    ) -> Result<(Vec<String>, Result<RecordBatch, ArrowError>), ArrowError> {
        let mut reader = BufReader::with_capacity(READ_BUFFER, reader);
        let mut header_line = Vec::new();
        reader.read_until(b'\n', &mut header_line)?;

        let (inferred, _) = Format::default()
            .with_header(true)
            .with_delimiter(delimiter)
            .infer_schema(header_line.as_slice(), Some(0))?;
        let header: Vec<String> = inferred.fields().iter().map(|f| f.name().clone()).collect();
        let schema = Arc::new(Schema::new(
            inferred
                .fields()
                .iter()
                .map(|f| Field::new(f.name(), DataType::Utf8, true))
                .collect::<Vec<_>>(),
        ));

        let table = ReaderBuilder::new(schema.clone())
            .with_header(false)
            .with_delimiter(delimiter)
            .with_truncated_rows(true)
            .with_batch_size(ARROW_BATCH_ROWS)
            .build_buffered(reader)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .and_then(|batches| concat_batches(&schema, &batches));
        Ok((header, table))
    }
}
