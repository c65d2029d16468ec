//! Per-file validation: delimiter, header, structure, in that order.
//!
//! ```text
//! Start -> DelimiterDetected -> SchemaChecked -> StructurallyChecked -> Pass
//!   \______________\__________________\_______________________________-> Fail
//! ```
//!
//! Every error is caught here and recorded in the [`Verdict`]; nothing escapes
//! a single file's validation.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::{EngineChoice, ReferenceHeader, ValidationMethod, ValidatorConfig};
use crate::delimiter::{detect_delimiter, Delimiter};
use crate::error::{ConfigError, ValidateError, ValidateResult};
use crate::io::Source;
use crate::memory;
use crate::scanner::{ChunkedValidator, Reference, ScanOutcome, ScanRequest, StreamingValidator};
use crate::schema::ExpectedSchema;
use crate::structure;

/// Stage a file failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Delimiter,
    Schema,
    Structure,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Delimiter => "delimiter",
            Stage::Schema => "schema",
            Stage::Structure => "structure",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Pass,
    Fail,
}

#[derive(Debug)]
pub struct Failure {
    pub stage: Stage,
    pub error: ValidateError,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.error)
    }
}

/// Immutable result of validating one file.
#[derive(Debug)]
pub struct Verdict {
    pub path: PathBuf,
    pub status: Status,
    pub elapsed: Duration,
    pub method: ValidationMethod,
    pub failure: Option<Failure>,
    pub delimiter: Option<Delimiter>,
    /// Data rows seen by the header scan.
    pub rows_scanned: Option<u64>,
    /// Line count after the mode's header/trailer offset.
    pub row_count: Option<i64>,
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        self.status == Status::Pass
    }

    /// Delimiter detection failed: the file was skipped rather than checked.
    pub fn is_skip(&self) -> bool {
        matches!(
            self.failure,
            Some(Failure {
                error: ValidateError::Delimiter(_),
                ..
            })
        )
    }
}

#[derive(Debug, Default)]
struct Observed {
    delimiter: Option<Delimiter>,
    rows_scanned: Option<u64>,
    row_count: Option<i64>,
}

/// Validates files one at a time against a fixed configuration and an
/// optional expected schema. Holds no per-file state.
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidatorConfig,
    charset: &'static encoding_rs::Encoding,
    expected: Option<ExpectedSchema>,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let charset = config.charset()?;
        Ok(Self {
            config,
            charset,
            expected: None,
        })
    }

    #[must_use]
    pub fn with_expected_schema(mut self, schema: ExpectedSchema) -> Self {
        self.expected = Some(schema);
        self
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn expected_schema(&self) -> Option<&ExpectedSchema> {
        self.expected.as_ref()
    }

    pub async fn validate(&self, path: &Path) -> Verdict {
        let start = Instant::now();
        let source = Source::new(path, self.config.compression, self.charset);
        let mut observed = Observed::default();

        let failure = self
            .run(&source, &mut observed)
            .await
            .err()
            .map(|Failure { stage, error }| Failure {
                stage,
                error: error.with_compression(source.compression()),
            });

        let verdict = Verdict {
            path: path.to_path_buf(),
            status: if failure.is_none() {
                Status::Pass
            } else {
                Status::Fail
            },
            elapsed: start.elapsed(),
            method: self.config.method(),
            failure,
            delimiter: observed.delimiter,
            rows_scanned: observed.rows_scanned,
            row_count: observed.row_count,
        };
        log_verdict(&verdict);
        verdict
    }

    async fn run(&self, source: &Source, observed: &mut Observed) -> Result<(), Failure> {
        let mode = self.config.mode;

        let delimiter = detect_delimiter(source).await.map_err(at(Stage::Delimiter))?;
        observed.delimiter = Some(delimiter);

        let reference = match mode.reference() {
            ReferenceHeader::FileHeader => Reference::FileHeader,
            ReferenceHeader::ExpectedSchema => match &self.expected {
                Some(schema) => Reference::Expected(schema),
                None => return Err(at(Stage::Schema)(ValidateError::MissingExpectedSchema)),
            },
        };
        let chunk_size = memory::chunk_size(
            memory::available_memory(),
            self.config.reserved_memory_bytes,
            self.config.estimated_row_size,
        );
        tracing::debug!(path = %source.path().display(), chunk_size, "sized chunks");

        let request = ScanRequest {
            source,
            delimiter,
            reference,
            chunk_size,
        };
        let outcome = self.scan(&request).await.map_err(at(Stage::Schema))?;
        observed.rows_scanned = Some(outcome.rows);
        if let Some(mismatch) = outcome.mismatch {
            return Err(at(Stage::Schema)(mismatch));
        }

        if let Some(offset) = mode.row_count_offset() {
            let stats = structure::line_stats(source)
                .await
                .map_err(at(Stage::Structure))?;
            let counted = i64::try_from(stats.lines).unwrap_or(i64::MAX) - offset.lines();
            observed.row_count = Some(counted);

            let last_row = stats.last_row(delimiter).map_err(at(Stage::Structure))?;
            structure::check_trailer(&last_row, self.config.trailer_count_index, counted)
                .map_err(at(Stage::Structure))?;
        }

        if mode.checks_delimiter_consistency() {
            structure::check_delimiter_consistency(
                source,
                delimiter,
                self.config.progress_interval,
            )
            .await
            .map_err(at(Stage::Structure))?;
        }

        Ok(())
    }

    async fn scan(&self, request: &ScanRequest<'_>) -> ValidateResult<ScanOutcome> {
        match self.config.engine {
            EngineChoice::Streaming => StreamingValidator.scan(request).await,
            #[cfg(feature = "columnar")]
            EngineChoice::Columnar => crate::scanner::ColumnarValidator.scan(request).await,
            #[cfg(feature = "columnar")]
            EngineChoice::Both => {
                let streaming = StreamingValidator.scan(request).await?;
                if !streaming.passed() {
                    return Ok(streaming);
                }
                crate::scanner::ColumnarValidator.scan(request).await
            }
            #[cfg(not(feature = "columnar"))]
            engine @ (EngineChoice::Columnar | EngineChoice::Both) => {
                Err(ConfigError::ColumnarUnavailable(engine.as_str()).into())
            }
        }
    }
}

fn at<E: Into<ValidateError>>(stage: Stage) -> impl FnOnce(E) -> Failure {
    move |error| Failure {
        stage,
        error: error.into(),
    }
}

fn log_verdict(verdict: &Verdict) {
    let path = verdict.path.display();
    let elapsed_ms = verdict.elapsed.as_millis() as u64;
    let method = verdict.method.to_string();
    match &verdict.failure {
        None => tracing::info!(%path, %method, elapsed_ms, "file passed validation"),
        Some(failure) if verdict.is_skip() => {
            tracing::warn!(%path, %method, reason = %failure.error, "skipping file")
        }
        Some(failure) => tracing::error!(
            %path,
            %method,
            elapsed_ms,
            stage = %failure.stage,
            reason = %failure.error,
            "file failed validation"
        ),
    }
}
