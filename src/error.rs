use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::io::Compression;
use crate::scanner::SchemaMismatch;

/// Header line could not be classified as comma- or pipe-delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DelimiterError {
    #[error("header line contains both ',' and '|'")]
    Ambiguous,
    #[error("header line contains neither ',' nor '|'")]
    Unknown,
}

/// Whole-file consistency failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("row count {counted} does not match trailer record count {reported}")]
    RowCountMismatch { counted: i64, reported: i64 },
    #[error("malformed last row: {reason}")]
    MalformedLastRow { reason: String },
    #[error("line {0} does not contain the delimiter")]
    MissingDelimiterOnLine(u64),
    /// `line` counts the header as line 1 and data records after it.
    #[error("line {line} has more than {expected} fields")]
    TooManyFields { line: u64, expected: usize },
}

/// Rejected configuration. Raised before any file is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown encoding label: {0}")]
    UnknownEncoding(String),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("unknown {kind} `{value}` (expected one of: {expected})")]
    UnknownValue {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("engine `{0}` requires the `columnar` feature")]
    ColumnarUnavailable(&'static str),
}

/// Everything that can fail a single file's validation.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Delimiter(#[from] DelimiterError),
    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatch),
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error("mode requires an expected schema but none was loaded")]
    MissingExpectedSchema,
    #[error("{compression} stream is corrupt: {source}")]
    Decompression {
        compression: Compression,
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv_async::Error),
    #[cfg(feature = "columnar")]
    #[error(transparent)]
    Columnar(#[from] arrow::error::ArrowError),
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ValidateError {
    /// Reclassify an I/O fault raised while reading a compressed source.
    pub(crate) fn with_compression(self, compression: Compression) -> Self {
        match self {
            ValidateError::Io(source)
                if compression != Compression::None
                    && matches!(
                        source.kind(),
                        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof
                    ) =>
            {
                ValidateError::Decompression {
                    compression,
                    source,
                }
            }
            other => other,
        }
    }
}

pub type ValidateResult<T> = std::result::Result<T, ValidateError>;
