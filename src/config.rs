//! Validator configuration.
//!
//! A TOML file (all keys optional, kebab-case) fills a [`ValidatorConfig`];
//! callers may override individual fields afterwards. Example:
//!
//! ```toml
//! mode = "trailer-count-strict"
//! engine = "both"
//! reserved-memory-bytes = 4294967296
//! trailer-count-index = 2
//! ```

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConfigError;
use crate::io::Compression;
use crate::memory::{DEFAULT_RESERVED_MEMORY, ESTIMATED_ROW_SIZE};
use crate::schema::EXPECTED_COLUMNS_FILE;

/// Where the reference header for the chunk scan comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceHeader {
    /// Trust the file's own first row.
    FileHeader,
    /// Enforce the externally declared expected columns.
    ExpectedSchema,
}

/// Lines excluded from the physical line count before it is compared with
/// the trailer's self-reported record count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowCountOffset {
    /// Exclude the trailer line only.
    TrailerOnly,
    /// Exclude both the header and the trailer line.
    HeaderAndTrailer,
}

impl RowCountOffset {
    pub const fn lines(self) -> i64 {
        match self {
            RowCountOffset::TrailerOnly => 1,
            RowCountOffset::HeaderAndTrailer => 2,
        }
    }
}

/// Selects the reference header, the row-count convention and whether every
/// line is checked for the delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationMode {
    /// Header scan against the file's own header; no structural checks.
    FileHeader,
    /// Header scan against the expected columns; no structural checks.
    ExpectedSchema,
    /// Expected columns, trailer count excludes the trailer line.
    TrailerCount,
    /// Expected columns, trailer count excludes header and trailer, every
    /// line must carry the delimiter.
    #[default]
    TrailerCountStrict,
}

impl ValidationMode {
    pub const NAMES: &'static str =
        "file-header, expected-schema, trailer-count, trailer-count-strict";

    pub const fn reference(self) -> ReferenceHeader {
        match self {
            ValidationMode::FileHeader => ReferenceHeader::FileHeader,
            ValidationMode::ExpectedSchema
            | ValidationMode::TrailerCount
            | ValidationMode::TrailerCountStrict => ReferenceHeader::ExpectedSchema,
        }
    }

    pub const fn row_count_offset(self) -> Option<RowCountOffset> {
        match self {
            ValidationMode::FileHeader | ValidationMode::ExpectedSchema => None,
            ValidationMode::TrailerCount => Some(RowCountOffset::TrailerOnly),
            ValidationMode::TrailerCountStrict => Some(RowCountOffset::HeaderAndTrailer),
        }
    }

    pub const fn checks_delimiter_consistency(self) -> bool {
        matches!(self, ValidationMode::TrailerCountStrict)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ValidationMode::FileHeader => "file-header",
            ValidationMode::ExpectedSchema => "expected-schema",
            ValidationMode::TrailerCount => "trailer-count",
            ValidationMode::TrailerCountStrict => "trailer-count-strict",
        }
    }
}

impl FromStr for ValidationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file-header" => Ok(ValidationMode::FileHeader),
            "expected-schema" => Ok(ValidationMode::ExpectedSchema),
            "trailer-count" => Ok(ValidationMode::TrailerCount),
            "trailer-count-strict" => Ok(ValidationMode::TrailerCountStrict),
            _ => Err(ConfigError::UnknownValue {
                kind: "mode",
                value: s.to_string(),
                expected: Self::NAMES,
            }),
        }
    }
}

/// Which [`ChunkedValidator`](crate::ChunkedValidator) runs the header scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineChoice {
    #[default]
    Streaming,
    Columnar,
    /// Run both; the scan passes only if both engines pass.
    Both,
}

impl EngineChoice {
    pub const NAMES: &'static str = "streaming, columnar, both";

    pub const fn as_str(self) -> &'static str {
        match self {
            EngineChoice::Streaming => "streaming",
            EngineChoice::Columnar => "columnar",
            EngineChoice::Both => "both",
        }
    }

    pub const fn needs_columnar(self) -> bool {
        matches!(self, EngineChoice::Columnar | EngineChoice::Both)
    }
}

impl FromStr for EngineChoice {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "streaming" => Ok(EngineChoice::Streaming),
            "columnar" => Ok(EngineChoice::Columnar),
            "both" => Ok(EngineChoice::Both),
            _ => Err(ConfigError::UnknownValue {
                kind: "engine",
                value: s.to_string(),
                expected: Self::NAMES,
            }),
        }
    }
}

/// Mode and engine a verdict was produced with, rendered `mode/engine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValidationMethod {
    pub mode: ValidationMode,
    pub engine: EngineChoice,
}

impl fmt::Display for ValidationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.mode.as_str(), self.engine.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ValidatorConfig {
    pub mode: ValidationMode,
    pub engine: EngineChoice,
    /// Memory left untouched when sizing chunks.
    pub reserved_memory_bytes: u64,
    /// Assumed bytes per parsed row when sizing chunks.
    pub estimated_row_size: u64,
    /// Field of the trailer row holding the self-reported data-record count
    /// (0-based).
    pub trailer_count_index: usize,
    /// Lines between progress events in the delimiter consistency pass.
    pub progress_interval: u64,
    /// Forced compression; `None` infers from the file suffix.
    pub compression: Option<Compression>,
    /// WHATWG encoding label of the input files.
    pub encoding: String,
    /// Side file with one expected column name per line.
    pub expected_columns: PathBuf,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            mode: ValidationMode::default(),
            engine: EngineChoice::default(),
            reserved_memory_bytes: DEFAULT_RESERVED_MEMORY,
            estimated_row_size: ESTIMATED_ROW_SIZE,
            trailer_count_index: 2,
            progress_interval: 10_000,
            compression: None,
            encoding: "utf-8".to_string(),
            expected_columns: PathBuf::from(EXPECTED_COLUMNS_FILE),
        }
    }
}

impl ValidatorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.estimated_row_size == 0 {
            return Err(ConfigError::Zero("estimated-row-size"));
        }
        if self.progress_interval == 0 {
            return Err(ConfigError::Zero("progress-interval"));
        }
        if cfg!(not(feature = "columnar")) && self.engine.needs_columnar() {
            return Err(ConfigError::ColumnarUnavailable(self.engine.as_str()));
        }
        self.charset().map(|_| ())
    }

    pub fn charset(&self) -> Result<&'static encoding_rs::Encoding, ConfigError> {
        encoding_rs::Encoding::for_label(self.encoding.as_bytes())
            .ok_or_else(|| ConfigError::UnknownEncoding(self.encoding.clone()))
    }

    pub fn method(&self) -> ValidationMethod {
        ValidationMethod {
            mode: self.mode,
            engine: self.engine,
        }
    }
}
