//! Streaming validation of comma- and pipe-delimited files.
//!
//! - Plain, gzip (`.gz`) and zstd (`.zst`) sources; compression is pinned per
//!   file and every pass reads through the same decoder.
//! - Checks, in order: delimiter of the header line, header against an
//!   expected column list (or the file's own header), trailer record count and
//!   per-line delimiter presence, depending on [`ValidationMode`].
//! - Header scans run through a [`ChunkedValidator`] engine sized from free
//!   memory; `ColumnarValidator` (feature `columnar`) is the in-memory
//!   Arrow alternative.
//!
//! Data shape:
//! - [`Validator::validate`] returns a [`Verdict`] `{ status, elapsed, method, failure, .. }`
//! - [`run_batch`] takes and returns the caller's [`ScannedSet`]
#![cfg_attr(docsrs, feature(doc_cfg))]
//
mod batch;
mod codec;
mod config;
mod delimiter;
mod error;
#[cfg(feature = "fast_local")]
mod fast;
mod io;
pub mod ledger;
pub mod logging;
pub mod memory;
mod scanner;
mod schema;
pub mod structure;
mod validate;

pub use crate::batch::{discover, run_batch, BatchReport, ScannedSet};
pub use crate::config::{
    EngineChoice, ReferenceHeader, RowCountOffset, ValidationMethod, ValidationMode,
    ValidatorConfig,
};
pub use crate::delimiter::{classify_header_line, detect_delimiter, Delimiter};
pub use crate::error::{
    ConfigError, DelimiterError, StructuralError, ValidateError, ValidateResult,
};
#[cfg(feature = "fast_local")]
pub use crate::fast::mmap_line_stats;
pub use crate::io::{build_reader, BoxedReader, Compression, Source};
#[cfg(feature = "columnar")]
pub use crate::scanner::ColumnarValidator;
pub use crate::scanner::{
    ChunkedValidator, Reference, ScanOutcome, ScanRequest, SchemaMismatch, StreamingValidator,
};
pub use crate::schema::{ExpectedSchema, EXPECTED_COLUMNS_FILE};
pub use crate::structure::LineStats;
pub use crate::validate::{Failure, Stage, Status, Validator, Verdict};
