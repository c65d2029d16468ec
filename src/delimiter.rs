use std::fmt;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::{DelimiterError, ValidateResult};
use crate::io::Source;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delimiter {
    Comma,
    Pipe,
}

impl Delimiter {
    pub const fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Pipe => b'|',
        }
    }

    pub const fn as_char(self) -> char {
        self.as_byte() as char
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.as_char())
    }
}

/// Classify a single header line. Exactly one of `,` or `|` must be present.
pub fn classify_header_line(line: &[u8]) -> Result<Delimiter, DelimiterError> {
    let comma = memchr::memchr(b',', line).is_some();
    let pipe = memchr::memchr(b'|', line).is_some();
    match (comma, pipe) {
        (true, true) => Err(DelimiterError::Ambiguous),
        (true, false) => Ok(Delimiter::Comma),
        (false, true) => Ok(Delimiter::Pipe),
        (false, false) => Err(DelimiterError::Unknown),
    }
}

/// Read the first line of `source` and classify it. The reader is dropped
/// afterwards; later passes open their own.
pub async fn detect_delimiter(source: &Source) -> ValidateResult<Delimiter> {
    let mut reader = BufReader::new(source.open().await?);
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line).await?;
    let delimiter = classify_header_line(&line)?;
    tracing::debug!(path = %source.path().display(), %delimiter, "delimiter detected");
    Ok(delimiter)
}
