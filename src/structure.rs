//! Whole-file structural passes. Each pass opens its own reader and consumes
//! the decoded stream from the first byte to the last.

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

use crate::delimiter::Delimiter;
use crate::error::{StructuralError, ValidateResult};
use crate::io::{Source, READ_BUFFER};

/// Line count and final line of the decoded stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineStats {
    /// Physical lines: a trailing newline does not start a new line, an
    /// unterminated final line still counts.
    pub lines: u64,
    /// Final line without its `\n`; `None` for an empty file.
    pub last_line: Option<Vec<u8>>,
}

impl LineStats {
    /// The final line, whitespace-trimmed and split on the delimiter
    /// character. No quote handling: trailers are plain fields.
    pub fn last_row(&self, delimiter: Delimiter) -> Result<Vec<String>, StructuralError> {
        let line = self
            .last_line
            .as_deref()
            .ok_or_else(|| StructuralError::MalformedLastRow {
                reason: "file is empty".to_string(),
            })?;
        Ok(split_row(line, delimiter))
    }
}

/// One pass yielding both the line count and the last line.
pub async fn line_stats(source: &Source) -> ValidateResult<LineStats> {
    #[cfg(feature = "fast_local")]
    if source.is_plain_utf8() {
        let path = source.path().to_path_buf();
        let stats =
            tokio::task::spawn_blocking(move || crate::fast::mmap_line_stats(&path)).await??;
        return Ok(stats);
    }

    let mut reader = source.open().await?;
    let mut buf = vec![0u8; READ_BUFFER];
    let mut newlines = 0u64;
    // `complete` is the latest newline-terminated line, `pending` the bytes
    // after the most recent newline.
    let mut complete: Option<Vec<u8>> = None;
    let mut pending = Vec::new();
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        let data = &buf[..n];
        newlines += memchr::memchr_iter(b'\n', data).count() as u64;
        match memchr::memrchr(b'\n', data) {
            Some(end) => {
                let line = match memchr::memrchr(b'\n', &data[..end]) {
                    Some(prev) => data[prev + 1..end].to_vec(),
                    None => {
                        pending.extend_from_slice(&data[..end]);
                        std::mem::take(&mut pending)
                    }
                };
                complete = Some(line);
                pending.clear();
                pending.extend_from_slice(&data[end + 1..]);
            }
            None => pending.extend_from_slice(data),
        }
    }

    Ok(if pending.is_empty() {
        LineStats {
            lines: newlines,
            last_line: complete,
        }
    } else {
        LineStats {
            lines: newlines + 1,
            last_line: Some(pending),
        }
    })
}

fn split_row(line: &[u8], delimiter: Delimiter) -> Vec<String> {
    String::from_utf8_lossy(line)
        .trim()
        .split(delimiter.as_char())
        .map(str::to_owned)
        .collect()
}

/// Every line must contain the delimiter. Returns the number of lines checked;
/// fails on the first offender with its 1-based line number.
pub async fn check_delimiter_consistency(
    source: &Source,
    delimiter: Delimiter,
    progress_interval: u64,
) -> ValidateResult<u64> {
    let mut reader = BufReader::with_capacity(READ_BUFFER, source.open().await?);
    let needle = delimiter.as_byte();
    let interval = progress_interval.max(1);
    let mut line = Vec::new();
    let mut line_no = 0u64;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        line_no += 1;
        if memchr::memchr(needle, &line).is_none() {
            return Err(StructuralError::MissingDelimiterOnLine(line_no).into());
        }
        if line_no % interval == 0 {
            tracing::info!(
                path = %source.path().display(),
                lines = line_no,
                "delimiter consistency in progress"
            );
        }
    }
    Ok(line_no)
}

/// Compare the trailer's self-reported record count at `index` with `counted`.
pub fn check_trailer(
    last_row: &[String],
    index: usize,
    counted: i64,
) -> Result<i64, StructuralError> {
    let field = last_row
        .get(index)
        .ok_or_else(|| StructuralError::MalformedLastRow {
            reason: format!(
                "trailer has {} field(s), no record count at index {index}",
                last_row.len()
            ),
        })?;
    let reported: i64 =
        field
            .trim()
            .parse()
            .map_err(|_| StructuralError::MalformedLastRow {
                reason: format!("record count field {index} is not an integer: {field:?}"),
            })?;
    if reported == counted {
        Ok(reported)
    } else {
        Err(StructuralError::RowCountMismatch { counted, reported })
    }
}
