use std::path::Path;

use crate::error::ConfigError;

/// Well-known name of the side file holding the expected columns.
pub const EXPECTED_COLUMNS_FILE: &str = "expected_columns.txt";

/// Ordered column contract a file header must match exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedSchema {
    columns: Vec<String>,
}

impl ExpectedSchema {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// One name per line; surrounding whitespace is trimmed and blank lines dropped.
    pub fn parse(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        )
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let schema = Self::parse(&text);
        tracing::info!(
            path = %path.display(),
            columns = schema.len(),
            "loaded expected columns"
        );
        Ok(schema)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Order-sensitive equality; a permutation of the same names is a mismatch.
    pub fn matches(&self, header: &[String]) -> bool {
        self.columns == header
    }
}
