#![allow(dead_code)]

use async_compression::tokio::write::{GzipEncoder, ZstdEncoder};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

pub const COLUMNS: [&str; 4] = ["id", "name", "amount", "region"];

/// Header + `rows` data rows + trailer `TRL<d>20240611<d><reported>`.
pub fn fixture(delim: char, rows: u64, reported: &str) -> String {
    let mut body = COLUMNS.join(&delim.to_string());
    body.push('\n');
    for i in 0..rows {
        writeln!(body, "{i}{delim}name_{i}{delim}{}{delim}EU", i * 3).unwrap();
    }
    writeln!(body, "TRL{delim}20240611{delim}{reported}").unwrap();
    body
}

pub fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, body).unwrap();
    path
}

pub fn write_expected(dir: &Path, columns: &[&str]) -> PathBuf {
    write(dir, "expected_columns.txt", &(columns.join("\n") + "\n"))
}

pub async fn gzip(dir: &Path, name: &str, body: &str) -> anyhow::Result<PathBuf> {
    let path = dir.join(name);
    let mut enc = GzipEncoder::new(tokio::fs::File::create(&path).await?);
    enc.write_all(body.as_bytes()).await?;
    enc.shutdown().await?;
    Ok(path)
}

pub async fn zstd(dir: &Path, name: &str, body: &str) -> anyhow::Result<PathBuf> {
    let path = dir.join(name);
    let mut enc = ZstdEncoder::new(tokio::fs::File::create(&path).await?);
    enc.write_all(body.as_bytes()).await?;
    enc.shutdown().await?;
    Ok(path)
}
