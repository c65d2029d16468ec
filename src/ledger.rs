//! On-disk bookkeeping used by the command-line driver: the list of already
//! scanned files and the append-only validation record log. The validation
//! engine never calls into this module.

use csv_async::AsyncWriterBuilder;
use std::io;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::batch::ScannedSet;
use crate::validate::Verdict;

pub const SCANNED_FILES: &str = "scanned_files.txt";
pub const RECORDS_FILE: &str = "scanned_files_info.csv";
pub const RECORD_HEADER: [&str; 3] = ["file_path", "time_taken", "validation_method"];

/// One path per line. A missing file is an empty set.
pub async fn load_scanned(path: &Path) -> io::Result<ScannedSet> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text
            .lines()
            .filter(|line| !line.is_empty())
            .map(Into::into)
            .collect()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(ScannedSet::new()),
        Err(err) => Err(err),
    }
}

/// Rewrite the list, sorted for stable diffs.
pub async fn save_scanned(path: &Path, scanned: &ScannedSet) -> io::Result<()> {
    let mut paths: Vec<_> = scanned.iter().map(|p| p.to_string_lossy()).collect();
    paths.sort();
    let mut out = String::new();
    for p in paths {
        out.push_str(&p);
        out.push('\n');
    }
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(out.as_bytes()).await?;
    file.flush().await
}

/// Append `file_path,time_taken,validation_method` rows, writing the header
/// first when the log does not exist yet.
pub async fn append_records<'a, I>(path: &Path, verdicts: I) -> csv_async::Result<()>
where
    I: IntoIterator<Item = &'a Verdict>,
{
    let exists = tokio::fs::try_exists(path).await?;
    let file = OpenOptions::new().create(true).append(true).open(path).await?;
    let mut wtr = AsyncWriterBuilder::new()
        .has_headers(false)
        .create_writer(file);
    if !exists {
        wtr.write_record(RECORD_HEADER).await?;
    }
    for verdict in verdicts {
        wtr.write_record([
            verdict.path.display().to_string(),
            format!("{:.2}", verdict.elapsed.as_secs_f64()),
            verdict.method.to_string(),
        ])
        .await?;
    }
    wtr.flush().await?;
    Ok(())
}
