//! Apply a [`Validator`] to a single file or every file under a directory.
//!
//! The set of already-scanned paths is owned by the caller: it is passed in,
//! consulted read-only for skipping, and handed back extended with the paths
//! that passed in this run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::validate::{Validator, Verdict};

pub type ScannedSet = HashSet<PathBuf>;

#[derive(Debug)]
pub struct BatchReport {
    /// One verdict per validated file, in discovery order.
    pub verdicts: Vec<Verdict>,
    /// Paths skipped because the incoming set already held them.
    pub already_scanned: Vec<PathBuf>,
    /// Incoming set plus every path that passed.
    pub scanned: ScannedSet,
    /// Directory entries that could not be read.
    pub walk_errors: Vec<walkdir::Error>,
}

impl BatchReport {
    pub fn passed(&self) -> usize {
        self.verdicts.iter().filter(|v| v.is_pass()).count()
    }

    /// Failed verdicts, not counting skipped files.
    pub fn failed(&self) -> usize {
        self.verdicts
            .iter()
            .filter(|v| !v.is_pass() && !v.is_skip())
            .count()
    }

    /// Files whose delimiter could not be detected.
    pub fn skipped(&self) -> usize {
        self.verdicts.iter().filter(|v| v.is_skip()).count()
    }
}

/// Files under `root` in a stable (name-sorted) order. A file root yields itself.
pub fn discover(root: &Path) -> (Vec<PathBuf>, Vec<walkdir::Error>) {
    if root.is_file() {
        return (vec![root.to_path_buf()], Vec::new());
    }

    let mut files = Vec::new();
    let mut errors = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "directory traversal error");
                errors.push(err);
            }
        }
    }
    (files, errors)
}

/// Validate every file under `root` that is not already in `scanned`, one at
/// a time. A failing file never stops the batch.
pub async fn run_batch(validator: &Validator, root: &Path, mut scanned: ScannedSet) -> BatchReport {
    let (files, walk_errors) = discover(root);
    tracing::info!(root = %root.display(), files = files.len(), "starting batch");

    let mut verdicts = Vec::with_capacity(files.len());
    let mut already_scanned = Vec::new();
    for path in files {
        if scanned.contains(&path) {
            tracing::info!(path = %path.display(), "skipping already scanned file");
            already_scanned.push(path);
            continue;
        }
        let verdict = validator.validate(&path).await;
        if verdict.is_pass() {
            scanned.insert(path);
        }
        verdicts.push(verdict);
    }

    let report = BatchReport {
        verdicts,
        already_scanned,
        scanned,
        walk_errors,
    };
    tracing::info!(
        passed = report.passed(),
        failed = report.failed(),
        skipped = report.skipped(),
        already_scanned = report.already_scanned.len(),
        "batch finished"
    );
    report
}
