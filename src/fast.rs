use memchr::{memchr_iter, memrchr};
use memmap2::MmapOptions;
use std::fs::File;
use std::io;
use std::path::Path;
use std::thread::{self, ScopedJoinHandle};

use crate::structure::LineStats;

/// Count lines with a memory map, splitting the newline scan across cores.
/// Assumes the bytes on disk are the decoded stream (no compression, UTF-8).
pub fn mmap_line_stats(path: &Path) -> io::Result<LineStats> {
    let file = File::open(path)?;
    let len = usize::try_from(file.metadata()?.len())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    if len == 0 {
        return Ok(LineStats {
            lines: 0,
            last_line: None,
        });
    }

    // SAFETY: the map is read-only and dropped before returning; concurrent
    // truncation of the file by another process is not guarded against.
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    let data: &[u8] = &mmap[..];

    let cores = num_cpus::get().max(1);
    let span = len.div_ceil(cores);
    let newlines: usize = thread::scope(|s| {
        let handles: Vec<_> = data
            .chunks(span)
            .map(|part| s.spawn(move || memchr_iter(b'\n', part).count()))
            .collect();
        sum_joined(handles)
    })?;

    let terminated = data[len - 1] == b'\n';
    let body = if terminated { &data[..len - 1] } else { data };
    let start = memrchr(b'\n', body).map_or(0, |i| i + 1);

    Ok(LineStats {
        lines: newlines as u64 + u64::from(!terminated),
        last_line: Some(body[start..].to_vec()),
    })
}

/// A panicked worker fails the count instead of contributing zero.
fn sum_joined(handles: Vec<ScopedJoinHandle<'_, usize>>) -> io::Result<usize> {
    handles
        .into_iter()
        .map(|h| {
            h.join()
                .map_err(|_| io::Error::other("newline counting thread panicked"))
        })
        .sum()
}
