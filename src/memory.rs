//! Memory probing and chunk sizing.
//!
//! Chunk size is soft admission control: it caps how many rows a scan
//! materializes at once but reserves nothing.

use sysinfo::{MemoryRefreshKind, RefreshKind, System};

/// Default headroom left untouched when sizing chunks (1 GiB).
pub const DEFAULT_RESERVED_MEMORY: u64 = 1 << 30;

/// Assumed in-memory footprint of one parsed row.
pub const ESTIMATED_ROW_SIZE: u64 = 500;

/// Available memory in bytes, preferring the cgroup limit when one applies.
pub fn available_memory() -> u64 {
    let mut system = System::new_with_specifics(
        RefreshKind::nothing().with_memory(MemoryRefreshKind::everything()),
    );
    system.refresh_memory();

    if let Some(limits) = system.cgroup_limits() {
        return limits.free_memory;
    }

    let available = system.available_memory();
    // sysinfo can report 0 on some macOS versions
    if available > 0 {
        available
    } else {
        system.total_memory() / 2
    }
}

/// Rows per chunk: `max(available - reserved, 0) / row_size`, never below 1.
pub fn chunk_size(available: u64, reserved: u64, row_size: u64) -> usize {
    let usable = available.saturating_sub(reserved);
    let rows = usable / row_size.max(1);
    usize::try_from(rows).unwrap_or(usize::MAX).max(1)
}
