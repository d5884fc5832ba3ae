//! Memory and thread counters from `/proc/<pid>/status`.

use std::fs;
use std::path::Path;
use tracing::debug;

/// Resident/virtual memory and thread count of a process at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemorySnapshot {
    pub rss_bytes: u64,
    pub vsize_bytes: u64,
    pub threads: u64,
}

/// Parses kilobyte values from status file lines (`"  1234 kB"`).
pub fn parse_kb_value(v: &str) -> Option<u64> {
    v.split_whitespace().next()?.parse().ok()
}

/// Extracts VmRSS, VmSize and Threads from a status record.
///
/// Keys that are missing or unparsable stay at zero. Kernel threads have no
/// Vm* lines at all.
pub fn parse_status(content: &str) -> MemorySnapshot {
    let mut snap = MemorySnapshot::default();

    for line in content.lines() {
        if let Some(v) = line.strip_prefix("VmRSS:") {
            snap.rss_bytes = parse_kb_value(v).unwrap_or(0).saturating_mul(1024);
        } else if let Some(v) = line.strip_prefix("VmSize:") {
            snap.vsize_bytes = parse_kb_value(v).unwrap_or(0).saturating_mul(1024);
        } else if let Some(v) = line.strip_prefix("Threads:") {
            snap.threads = parse_kb_value(v).unwrap_or(0);
        }
    }

    snap
}

/// Reads `<proc_path>/status`. An unreadable record yields an all-zero snapshot.
pub fn read_memory_and_threads(proc_path: &Path) -> MemorySnapshot {
    let status_path = proc_path.join("status");
    match fs::read_to_string(&status_path) {
        Ok(content) => parse_status(&content),
        Err(e) => {
            debug!("Failed to read {}: {}", status_path.display(), e);
            MemorySnapshot::default()
        }
    }
}
