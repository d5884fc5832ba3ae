//! Process scanning utilities for discovering and reading process entries.
//!
//! This module enumerates the numeric entries of the process table and
//! reads the raw per-process facts discovery needs: the argument vector and
//! the cgroup membership record.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Command-line substrings that mark a process as part of the Spark workload.
pub const WORKLOAD_SIGNATURES: &[&str] = &[
    "org.apache.spark",
    "spark-submit",
    "CoarseGrainedExecutorBackend",
];

/// Process entry representing a directory in the process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcEntry {
    pub pid: u32,
    pub proc_path: PathBuf,
}

impl ProcEntry {
    pub fn new(root: &Path, pid: u32) -> Self {
        Self {
            pid,
            proc_path: root.join(pid.to_string()),
        }
    }
}

/// Scans `root` for process entries with numeric names, sorted by pid.
pub fn collect_proc_entries(root: &Path) -> Vec<ProcEntry> {
    let mut out = Vec::new();
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Failed to list {}: {}", root.display(), e);
            return out;
        }
    };

    for entry in entries.flatten() {
        let p = entry.path();
        let name = match p.file_name().and_then(|s| s.to_str()) {
            Some(v) => v,
            None => continue,
        };
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let pid: u32 = match name.parse() {
            Ok(v) if v > 0 => v,
            _ => continue,
        };
        out.push(ProcEntry { pid, proc_path: p });
    }

    out.sort_by_key(|e| e.pid);
    out
}

/// Reads the NUL-separated argument vector from `<proc_path>/cmdline`.
///
/// Returns an empty vector when the process is gone, unreadable, or a
/// kernel thread.
pub fn read_cmdline(proc_path: &Path) -> Vec<String> {
    let cmd = proc_path.join("cmdline");
    match fs::read(&cmd) {
        Ok(content) => split_cmdline(&content),
        Err(e) => {
            debug!("Failed to read {}: {}", cmd.display(), e);
            Vec::new()
        }
    }
}

/// Splits a raw cmdline buffer on NUL bytes, dropping the trailing terminator.
pub fn split_cmdline(content: &[u8]) -> Vec<String> {
    let content = content.strip_suffix(&[0u8]).unwrap_or(content);
    if content.is_empty() {
        return Vec::new();
    }
    content
        .split(|&b| b == 0u8)
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

/// Reads `<proc_path>/cgroup` as `id:controllers:path` records.
pub fn read_cgroup_lines(proc_path: &Path) -> Vec<String> {
    let path = proc_path.join("cgroup");
    match fs::read_to_string(&path) {
        Ok(content) => content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect(),
        Err(e) => {
            debug!("Failed to read {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// True if the joined command line contains any of the built-in workload
/// signatures or one of `extra`.
pub fn matches_workload_signature(joined: &str, extra: &[String]) -> bool {
    WORKLOAD_SIGNATURES.iter().any(|s| joined.contains(s))
        || extra.iter().any(|s| !s.is_empty() && joined.contains(s.as_str()))
}
