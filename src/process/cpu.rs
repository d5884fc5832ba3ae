//! CPU tick parsing for process metrics.
//!
//! This module reads the raw user/system tick counters from
//! `/proc/<pid>/stat` and turns two samples of the same process into a
//! utilization percentage.

use once_cell::sync::Lazy;
use std::fs;
use std::path::Path;

use crate::error::ProcError;

/// Ticks-per-second used when the kernel value cannot be queried.
pub const DEFAULT_CLK_TCK: f64 = 100.0;

/// Get system clock ticks per second (usually 100, but can vary).
fn get_clk_tck() -> f64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_CLK_TCK
        // Returns -1 on error, 0 if undefined - both are handled by the > 0 check
        unsafe {
            let tck = libc::sysconf(libc::_SC_CLK_TCK);
            if tck > 0 {
                return tck as f64;
            }
        }
    }
    DEFAULT_CLK_TCK
}

/// System clock ticks per second, detected once.
pub static CLK_TCK: Lazy<f64> = Lazy::new(get_clk_tck);

/// Raw CPU time counters of one process, in clock ticks.
///
/// Only the difference between two samples of the same pid means anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTicks {
    pub user: u64,
    pub system: u64,
}

impl CpuTicks {
    pub fn total(&self) -> u64 {
        self.user.saturating_add(self.system)
    }

    /// Ticks consumed since `earlier`. Saturates at zero so a recycled pid
    /// cannot produce a negative delta, and at `u64::MAX` on garbled counters.
    pub fn delta_since(&self, earlier: &CpuTicks) -> u64 {
        self.user
            .saturating_sub(earlier.user)
            .saturating_add(self.system.saturating_sub(earlier.system))
    }
}

/// Parses utime/stime (fields 14 and 15) out of a stat record.
///
/// Fields are counted after the closing parenthesis of the comm field, which
/// may itself contain spaces.
pub fn parse_stat_ticks(content: &str) -> Option<CpuTicks> {
    // After "pid (comm)" the next field is state (field 3).
    let rest = match content.rfind(')') {
        Some(idx) => &content[idx + 1..],
        None => {
            let mut it = content.splitn(3, char::is_whitespace);
            it.next();
            it.next();
            it.next().unwrap_or("")
        }
    };

    let fields: Vec<&str> = rest.split_whitespace().collect();
    if fields.len() < 13 {
        return None;
    }

    Some(CpuTicks {
        user: fields[11].parse().unwrap_or(0),
        system: fields[12].parse().unwrap_or(0),
    })
}

/// Reads the current tick counters from `<proc_path>/stat`.
pub fn read_cpu_ticks(proc_path: &Path) -> Result<CpuTicks, ProcError> {
    let stat_path = proc_path.join("stat");
    let content = fs::read_to_string(&stat_path).map_err(|e| ProcError::from_io(&stat_path, e))?;

    parse_stat_ticks(&content)
        .ok_or_else(|| ProcError::parse(&stat_path, "fewer than 15 fields"))
}

/// CPU utilization between two samples, in percent of one core.
///
/// Returns 0 when `elapsed_seconds` is not positive (same clock tick, or a
/// clock that went backwards).
pub fn cpu_percent(
    prev: &CpuTicks,
    now: &CpuTicks,
    elapsed_seconds: f64,
    ticks_per_second: f64,
) -> f64 {
    if elapsed_seconds <= 0.0 || ticks_per_second <= 0.0 || !elapsed_seconds.is_finite() {
        return 0.0;
    }
    let delta = now.delta_since(prev) as f64;
    delta / ticks_per_second / elapsed_seconds * 100.0
}
