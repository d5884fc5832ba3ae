//! CPU and memory ceilings from cgroup limit files.
//!
//! Missing files, `max`/`-1` markers and unparsable values all mean
//! "unlimited", encoded as `0`. An unconstrained host or a controller that
//! was not delegated to the container is the common case, not an error.

use std::fs;
use std::path::Path;
use tracing::debug;

use super::{CgroupMembership, CgroupResolver, CgroupVersion};

/// Largest value the v1 memory controller reports when no limit is set
/// (`PAGE_COUNTER_MAX` rounded to a 4 KiB page).
pub const V1_MEMORY_UNLIMITED: u64 = 0x7FFF_FFFF_FFFF_F000;

/// Container-level ceiling for one process. `0` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceLimit {
    pub version: CgroupVersion,
    pub cpu_quota_cores: f64,
    pub memory_limit_bytes: u64,
}

impl ResourceLimit {
    pub fn unlimited(version: CgroupVersion) -> Self {
        Self {
            version,
            cpu_quota_cores: 0.0,
            memory_limit_bytes: 0,
        }
    }

    pub fn cpu_unlimited(&self) -> bool {
        self.cpu_quota_cores <= 0.0
    }

    pub fn memory_unlimited(&self) -> bool {
        self.memory_limit_bytes == 0
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(s) => {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        }
        Err(e) => {
            debug!("Failed to read {}: {}", path.display(), e);
            None
        }
    }
}

/// Cores allowed by a quota/period pair, or 0 when either side is not a
/// positive number.
pub fn cores_from_quota(quota: &str, period: &str) -> f64 {
    let quota: f64 = match quota.trim().parse() {
        Ok(v) => v,
        Err(_) => return 0.0,
    };
    let period: f64 = match period.trim().parse() {
        Ok(v) => v,
        Err(_) => return 0.0,
    };
    if quota > 0.0 && period > 0.0 {
        quota / period
    } else {
        0.0
    }
}

/// Parses a v2 `cpu.max` value (`"<quota> <period>"` or `"max <period>"`).
pub fn parse_cpu_max(content: &str) -> f64 {
    let mut fields = content.split_whitespace();
    match (fields.next(), fields.next()) {
        (Some("max"), _) | (None, _) | (_, None) => 0.0,
        (Some(quota), Some(period)) => cores_from_quota(quota, period),
    }
}

/// Parses a v2 `memory.max` value.
pub fn parse_memory_max(content: &str) -> u64 {
    let t = content.trim();
    if t == "max" {
        return 0;
    }
    t.parse().unwrap_or(0)
}

/// Parses a v1 `memory.limit_in_bytes` value.
pub fn parse_memory_limit_in_bytes(content: &str) -> u64 {
    match content.trim().parse::<u64>() {
        Ok(v) if v >= V1_MEMORY_UNLIMITED => 0,
        Ok(v) => v,
        Err(_) => 0,
    }
}

impl CgroupResolver {
    /// Limits that apply to the process at `proc_path`.
    pub fn limits_for(&self, proc_path: &Path) -> ResourceLimit {
        let membership = self.resolve(proc_path);
        self.limits_for_membership(&membership)
    }

    /// Reads the limit files for an already resolved membership.
    pub fn limits_for_membership(&self, membership: &CgroupMembership) -> ResourceLimit {
        let mut lim = ResourceLimit::unlimited(self.version);

        match membership {
            CgroupMembership::V1 {
                cpu_path,
                memory_path,
            } => {
                if !cpu_path.is_empty() {
                    let dir = Self::cgroup_dir(&self.root.join("cpu"), cpu_path);
                    let quota = read_trimmed(&dir.join("cpu.cfs_quota_us"));
                    let period = read_trimmed(&dir.join("cpu.cfs_period_us"));
                    if let (Some(q), Some(p)) = (quota, period) {
                        lim.cpu_quota_cores = cores_from_quota(&q, &p);
                    }
                }
                if !memory_path.is_empty() {
                    let dir = Self::cgroup_dir(&self.root.join("memory"), memory_path);
                    if let Some(v) = read_trimmed(&dir.join("memory.limit_in_bytes")) {
                        lim.memory_limit_bytes = parse_memory_limit_in_bytes(&v);
                    }
                }
            }
            CgroupMembership::V2 { unified_path } => {
                if !unified_path.is_empty() {
                    let dir = Self::cgroup_dir(&self.root, unified_path);
                    if let Some(v) = read_trimmed(&dir.join("cpu.max")) {
                        lim.cpu_quota_cores = parse_cpu_max(&v);
                    }
                    if let Some(v) = read_trimmed(&dir.join("memory.max")) {
                        lim.memory_limit_bytes = parse_memory_max(&v);
                    }
                }
            }
        }

        lim
    }
}
