//! Spark process discovery.
//!
//! Finds the Spark JVMs to monitor without being told a pid. Passes, in
//! order, stopping at the first that yields anything:
//!
//! 1. every process in the same cgroup as the meter itself (the usual
//!    "meter runs inside the Spark container" case);
//! 2. every process in the table, regardless of cgroup (sidecar sharing
//!    the pid namespace, or a meter on the host);
//! 3. pid 1, if it looks like a JVM or Spark.
//!
//! A pinned pid (from `METER_TARGET_PID` or the config) skips all of them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::cgroup::{membership_equal, CgroupMembership, CgroupResolver};
use crate::error::DiscoveryError;
use crate::process::{
    classify, collect_proc_entries, matches_workload_signature, read_cmdline, Classification,
    ProcEntry,
};

/// Substrings that make pid 1 acceptable as a last resort.
const PID1_MARKERS: &[&str] = &["java", "org.apache.spark"];

/// Number of passes reported in [`DiscoveryError::Exhausted`].
const DISCOVERY_PASSES: usize = 3;

/// How many candidates a discovery pass keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// Every matching process (master, workers and executors side by side).
    #[default]
    All,
    /// Only the highest-priority match; ties go to the lowest pid.
    Best,
}

impl FromStr for DiscoveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(DiscoveryMode::All),
            "best" => Ok(DiscoveryMode::Best),
            other => Err(format!(
                "Invalid discovery_mode '{}', expected 'all' or 'best'",
                other
            )),
        }
    }
}

impl fmt::Display for DiscoveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryMode::All => f.write_str("all"),
            DiscoveryMode::Best => f.write_str("best"),
        }
    }
}

/// A process accepted by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredProcess {
    pub pid: u32,
    pub proc_path: PathBuf,
    pub classification: Classification,
}

/// Inputs to a [`Discoverer`]. The meter's own membership is resolved once
/// by the caller and passed in.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub proc_root: PathBuf,
    pub self_membership: CgroupMembership,
    pub self_pid: Option<u32>,
    pub target_pid: Option<u32>,
    pub mode: DiscoveryMode,
    pub extra_signatures: Vec<String>,
}

pub struct Discoverer {
    opts: DiscoveryOptions,
    resolver: CgroupResolver,
}

impl Discoverer {
    pub fn new(opts: DiscoveryOptions, resolver: CgroupResolver) -> Self {
        Self { opts, resolver }
    }

    pub fn resolver(&self) -> &CgroupResolver {
        &self.resolver
    }

    pub fn proc_root(&self) -> &Path {
        &self.opts.proc_root
    }

    /// Runs the discovery passes and returns the accepted processes, sorted
    /// by descending role priority and then pid.
    pub fn discover(&self) -> Result<Vec<DiscoveredProcess>, DiscoveryError> {
        if let Some(pid) = self.opts.target_pid {
            info!("Using pinned target PID={}", pid);
            return Ok(vec![self.pinned(pid)]);
        }

        if self.opts.self_membership.is_empty() {
            debug!("Own cgroup membership unknown, skipping same-cgroup pass");
        } else {
            let found = self.scan(true);
            if !found.is_empty() {
                info!("Same-cgroup pass found {} process(es)", found.len());
                return Ok(found);
            }
            debug!("Same-cgroup pass found nothing");
        }

        let found = self.scan(false);
        if !found.is_empty() {
            info!("Host-wide pass found {} process(es)", found.len());
            return Ok(found);
        }
        debug!("Host-wide pass found nothing");

        if let Some(p) = self.pid1_fallback() {
            info!("Falling back to PID 1");
            return Ok(vec![p]);
        }

        Err(DiscoveryError::Exhausted {
            passes: DISCOVERY_PASSES,
        })
    }

    fn pinned(&self, pid: u32) -> DiscoveredProcess {
        let entry = ProcEntry::new(&self.opts.proc_root, pid);
        let args = read_cmdline(&entry.proc_path);
        DiscoveredProcess {
            pid,
            classification: classify(&args),
            proc_path: entry.proc_path,
        }
    }

    /// One pass over the process table, optionally restricted to the
    /// meter's own cgroup.
    fn scan(&self, require_same_cgroup: bool) -> Vec<DiscoveredProcess> {
        let mut found = Vec::new();

        for entry in collect_proc_entries(&self.opts.proc_root) {
            if Some(entry.pid) == self.opts.self_pid {
                continue;
            }
            if require_same_cgroup {
                let membership = self.resolver.resolve(&entry.proc_path);
                if !membership_equal(&membership, &self.opts.self_membership) {
                    continue;
                }
            }

            let args = read_cmdline(&entry.proc_path);
            if args.is_empty() {
                continue;
            }
            if !matches_workload_signature(&args.join(" "), &self.opts.extra_signatures) {
                continue;
            }

            found.push(DiscoveredProcess {
                pid: entry.pid,
                classification: classify(&args),
                proc_path: entry.proc_path,
            });
        }

        // stable: equal roles keep ascending pid order
        found.sort_by(|a, b| b.classification.role.cmp(&a.classification.role));

        if self.opts.mode == DiscoveryMode::Best {
            found.truncate(1);
        }
        found
    }

    fn pid1_fallback(&self) -> Option<DiscoveredProcess> {
        let entry = ProcEntry::new(&self.opts.proc_root, 1);
        let args = read_cmdline(&entry.proc_path);
        if args.is_empty() {
            return None;
        }
        let joined = args.join(" ");
        if !PID1_MARKERS.iter().any(|m| joined.contains(m)) {
            return None;
        }
        Some(DiscoveredProcess {
            pid: 1,
            classification: classify(&args),
            proc_path: entry.proc_path,
        })
    }
}
