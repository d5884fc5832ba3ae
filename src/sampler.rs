//! Per-process sampling state and the per-tick refresh.
//!
//! Each tracked process keeps the tick counters and timestamp of its last
//! successful read. A refresh reads fresh counters, turns the delta into a
//! CPU percentage and replaces the stored sample. The first failed read
//! drops the process for good; it only comes back through a new discovery
//! pass.
//!
//! Refreshes run through rayon. Every `TrackedProcess` is visited by exactly
//! one task per tick, so the read-compute-store sequence on a record never
//! races; the pool size comes from the `parallelism` setting.

use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, warn};

use crate::cgroup::ResourceLimit;
use crate::discovery::DiscoveredProcess;
use crate::error::{ProcError, SampleFailure};
use crate::process::{
    cpu_percent, read_cpu_ticks, read_memory_and_threads, Classification, CpuTicks, Role,
};

/// Monitoring state of one process.
#[derive(Debug, Clone)]
pub struct TrackedProcess {
    pid: u32,
    proc_path: PathBuf,
    classification: Classification,
    limit: ResourceLimit,
    last_ticks: CpuTicks,
    last_sampled: Instant,
}

impl TrackedProcess {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn role(&self) -> Role {
        self.classification.role
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn limit(&self) -> &ResourceLimit {
        &self.limit
    }

    pub fn last_ticks(&self) -> CpuTicks {
        self.last_ticks
    }

    pub fn last_sampled(&self) -> Instant {
        self.last_sampled
    }

    fn refresh(&mut self, now: Instant, ticks_per_second: f64) -> Result<ProcessSample, SampleFailure> {
        let ticks = read_cpu_ticks(&self.proc_path).map_err(|source| SampleFailure {
            pid: self.pid,
            role: self.role(),
            source,
        })?;

        let elapsed = now.saturating_duration_since(self.last_sampled).as_secs_f64();
        let cpu = cpu_percent(&self.last_ticks, &ticks, elapsed, ticks_per_second);
        let mem = read_memory_and_threads(&self.proc_path);

        self.last_ticks = ticks;
        self.last_sampled = now;

        Ok(ProcessSample {
            pid: self.pid,
            role: self.role(),
            cpu_percent: cpu,
            rss_bytes: mem.rss_bytes,
            vsize_bytes: mem.vsize_bytes,
            threads: mem.threads,
        })
    }
}

/// Metrics of one process for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSample {
    pub pid: u32,
    pub role: Role,
    pub cpu_percent: f64,
    pub rss_bytes: u64,
    pub vsize_bytes: u64,
    pub threads: u64,
}

/// Outcome of one [`Sampler::refresh`].
#[derive(Debug, Default)]
pub struct TickReport {
    pub samples: Vec<ProcessSample>,
    pub dropped: Vec<SampleFailure>,
}

/// The set of monitored processes.
pub struct Sampler {
    ticks_per_second: f64,
    tracked: Vec<TrackedProcess>,
}

impl Sampler {
    pub fn new(ticks_per_second: f64) -> Self {
        Self {
            ticks_per_second,
            tracked: Vec::new(),
        }
    }

    pub fn ticks_per_second(&self) -> f64 {
        self.ticks_per_second
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn tracked(&self) -> &[TrackedProcess] {
        &self.tracked
    }

    pub fn get(&self, pid: u32) -> Option<&TrackedProcess> {
        self.tracked.iter().find(|t| t.pid == pid)
    }

    /// Starts tracking a discovered process, taking its baseline sample at
    /// `now`. Fails if the process cannot be read; a pid that is already
    /// tracked is left untouched.
    pub fn track(
        &mut self,
        process: DiscoveredProcess,
        limit: ResourceLimit,
        now: Instant,
    ) -> Result<&TrackedProcess, ProcError> {
        if let Some(idx) = self.tracked.iter().position(|t| t.pid == process.pid) {
            debug!("PID={} already tracked", process.pid);
            return Ok(&self.tracked[idx]);
        }

        let ticks = read_cpu_ticks(&process.proc_path)?;
        self.tracked.push(TrackedProcess {
            pid: process.pid,
            proc_path: process.proc_path,
            classification: process.classification,
            limit,
            last_ticks: ticks,
            last_sampled: now,
        });
        Ok(&self.tracked[self.tracked.len() - 1])
    }

    /// Samples every tracked process at `now` and drops the ones that could
    /// not be read.
    pub fn refresh(&mut self, now: Instant) -> TickReport {
        let tps = self.ticks_per_second;
        let outcomes: Vec<Result<ProcessSample, SampleFailure>> = self
            .tracked
            .par_iter_mut()
            .map(|t| t.refresh(now, tps))
            .collect();

        let mut report = TickReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(sample) => report.samples.push(sample),
                Err(failure) => {
                    warn!("{} (will drop)", failure);
                    report.dropped.push(failure);
                }
            }
        }

        if !report.dropped.is_empty() {
            let dropped: Vec<u32> = report.dropped.iter().map(|f| f.pid).collect();
            self.tracked.retain(|t| !dropped.contains(&t.pid));
        }
        report
    }
}
