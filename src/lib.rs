//! Spark Meter Library
//!
//! This library finds the Spark JVMs (master, worker, executor, or a plain
//! spark-submit driver) running next to it and samples their CPU, memory and
//! thread usage together with the cgroup limits that apply to them. No pid
//! has to be supplied: processes are discovered from the process table,
//! scoped to the meter's own cgroup when possible.
//!
//! # Features
//!
//! - **Discovery**: same-cgroup scan, host-wide scan, pid 1 fallback, or a pinned pid
//! - **Classification**: Spark role plus the memory/cores settings declared on the command line
//! - **cgroup v1 and v2**: membership and CPU/memory limit resolution for both layouts
//! - **Sampling**: CPU percent from tick deltas, RSS, VmSize and thread count per tick
//!
//! # Usage
//!
//! ```rust,no_run
//! use spark_meter::{CgroupResolver, Discoverer, DiscoveryMode, DiscoveryOptions, Sampler};
//! use std::path::Path;
//! use std::time::Instant;
//!
//! let resolver = CgroupResolver::new("/sys/fs/cgroup");
//! let self_membership = resolver.resolve(Path::new("/proc/self"));
//! let discoverer = Discoverer::new(
//!     DiscoveryOptions {
//!         proc_root: "/proc".into(),
//!         self_membership,
//!         self_pid: Some(std::process::id()),
//!         target_pid: None,
//!         mode: DiscoveryMode::All,
//!         extra_signatures: Vec::new(),
//!     },
//!     resolver.clone(),
//! );
//!
//! let mut sampler = Sampler::new(*spark_meter::process::CLK_TCK);
//! for p in discoverer.discover().unwrap_or_default() {
//!     let limit = resolver.limits_for(&p.proc_path);
//!     let _ = sampler.track(p, limit, Instant::now());
//! }
//!
//! std::thread::sleep(std::time::Duration::from_secs(1));
//! for sample in sampler.refresh(Instant::now()).samples {
//!     println!("{}", spark_meter::report::format_sample(&sample));
//! }
//! ```

pub mod cgroup;
pub mod discovery;
pub mod error;
pub mod process;
pub mod report;
pub mod sampler;

// Re-export main types for convenience
pub use cgroup::{CgroupMembership, CgroupResolver, CgroupVersion, ResourceLimit};
pub use discovery::{DiscoveredProcess, Discoverer, DiscoveryMode, DiscoveryOptions};
pub use error::{DiscoveryError, ProcError, SampleFailure};
pub use process::{Classification, CpuTicks, ResourceDeclaration, Role};
pub use sampler::{ProcessSample, Sampler, TickReport, TrackedProcess};
