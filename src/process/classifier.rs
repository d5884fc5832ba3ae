//! Process classification for Spark JVMs.
//!
//! This module assigns a role to a process from its command line and scrapes
//! the resource settings the user declared on it (heap size, spark.* conf
//! keys) so they can be reported next to the measured usage.

use std::fmt;
use std::path::Path;

/// Main class of the standalone master daemon.
pub const MASTER_MARKER: &str = "org.apache.spark.deploy.master.Master";
/// Main class of the standalone worker daemon.
pub const WORKER_MARKER: &str = "org.apache.spark.deploy.worker.Worker";
/// Main class of an executor JVM.
pub const EXECUTOR_MARKER: &str = "org.apache.spark.executor.CoarseGrainedExecutorBackend";

/// Placeholder printed for anything that could not be determined.
pub const UNKNOWN: &str = "unknown";

/// Extensions of application entry points passed to spark-submit.
const APP_EXTENSIONS: &[&str] = &[".py", ".jar", ".scala"];

const XMX_PREFIX: &str = "-Xmx";
const EXECUTOR_MEMORY_KEY: &str = "spark.executor.memory=";
const DRIVER_MEMORY_KEY: &str = "spark.driver.memory=";
const EXECUTOR_CORES_KEY: &str = "spark.executor.cores=";
const DRIVER_CORES_KEY: &str = "spark.driver.cores=";
const MEMORY_OVERHEAD_KEY: &str = "spark.executor.memoryOverhead=";

/// Role of a process within the Spark deployment.
///
/// Variants are declared in ascending monitoring priority, so the derived
/// ordering gives `Master > Worker > Executor > Generic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Generic,
    Executor,
    Worker,
    Master,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Master => "master",
            Role::Worker => "worker",
            Role::Executor => "executor",
            Role::Generic => "generic",
        }
    }

    /// Role implied by the joined command line; markers are checked in
    /// priority order and the first hit wins.
    pub fn from_cmdline(joined: &str) -> Role {
        if joined.contains(MASTER_MARKER) {
            Role::Master
        } else if joined.contains(WORKER_MARKER) {
            Role::Worker
        } else if joined.contains(EXECUTOR_MARKER) {
            Role::Executor
        } else {
            Role::Generic
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sizing the user asked for on the command line. `None` means the setting
/// was not found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceDeclaration {
    pub driver_memory: Option<String>,
    pub executor_memory: Option<String>,
    pub driver_cores: Option<String>,
    pub executor_cores: Option<String>,
    pub memory_overhead: Option<String>,
}

impl ResourceDeclaration {
    /// Scans every argument once. The first occurrence of each marker wins;
    /// an explicit `spark.executor.memory` takes precedence over `-Xmx`.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Self {
        let mut decl = ResourceDeclaration::default();
        let mut xmx: Option<String> = None;

        for arg in args {
            let a = arg.as_ref();
            if xmx.is_none() {
                if let Some(v) = a.strip_prefix(XMX_PREFIX) {
                    xmx = non_empty(v);
                }
            }
            fill_first(&mut decl.executor_memory, a, EXECUTOR_MEMORY_KEY);
            fill_first(&mut decl.driver_memory, a, DRIVER_MEMORY_KEY);
            fill_first(&mut decl.executor_cores, a, EXECUTOR_CORES_KEY);
            fill_first(&mut decl.driver_cores, a, DRIVER_CORES_KEY);
            fill_first(&mut decl.memory_overhead, a, MEMORY_OVERHEAD_KEY);
        }

        if decl.executor_memory.is_none() {
            decl.executor_memory = xmx;
        }
        decl
    }

    pub fn is_empty(&self) -> bool {
        *self == ResourceDeclaration::default()
    }
}

fn non_empty(v: &str) -> Option<String> {
    let v = v.trim();
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

/// Stores the value following `key` in `slot` unless it is already set.
fn fill_first(slot: &mut Option<String>, arg: &str, key: &str) {
    if slot.is_some() {
        return;
    }
    if let Some(idx) = arg.find(key) {
        *slot = non_empty(&arg[idx + key.len()..]);
    }
}

/// Result of classifying one command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub role: Role,
    pub app_name: String,
    pub declaration: ResourceDeclaration,
}

/// Application name: `--name <value>` if present, otherwise the file name
/// of the first `.py`/`.jar`/`.scala` argument.
pub fn app_name<S: AsRef<str>>(args: &[S]) -> Option<String> {
    let explicit = args
        .windows(2)
        .find(|w| w[0].as_ref() == "--name")
        .and_then(|w| non_empty(w[1].as_ref()));
    if explicit.is_some() {
        return explicit;
    }

    args.iter()
        .map(|a| a.as_ref())
        .find(|a| APP_EXTENSIONS.iter().any(|ext| a.ends_with(ext)))
        .and_then(|a| Path::new(a).file_name())
        .and_then(|n| n.to_str())
        .map(String::from)
}

/// Classifies a process from its argument vector.
pub fn classify<S: AsRef<str>>(args: &[S]) -> Classification {
    let joined = args.iter().map(|a| a.as_ref()).collect::<Vec<_>>().join(" ");

    Classification {
        role: Role::from_cmdline(&joined),
        app_name: app_name(args).unwrap_or_else(|| UNKNOWN.to_string()),
        declaration: ResourceDeclaration::from_args(args),
    }
}
