//! Process-related modules for reading and classifying processes.
//!
//! This module provides:
//! - `scanner`: Process table enumeration, cmdline and cgroup records
//! - `cpu`: CPU tick parsing and utilization
//! - `memory`: RSS/VmSize/thread counters from status
//! - `classifier`: Spark role and declared resources

pub mod classifier;
pub mod cpu;
pub mod memory;
pub mod scanner;

// Re-export commonly used types
pub use classifier::{classify, Classification, ResourceDeclaration, Role};
pub use cpu::{cpu_percent, read_cpu_ticks, CpuTicks, CLK_TCK, DEFAULT_CLK_TCK};
pub use memory::{read_memory_and_threads, MemorySnapshot};
pub use scanner::{
    collect_proc_entries, matches_workload_signature, read_cgroup_lines, read_cmdline, ProcEntry,
    WORKLOAD_SIGNATURES,
};
