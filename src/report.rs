//! Human-readable output lines for discovered processes and tick samples.

use crate::cgroup::ResourceLimit;
use crate::process::classifier::UNKNOWN;
use crate::process::Classification;
use crate::sampler::ProcessSample;

/// Formats bytes into human-readable format.
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1024 * 1024 * 1024 {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    } else if bytes >= 1024 * 1024 {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

pub fn format_cpu_limit(limit: &ResourceLimit) -> String {
    if limit.cpu_unlimited() {
        "unlimited".to_string()
    } else {
        format!("{:.2} cores", limit.cpu_quota_cores)
    }
}

pub fn format_memory_limit(limit: &ResourceLimit) -> String {
    if limit.memory_unlimited() {
        "unlimited".to_string()
    } else {
        format_bytes(limit.memory_limit_bytes)
    }
}

fn or_unknown(v: &Option<String>) -> &str {
    v.as_deref().unwrap_or(UNKNOWN)
}

/// Block printed once when a process starts being monitored.
pub fn describe_process(pid: u32, c: &Classification, limit: &ResourceLimit) -> Vec<String> {
    let d = &c.declaration;
    vec![
        format!("Monitoring PID={} (role={}, app={})", pid, c.role, c.app_name),
        "User Specs (from cmdline if present):".to_string(),
        format!("  Driver Memory:   {}", or_unknown(&d.driver_memory)),
        format!("  Executor Memory: {}", or_unknown(&d.executor_memory)),
        format!("  Driver Cores:    {}", or_unknown(&d.driver_cores)),
        format!("  Executor Cores:  {}", or_unknown(&d.executor_cores)),
        format!("  Memory Overhead: {}", or_unknown(&d.memory_overhead)),
        format!(
            "cgroup {} | CPU limit: {} | Mem limit: {}",
            limit.version,
            format_cpu_limit(limit),
            format_memory_limit(limit)
        ),
    ]
}

/// One line per process per tick.
pub fn format_sample(s: &ProcessSample) -> String {
    format!(
        "[{}] PID={} | CPU: {:.2}% | RSS: {} | VmSize: {} | Threads: {}",
        s.role,
        s.pid,
        s.cpu_percent,
        format_bytes(s.rss_bytes),
        format_bytes(s.vsize_bytes),
        s.threads
    )
}
