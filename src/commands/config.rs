//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from("spark-meter.yaml"));

    let mut content = render_config(&config, &format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Spark Meter Configuration
# =========================
#
# Filesystem Roots
# ----------------
# proc_root: "/proc"               # Process-information filesystem
# cgroup_root: "/sys/fs/cgroup"    # cgroup mount (v2 detected via cgroup.controllers)
#
# Sampling
# --------
# ticks_per_second: 100            # Kernel CLK_TCK (env METER_HZ overrides)
# sample_interval_ms: 1000         # Delay between two samples
# rediscover_backoff_secs: 5       # Retry delay when no Spark process is found
# parallelism: 1                   # Threads used to sample tracked processes
#
# Discovery
# ---------
# target_pid: null                 # Pin one pid (env METER_TARGET_PID overrides)
# discovery_mode: "all"            # "all" = every match, "best" = highest-priority role only
# extra_signatures: null           # Extra cmdline substrings marking a Spark process
#
# Logging
# -------
# log_level: "info"                # off, error, warn, info, debug, trace
"#;

    format!("{comments}\n{yaml}")
}
