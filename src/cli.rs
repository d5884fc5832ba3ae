//! CLI arguments and subcommands for spark-meter.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, environment overrides, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Discovery policy options for CLI parsing
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    All,
    Best,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "spark-meter",
    about = "Auto-discovering CPU/memory meter for Spark JVMs in a container",
    long_about = "Auto-discovering CPU/memory meter for Spark JVMs in a container.\n\n\
                  Finds Spark master, worker and executor processes without a pid, scoped to \
                  the meter's own cgroup when possible, and prints per-process CPU, RSS, VmSize \
                  and thread counts next to the declared Spark settings and cgroup limits.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level (default: log_level from the config file, else info)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Monitor this pid directly, skipping discovery
    #[arg(long, env = "METER_TARGET_PID")]
    pub target_pid: Option<u32>,

    /// Kernel clock ticks per second (default: detected, else 100)
    #[arg(long, env = "METER_HZ")]
    pub hz: Option<f64>,

    /// Sampling interval in milliseconds
    #[arg(short = 'i', long)]
    pub interval_ms: Option<u64>,

    /// Delay before retrying discovery after nothing was found (seconds)
    #[arg(long)]
    pub backoff_secs: Option<u64>,

    /// Keep every matching process (all) or only the highest-priority one (best)
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Additional command-line signatures that mark a Spark process (comma-separated)
    #[arg(long)]
    pub signatures: Option<String>,

    /// Threads used to sample tracked processes each tick
    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Root of the process-information filesystem
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Mount point of the cgroup filesystem
    #[arg(long)]
    pub cgroup_root: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run discovery once, print what was found and exit
    Discover {
        /// Also print the full command line of each process
        #[arg(long)]
        verbose: bool,
    },

    /// Validate /proc and cgroup access and the effective configuration
    Check,

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let args = Args::parse_from(["spark-meter"]);
        assert!(args.command.is_none());
        assert!(args.interval_ms.is_none());
        assert!(!args.no_config);
    }

    #[test]
    fn test_parse_discover_subcommand() {
        let args = Args::parse_from(["spark-meter", "--mode", "best", "discover", "--verbose"]);
        assert!(matches!(args.mode, Some(ModeArg::Best)));
        assert!(matches!(args.command, Some(Commands::Discover { verbose: true })));
    }

    #[test]
    fn test_parse_overrides() {
        let args = Args::parse_from([
            "spark-meter",
            "--target-pid",
            "4242",
            "--hz",
            "250",
            "-i",
            "500",
        ]);
        assert_eq!(args.target_pid, Some(4242));
        assert_eq!(args.hz, Some(250.0));
        assert_eq!(args.interval_ms, Some(500));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
