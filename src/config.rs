//! Configuration management for spark-meter.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat, LogLevel, ModeArg};
use anyhow::Context;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use spark_meter::cgroup::DEFAULT_CGROUP_ROOT;
use spark_meter::process::CLK_TCK;
use spark_meter::DiscoveryMode;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// Default configuration constants
pub const DEFAULT_PROC_ROOT: &str = "/proc";
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_REDISCOVER_BACKOFF_SECS: u64 = 5;
pub const DEFAULT_PARALLELISM: usize = 1;

/// Meter configuration. Every field is optional in files; `Default`
/// carries the effective defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Filesystem roots
    #[serde(alias = "proc-root")]
    pub proc_root: Option<PathBuf>,
    #[serde(alias = "cgroup-root")]
    pub cgroup_root: Option<PathBuf>,

    // Sampling
    /// Kernel clock ticks per second used to convert CPU ticks
    #[serde(alias = "ticks-per-second", alias = "hz")]
    pub ticks_per_second: Option<f64>,
    #[serde(alias = "sample-interval-ms")]
    pub sample_interval_ms: Option<u64>,
    #[serde(alias = "rediscover-backoff-secs")]
    pub rediscover_backoff_secs: Option<u64>,
    /// Threads used to sample tracked processes each tick
    pub parallelism: Option<usize>,

    // Discovery
    /// Monitor this pid directly, skipping discovery
    #[serde(alias = "target-pid")]
    pub target_pid: Option<u32>,
    /// "all" | "best"
    #[serde(alias = "discovery-mode")]
    pub discovery_mode: Option<String>,
    /// Extra command-line substrings that mark a Spark process
    #[serde(alias = "extra-signatures")]
    pub extra_signatures: Option<Vec<String>>,

    // Logging
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            cgroup_root: Some(PathBuf::from(DEFAULT_CGROUP_ROOT)),
            ticks_per_second: Some(*CLK_TCK),
            sample_interval_ms: Some(DEFAULT_SAMPLE_INTERVAL_MS),
            rediscover_backoff_secs: Some(DEFAULT_REDISCOVER_BACKOFF_SECS),
            parallelism: Some(DEFAULT_PARALLELISM),
            target_pid: None,
            discovery_mode: Some(DiscoveryMode::All.to_string()),
            extra_signatures: None,
            log_level: Some("info".into()),
        }
    }
}

impl Config {
    pub fn proc_root(&self) -> PathBuf {
        self.proc_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT))
    }

    pub fn cgroup_root(&self) -> PathBuf {
        self.cgroup_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CGROUP_ROOT))
    }

    pub fn ticks_per_second(&self) -> f64 {
        self.ticks_per_second.unwrap_or(*CLK_TCK)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.unwrap_or(DEFAULT_SAMPLE_INTERVAL_MS))
    }

    pub fn rediscover_backoff(&self) -> Duration {
        Duration::from_secs(
            self.rediscover_backoff_secs
                .unwrap_or(DEFAULT_REDISCOVER_BACKOFF_SECS),
        )
    }

    /// Rayon threads for per-tick sampling.
    pub fn parallelism(&self) -> usize {
        self.parallelism.unwrap_or(DEFAULT_PARALLELISM)
    }

    /// Effective discovery mode; call after validation.
    pub fn discovery_mode(&self) -> DiscoveryMode {
        self.discovery_mode
            .as_deref()
            .and_then(|m| m.parse().ok())
            .unwrap_or_default()
    }

    pub fn extra_signatures(&self) -> Vec<String> {
        self.extra_signatures.clone().unwrap_or_default()
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
            .as_deref()
            .and_then(|l| LogLevel::from_str(l, true).ok())
            .unwrap_or(LogLevel::Info)
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(hz) = cfg.ticks_per_second {
        if !(hz.is_finite() && hz > 0.0) {
            return Err(format!("ticks_per_second must be a positive number, got {}", hz).into());
        }
    }

    if cfg.sample_interval_ms == Some(0) {
        return Err("sample_interval_ms must be greater than 0".into());
    }

    if cfg.parallelism == Some(0) {
        return Err("parallelism must be at least 1".into());
    }

    if let Some(mode) = cfg.discovery_mode.as_deref() {
        mode.parse::<DiscoveryMode>()?;
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if LogLevel::from_str(level, true).is_err() {
            return Err(format!("unknown log_level: {}", level).into());
        }
    }

    if cfg.target_pid == Some(0) {
        return Err("target_pid must be a positive process id".into());
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(root) = &args.proc_root {
        config.proc_root = Some(root.clone());
    }
    if let Some(root) = &args.cgroup_root {
        config.cgroup_root = Some(root.clone());
    }

    // Sampling settings
    if let Some(hz) = args.hz {
        config.ticks_per_second = Some(hz);
    }
    if let Some(ms) = args.interval_ms {
        config.sample_interval_ms = Some(ms);
    }
    if let Some(secs) = args.backoff_secs {
        config.rediscover_backoff_secs = Some(secs);
    }
    if let Some(threads) = args.parallelism {
        config.parallelism = Some(threads);
    }

    if let Some(level) = &args.log_level {
        if let Some(v) = level.to_possible_value() {
            config.log_level = Some(v.get_name().to_string());
        }
    }

    // Discovery settings
    if let Some(pid) = args.target_pid {
        config.target_pid = Some(pid);
    }
    if let Some(mode) = args.mode {
        let mode = match mode {
            ModeArg::All => DiscoveryMode::All,
            ModeArg::Best => DiscoveryMode::Best,
        };
        config.discovery_mode = Some(mode.to_string());
    }
    if let Some(sigs) = &args.signatures {
        config.extra_signatures = Some(
            sigs.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        );
    }

    Ok(config)
}

/// Configuration loading with multiple format support
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let defaults = [
                "/etc/spark-meter/spark-meter.yaml",
                "/etc/spark-meter/spark-meter.yml",
                "/etc/spark-meter/spark-meter.json",
                "/etc/spark-meter/spark-meter.toml",
                "./spark-meter.yaml",
                "./spark-meter.yml",
                "./spark-meter.json",
                "./spark-meter.toml",
            ];

            match defaults.iter().find(|p| Path::new(p).exists()) {
                Some(p) => PathBuf::from(p),
                None => return Ok(Config::default()),
            }
        }
    };

    if !path.exists() {
        anyhow::bail!("Config file not found: {}", path.display());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = parse_config(&content, path.extension().and_then(|s| s.to_str()))
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Parses config text by file extension, defaulting to YAML.
pub fn parse_config(content: &str, extension: Option<&str>) -> anyhow::Result<Config> {
    let config = match extension {
        Some("json") => serde_json::from_str(content)?,
        Some("toml") => toml::from_str(content)?,
        _ => serde_yaml::from_str(content)?,
    };
    Ok(config)
}

/// Renders a config in the requested format.
pub fn render_config(
    config: &Config,
    format: &ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, &format)?);
    Ok(())
}
