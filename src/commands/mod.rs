//! CLI command implementations for spark-meter.
//!
//! This module provides implementations for all CLI subcommands:
//! - `check`: System validation
//! - `config`: Configuration file generation
//! - `discover`: One-shot discovery report

pub mod check;
pub mod config;
pub mod discover;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use discover::command_discover;
