//! spark-meter - version 0.1.0
//!
//! Auto-discovering CPU/memory meter for Spark JVMs running in a container.
//! This is the main entry point that sets up logging, handles subcommands
//! and drives the sampling loop.

mod cli;
mod commands;
mod config;
mod monitor;
mod startup_checks;

use clap::Parser;
use tokio::signal;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info};

use cli::{Args, Commands, LogLevel};
use commands::{command_check, command_config, command_discover};
use config::{resolve_config, show_config, validate_effective_config, Config};

/// Initializes tracing logging subsystem with configured log level.
/// Logs go to stderr so stdout carries only the report.
fn setup_logging(level: &LogLevel) {
    let log_level = match level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    debug!("Logging initialized with level: {:?}", level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Completes on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format.clone());
    }

    // Config generation doesn't need the effective config
    if let Some(Commands::Config {
        output,
        format,
        commented,
    }) = &args.command
    {
        return command_config(output.clone(), format.clone(), *commented);
    }

    let config = load_validated_config(&args)?;
    setup_logging(&config.log_level());

    match &args.command {
        Some(Commands::Discover { verbose }) => return command_discover(*verbose, &config),
        Some(Commands::Check) => return command_check(&config),
        Some(Commands::Config { .. }) | None => {}
    }

    info!("Starting spark-meter");

    if let Err(e) = startup_checks::validate_requirements(&config.proc_root(), &config.cgroup_root())
    {
        error!("Startup validation failed: {}", e);
        error!("   The meter will start but may not function correctly!");
    }

    // Configure parallel sampling
    let threads = config.parallelism();
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        error!("Failed to set rayon thread pool: {}", e);
    }
    debug!("Rayon thread pool configured with {} threads", threads);

    monitor::run(&config, shutdown_signal()).await;

    info!("spark-meter stopped");
    Ok(())
}
