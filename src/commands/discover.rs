//! Discover command implementation.
//!
//! Runs discovery once and prints every process it would monitor.

use spark_meter::process::read_cmdline;
use spark_meter::report::describe_process;

use crate::config::Config;
use crate::monitor::build_discoverer;

/// One-shot discovery. Exits with code 1 when nothing was found.
pub fn command_discover(verbose: bool, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let discoverer = build_discoverer(config);

    let found = match discoverer.discover() {
        Ok(found) => found,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    println!("Found {} Spark process(es):\n", found.len());
    for process in &found {
        let limit = discoverer.resolver().limits_for(&process.proc_path);
        for line in describe_process(process.pid, &process.classification, &limit) {
            println!("{}", line);
        }
        if verbose {
            println!("Command line: {}", read_cmdline(&process.proc_path).join(" "));
        }
        println!();
    }

    Ok(())
}
