//! Check command implementation.
//!
//! Validates process table and cgroup access and the configuration.

use spark_meter::cgroup::CgroupResolver;
use spark_meter::process::{collect_proc_entries, read_cpu_ticks};

use crate::config::{validate_effective_config, Config};

/// Validates system requirements and configuration.
pub fn command_check(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Spark Meter - System Check");
    println!("==========================");

    let mut all_ok = true;
    let proc_root = config.proc_root();
    let cgroup_root = config.cgroup_root();

    println!("\nChecking {} ...", proc_root.display());
    let entries = collect_proc_entries(&proc_root);
    if entries.is_empty() {
        println!("   [FAIL] Cannot read any process entries");
        all_ok = false;
    } else {
        println!("   [ OK ] {} process entries readable", entries.len());
    }

    let self_path = proc_root.join("self");
    match read_cpu_ticks(&self_path) {
        Ok(ticks) => println!(
            "   [ OK ] stat parsing works (own utime={} stime={})",
            ticks.user, ticks.system
        ),
        Err(e) => {
            println!("   [FAIL] stat parsing failed: {}", e);
            all_ok = false;
        }
    }

    println!("\nChecking {} ...", cgroup_root.display());
    let resolver = CgroupResolver::new(&cgroup_root);
    println!("   [ OK ] cgroup {} detected", resolver.version());

    let membership = resolver.resolve(&self_path);
    if membership.is_empty() {
        println!("   [WARN] Own cgroup membership unknown; same-cgroup discovery disabled");
    } else {
        println!("   [ OK ] Own membership: {:?}", membership);
    }
    let limit = resolver.limits_for_membership(&membership);
    println!(
        "   [ OK ] Own limits: {} / {}",
        spark_meter::report::format_cpu_limit(&limit),
        spark_meter::report::format_memory_limit(&limit)
    );

    println!("\nChecking configuration...");
    match validate_effective_config(config) {
        Ok(_) => println!("   [ OK ] Configuration is valid"),
        Err(e) => {
            println!("   [FAIL] Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\nSummary:");
    if all_ok {
        println!("   All checks passed - ready to monitor");
        Ok(())
    } else {
        println!("   Some checks failed - please review the output above");
        std::process::exit(1);
    }
}
