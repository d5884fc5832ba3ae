//! Startup requirement validation for spark-meter.
//!
//! This module validates that the meter can read the process table and the
//! cgroup filesystem before the monitor loop starts.

use nix::unistd::geteuid;
use spark_meter::cgroup::{detect_version, CgroupVersion};
use spark_meter::process::collect_proc_entries;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

/// Validate all runtime requirements
pub fn validate_requirements(proc_root: &Path, cgroup_root: &Path) -> Result<(), ValidationError> {
    info!("Validating runtime requirements...");

    check_user_privileges();
    check_proc_access(proc_root)?;
    check_cgroup_access(cgroup_root);

    info!("All runtime requirements validated");
    Ok(())
}

/// Check if running with sufficient privileges
fn check_user_privileges() {
    if !geteuid().is_root() {
        warn!("Not running as root - processes of other users may be unreadable");
    } else {
        info!("Running as root (uid=0)");
    }
}

/// Check that the process table can be listed and pid 1 inspected
fn check_proc_access(proc_root: &Path) -> Result<(), ValidationError> {
    if !proc_root.exists() {
        error!("{} not found - is procfs mounted?", proc_root.display());
        return Err(ValidationError::ProcNotMounted(
            proc_root.display().to_string(),
        ));
    }

    let entries = collect_proc_entries(proc_root);
    if entries.is_empty() {
        error!("No process entries readable under {}", proc_root.display());
        return Err(ValidationError::ProcNotMounted(
            proc_root.display().to_string(),
        ));
    }
    info!("Process table readable: {} entries", entries.len());

    let test_file = proc_root.join("1").join("cmdline");
    match fs::metadata(&test_file) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            error!("Cannot read {} - insufficient permissions", test_file.display());
            error!("   Solutions:");
            error!("   1. Run as root");
            error!("   2. Grant capabilities:");
            error!("      setcap cap_dac_read_search,cap_sys_ptrace+ep /path/to/spark-meter");
            Err(ValidationError::InsufficientPermissions(e.to_string()))
        }
        Err(e) => {
            warn!("Could not test {}: {}", test_file.display(), e);
            Ok(())
        }
    }
}

/// Report which cgroup layout is mounted. Missing cgroups only disable limits.
fn check_cgroup_access(cgroup_root: &Path) {
    if !cgroup_root.exists() {
        warn!(
            "{} not found - cgroup limits will be reported as unlimited",
            cgroup_root.display()
        );
        return;
    }
    match detect_version(cgroup_root) {
        CgroupVersion::V2 => info!("cgroup v2 (unified) at {}", cgroup_root.display()),
        CgroupVersion::V1 => info!("cgroup v1 (per-controller) at {}", cgroup_root.display()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Insufficient permissions: {0}")]
    InsufficientPermissions(String),

    #[error("Process table not available at {0}")]
    ProcNotMounted(String),
}
