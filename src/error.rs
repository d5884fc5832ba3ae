//! Error types shared by the process readers, discovery and the sampler.
//!
//! Most failures in this crate are expected: processes exit between two
//! reads, cgroup controllers are not delegated, files are truncated. The
//! readers absorb what they can and only the conditions a caller has to act
//! on are surfaced here.

use std::io;
use std::path::{Path, PathBuf};

use crate::process::Role;

/// Failure reading a per-process record from the process-information tree.
#[derive(Debug, thiserror::Error)]
pub enum ProcError {
    #[error("{} not found (process gone?)", path.display())]
    NotFound { path: PathBuf },

    #[error("malformed {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ProcError {
    /// Classifies an I/O error from reading `path`.
    ///
    /// `ESRCH` shows up instead of `ENOENT` when the process exits while its
    /// directory is still open, so both count as "not found".
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        let gone = err.kind() == io::ErrorKind::NotFound || err.raw_os_error() == Some(libc::ESRCH);
        if gone {
            ProcError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ProcError::Io {
                path: path.to_path_buf(),
                source: err,
            }
        }
    }

    pub fn parse(path: &Path, reason: impl Into<String>) -> Self {
        ProcError::Parse {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProcError::NotFound { .. })
    }
}

/// Discovery ran every pass without finding a workload process.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("no Spark process found after {passes} discovery passes")]
    Exhausted { passes: usize },
}

/// A tracked process could no longer be sampled and was dropped.
#[derive(Debug, thiserror::Error)]
#[error("[{role}] PID={pid} could not be sampled: {source}")]
pub struct SampleFailure {
    pub pid: u32,
    pub role: Role,
    #[source]
    pub source: ProcError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_not_found() {
        let err = io::Error::from(io::ErrorKind::NotFound);
        let e = ProcError::from_io(Path::new("/proc/42/stat"), err);
        assert!(e.is_not_found());
    }

    #[test]
    fn test_from_io_esrch_is_not_found() {
        let err = io::Error::from_raw_os_error(libc::ESRCH);
        let e = ProcError::from_io(Path::new("/proc/42/stat"), err);
        assert!(e.is_not_found());
    }

    #[test]
    fn test_from_io_permission_denied() {
        let err = io::Error::from(io::ErrorKind::PermissionDenied);
        let e = ProcError::from_io(Path::new("/proc/1/stat"), err);
        assert!(matches!(e, ProcError::Io { .. }));
        assert!(e.to_string().contains("/proc/1/stat"));
    }
}
