//! Control-group membership resolution for cgroup v1 and v2.
//!
//! A process's `/proc/<pid>/cgroup` record has a different shape depending on
//! which hierarchy the host runs:
//!
//! - v1: one line per hierarchy, `4:cpu,cpuacct:/kubepods/pod...`, so the
//!   cpu and memory controllers each carry their own path.
//! - v2: a single unified line, `0::/kubepods/pod...`.
//!
//! The version is detected once per [`CgroupResolver`] from the presence of
//! `cgroup.controllers` at the cgroup mount root. Everything downstream only
//! uses [`CgroupMembership`] through [`membership_equal`] and
//! [`CgroupResolver::limits_for`].

pub mod limits;

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::process::read_cgroup_lines;

pub use limits::ResourceLimit;

/// Default mount point of the cgroup filesystem.
pub const DEFAULT_CGROUP_ROOT: &str = "/sys/fs/cgroup";

/// File that only exists at the root of a unified (v2) hierarchy.
const V2_MARKER_FILE: &str = "cgroup.controllers";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgroupVersion {
    V1,
    V2,
}

impl CgroupVersion {
    pub fn number(&self) -> u8 {
        match self {
            CgroupVersion::V1 => 1,
            CgroupVersion::V2 => 2,
        }
    }
}

impl fmt::Display for CgroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.number())
    }
}

/// Which cgroup(s) a process belongs to. Paths are relative to the
/// controller mount and start with `/`; an empty string means the
/// controller was not found in the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CgroupMembership {
    V1 { cpu_path: String, memory_path: String },
    V2 { unified_path: String },
}

impl CgroupMembership {
    pub fn version(&self) -> CgroupVersion {
        match self {
            CgroupMembership::V1 { .. } => CgroupVersion::V1,
            CgroupMembership::V2 { .. } => CgroupVersion::V2,
        }
    }

    /// True when no usable path was resolved.
    pub fn is_empty(&self) -> bool {
        match self {
            CgroupMembership::V1 {
                cpu_path,
                memory_path,
            } => cpu_path.is_empty() && memory_path.is_empty(),
            CgroupMembership::V2 { unified_path } => unified_path.is_empty(),
        }
    }
}

/// Splits a `hierarchy_id:controllers:path` record. The path may itself
/// contain colons.
fn split_record(line: &str) -> Option<(&str, &str, &str)> {
    let mut parts = line.splitn(3, ':');
    let id = parts.next()?;
    let controllers = parts.next()?;
    let path = parts.next()?;
    Some((id, controllers, path))
}

fn has_controller(controllers: &str, name: &str) -> bool {
    controllers.split(',').any(|c| c == name)
}

/// Parses cgroup membership records for the given hierarchy version.
///
/// For v1 the last line naming each controller wins, since records are not
/// ordered by controller. For v2 the path of the hierarchy-id `0` line is
/// used.
pub fn parse_membership<S: AsRef<str>>(lines: &[S], version: CgroupVersion) -> CgroupMembership {
    match version {
        CgroupVersion::V1 => {
            let mut cpu_path = String::new();
            let mut memory_path = String::new();
            for line in lines {
                let Some((_, controllers, path)) = split_record(line.as_ref()) else {
                    continue;
                };
                if has_controller(controllers, "cpu") {
                    cpu_path = path.to_string();
                }
                if has_controller(controllers, "memory") {
                    memory_path = path.to_string();
                }
            }
            CgroupMembership::V1 {
                cpu_path,
                memory_path,
            }
        }
        CgroupVersion::V2 => {
            let unified_path = lines
                .iter()
                .filter_map(|l| split_record(l.as_ref()))
                .find(|(id, _, _)| *id == "0")
                .map(|(_, _, path)| path.to_string())
                .unwrap_or_default();
            CgroupMembership::V2 { unified_path }
        }
    }
}

/// "Same container" test between a candidate and a reference membership.
///
/// v1 matches when either controller path that is set on the reference side
/// equals the candidate's; v2 compares unified paths exactly. Memberships of
/// different versions never match.
pub fn membership_equal(candidate: &CgroupMembership, reference: &CgroupMembership) -> bool {
    match (candidate, reference) {
        (
            CgroupMembership::V1 {
                cpu_path: c_cpu,
                memory_path: c_mem,
            },
            CgroupMembership::V1 {
                cpu_path: r_cpu,
                memory_path: r_mem,
            },
        ) => (!r_cpu.is_empty() && c_cpu == r_cpu) || (!r_mem.is_empty() && c_mem == r_mem),
        (
            CgroupMembership::V2 { unified_path: c },
            CgroupMembership::V2 { unified_path: r },
        ) => c == r,
        _ => false,
    }
}

/// Detects the hierarchy version mounted at `cgroup_root`.
pub fn detect_version(cgroup_root: &Path) -> CgroupVersion {
    if cgroup_root.join(V2_MARKER_FILE).exists() {
        CgroupVersion::V2
    } else {
        CgroupVersion::V1
    }
}

/// Resolves memberships and limits against one cgroup mount.
#[derive(Debug, Clone)]
pub struct CgroupResolver {
    root: PathBuf,
    version: CgroupVersion,
}

impl CgroupResolver {
    /// Detects the version under `root` once.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let version = detect_version(&root);
        debug!("Detected cgroup {} at {}", version, root.display());
        Self { root, version }
    }

    /// Resolver with an explicit version, skipping detection.
    pub fn with_version(root: impl Into<PathBuf>, version: CgroupVersion) -> Self {
        Self {
            root: root.into(),
            version,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn version(&self) -> CgroupVersion {
        self.version
    }

    /// Membership of the process at `proc_path` (`/proc/<pid>` or `/proc/self`).
    pub fn resolve(&self, proc_path: &Path) -> CgroupMembership {
        parse_membership(&read_cgroup_lines(proc_path), self.version)
    }

    /// Directory of a cgroup below `mount`. The leading `/` is stripped so a
    /// root path resolves to the mount itself.
    fn cgroup_dir(mount: &Path, path: &str) -> PathBuf {
        let rel = path.trim_start_matches('/');
        if rel.is_empty() {
            mount.to_path_buf()
        } else {
            mount.join(rel)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const V1_RECORD: &[&str] = &[
        "12:pids:/kubepods/podX/abc",
        "11:memory:/kubepods/podX/abc",
        "4:cpu,cpuacct:/kubepods/podX",
        "1:name=systemd:/kubepods/podX/abc",
    ];

    // -------------------------------------------------------------------------
    // Tests for parse_membership
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_v1_combined_controller_list() {
        let m = parse_membership(&["4:cpu,cpuacct:/kubepods/podX"], CgroupVersion::V1);
        assert_eq!(
            m,
            CgroupMembership::V1 {
                cpu_path: "/kubepods/podX".into(),
                memory_path: String::new(),
            }
        );
    }

    #[test]
    fn test_parse_v1_full_record() {
        let m = parse_membership(V1_RECORD, CgroupVersion::V1);
        assert_eq!(
            m,
            CgroupMembership::V1 {
                cpu_path: "/kubepods/podX".into(),
                memory_path: "/kubepods/podX/abc".into(),
            }
        );
    }

    #[test]
    fn test_parse_v1_cpuacct_alone_is_not_cpu() {
        let m = parse_membership(&["3:cpuacct:/a", "5:cpuset:/b"], CgroupVersion::V1);
        assert!(m.is_empty());
    }

    #[test]
    fn test_parse_v1_last_line_wins() {
        let m = parse_membership(&["4:cpu:/first", "9:cpu,cpuacct:/second"], CgroupVersion::V1);
        match m {
            CgroupMembership::V1 { cpu_path, .. } => assert_eq!(cpu_path, "/second"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_v2_unified_line() {
        let m = parse_membership(&["0::/kubepods/podX"], CgroupVersion::V2);
        assert_eq!(
            m,
            CgroupMembership::V2 {
                unified_path: "/kubepods/podX".into()
            }
        );
    }

    #[test]
    fn test_parse_v2_hybrid_record_picks_hierarchy_zero() {
        let m = parse_membership(
            &["4:cpu,cpuacct:/legacy", "0::/user.slice/session-3.scope"],
            CgroupVersion::V2,
        );
        assert_eq!(
            m,
            CgroupMembership::V2 {
                unified_path: "/user.slice/session-3.scope".into()
            }
        );
    }

    #[test]
    fn test_parse_garbled_lines_ignored() {
        let m = parse_membership(&["garbage", "", "7"], CgroupVersion::V1);
        assert!(m.is_empty());
        let m = parse_membership(&["garbage"], CgroupVersion::V2);
        assert!(m.is_empty());
    }

    #[test]
    fn test_parse_path_with_colon() {
        let m = parse_membership(&["0::/system.slice/a:b.scope"], CgroupVersion::V2);
        assert_eq!(
            m,
            CgroupMembership::V2 {
                unified_path: "/system.slice/a:b.scope".into()
            }
        );
    }

    // -------------------------------------------------------------------------
    // Tests for membership_equal
    // -------------------------------------------------------------------------

    #[test]
    fn test_membership_equal_v1_either_controller() {
        let reference = CgroupMembership::V1 {
            cpu_path: "/pod/a".into(),
            memory_path: "/pod/a".into(),
        };
        let cpu_only = CgroupMembership::V1 {
            cpu_path: "/pod/a".into(),
            memory_path: "/other".into(),
        };
        let neither = CgroupMembership::V1 {
            cpu_path: "/other".into(),
            memory_path: "/other".into(),
        };
        assert!(membership_equal(&cpu_only, &reference));
        assert!(!membership_equal(&neither, &reference));
    }

    #[test]
    fn test_membership_equal_v1_empty_reference_never_matches() {
        let reference = CgroupMembership::V1 {
            cpu_path: String::new(),
            memory_path: String::new(),
        };
        let candidate = CgroupMembership::V1 {
            cpu_path: String::new(),
            memory_path: String::new(),
        };
        assert!(!membership_equal(&candidate, &reference));
    }

    #[test]
    fn test_membership_equal_v2_exact() {
        let a = CgroupMembership::V2 {
            unified_path: "/kubepods/podX".into(),
        };
        let b = CgroupMembership::V2 {
            unified_path: "/kubepods/podX/child".into(),
        };
        assert!(membership_equal(&a, &a.clone()));
        assert!(!membership_equal(&b, &a));
    }

    #[test]
    fn test_membership_equal_version_mismatch() {
        let v1 = CgroupMembership::V1 {
            cpu_path: "/".into(),
            memory_path: "/".into(),
        };
        let v2 = CgroupMembership::V2 {
            unified_path: "/".into(),
        };
        assert!(!membership_equal(&v1, &v2));
        assert!(!membership_equal(&v2, &v1));
    }

    // -------------------------------------------------------------------------
    // Tests for version detection and resolve
    // -------------------------------------------------------------------------

    #[test]
    fn test_detect_version() {
        let dir = tempdir().expect("Failed to create temp dir");
        assert_eq!(detect_version(dir.path()), CgroupVersion::V1);

        std::fs::write(dir.path().join("cgroup.controllers"), "cpu memory pids\n").expect("write");
        assert_eq!(detect_version(dir.path()), CgroupVersion::V2);
    }

    #[test]
    fn test_resolver_resolve_reads_proc_record() {
        let cg = tempdir().expect("Failed to create temp dir");
        std::fs::write(cg.path().join("cgroup.controllers"), "cpu memory\n").expect("write");
        let proc_dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(proc_dir.path().join("cgroup"), "0::/kubepods/podX\n").expect("write");

        let resolver = CgroupResolver::new(cg.path());
        assert_eq!(resolver.version(), CgroupVersion::V2);
        assert_eq!(
            resolver.resolve(proc_dir.path()),
            CgroupMembership::V2 {
                unified_path: "/kubepods/podX".into()
            }
        );
    }

    #[test]
    fn test_cgroup_dir_root_path() {
        let mount = Path::new("/sys/fs/cgroup");
        assert_eq!(CgroupResolver::cgroup_dir(mount, "/"), mount.to_path_buf());
        assert_eq!(
            CgroupResolver::cgroup_dir(mount, "/kubepods/podX"),
            mount.join("kubepods/podX")
        );
    }
}
