//! Fake process table and cgroup mount for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const MASTER_ARGS: &[&str] = &[
    "java",
    "-Xmx1g",
    "-cp",
    "/opt/spark/jars/*",
    "org.apache.spark.deploy.master.Master",
];

pub const WORKER_ARGS: &[&str] = &[
    "java",
    "-Xmx2g",
    "-cp",
    "/opt/spark/jars/*",
    "org.apache.spark.deploy.worker.Worker",
    "spark://master:7077",
];

pub const EXECUTOR_ARGS: &[&str] = &[
    "java",
    "-Xmx4g",
    "org.apache.spark.executor.CoarseGrainedExecutorBackend",
    "--executor-id",
    "1",
];

pub const SUBMIT_ARGS: &[&str] = &[
    "/usr/bin/python3",
    "/opt/spark/bin/spark-submit",
    "--name",
    "MyJob",
    "--conf",
    "spark.driver.memory=2g",
    "app.py",
];

pub const UNRELATED_ARGS: &[&str] = &["/usr/sbin/sshd", "-D"];

/// A temporary host with `proc/` and `cgroup/` directories.
pub struct FakeHost {
    dir: TempDir,
}

impl FakeHost {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::create_dir(dir.path().join("proc")).expect("mkdir proc");
        fs::create_dir(dir.path().join("cgroup")).expect("mkdir cgroup");
        Self { dir }
    }

    pub fn proc_root(&self) -> PathBuf {
        self.dir.path().join("proc")
    }

    pub fn cgroup_root(&self) -> PathBuf {
        self.dir.path().join("cgroup")
    }

    pub fn proc_path(&self, pid: u32) -> PathBuf {
        self.proc_root().join(pid.to_string())
    }

    /// Marks the cgroup mount as a unified (v2) hierarchy.
    pub fn mark_v2(&self) {
        fs::write(self.cgroup_root().join("cgroup.controllers"), "cpu memory pids\n")
            .expect("write cgroup.controllers");
    }

    /// Adds a process with the given argv and v2 cgroup path.
    pub fn add_process(&self, pid: u32, args: &[&str], unified_path: &str) -> PathBuf {
        self.add_process_with_cgroup(pid, args, &format!("0::{}\n", unified_path))
    }

    pub fn add_process_with_cgroup(&self, pid: u32, args: &[&str], cgroup: &str) -> PathBuf {
        let p = self.proc_path(pid);
        fs::create_dir_all(&p).expect("mkdir pid");

        let mut cmdline = Vec::new();
        for a in args {
            cmdline.extend_from_slice(a.as_bytes());
            cmdline.push(0);
        }
        fs::write(p.join("cmdline"), cmdline).expect("write cmdline");
        fs::write(p.join("cgroup"), cgroup).expect("write cgroup");
        self.set_ticks(pid, 0, 0);
        self.set_status(pid, 1024, 4096, 10);
        p
    }

    pub fn set_ticks(&self, pid: u32, utime: u64, stime: u64) {
        let stat = format!(
            "{pid} (java) S 1 {pid} {pid} 0 -1 4194304 100 0 0 0 {utime} {stime} 0 0 20 0 42 0 12345 12345678 1234\n"
        );
        fs::write(self.proc_path(pid).join("stat"), stat).expect("write stat");
    }

    pub fn set_status(&self, pid: u32, rss_kb: u64, vsize_kb: u64, threads: u64) {
        let status = format!(
            "Name:\tjava\nVmSize:\t{vsize_kb} kB\nVmRSS:\t{rss_kb} kB\nThreads:\t{threads}\n"
        );
        fs::write(self.proc_path(pid).join("status"), status).expect("write status");
    }

    pub fn kill(&self, pid: u32) {
        fs::remove_dir_all(self.proc_path(pid)).expect("remove pid dir");
    }

    /// Writes `name` with `content` into the cgroup directory `rel` below the mount.
    pub fn write_cgroup_file(&self, rel: &str, name: &str, content: &str) {
        let dir = self.cgroup_root().join(rel.trim_start_matches('/'));
        fs::create_dir_all(&dir).expect("mkdir cgroup dir");
        fs::write(dir.join(name), content).expect("write cgroup file");
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
