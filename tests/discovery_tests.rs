//! Discovery pass tests against a fake process table.
//!
//! Each test builds a small host under a temp dir and checks which
//! processes the discovery passes accept.

mod common;

use common::*;
use spark_meter::{
    CgroupMembership, CgroupResolver, CgroupVersion, Discoverer, DiscoveryError, DiscoveryMode,
    DiscoveryOptions, Role,
};

const POD: &str = "/kubepods/podX";
const OTHER_POD: &str = "/kubepods/podY";

fn discoverer(host: &FakeHost, self_path: &str, mode: DiscoveryMode) -> Discoverer {
    Discoverer::new(
        DiscoveryOptions {
            proc_root: host.proc_root(),
            self_membership: CgroupMembership::V2 {
                unified_path: self_path.to_string(),
            },
            self_pid: None,
            target_pid: None,
            mode,
            extra_signatures: Vec::new(),
        },
        CgroupResolver::with_version(host.cgroup_root(), CgroupVersion::V2),
    )
}

fn pids(d: &Discoverer) -> Vec<u32> {
    d.discover()
        .expect("discovery should succeed")
        .iter()
        .map(|p| p.pid)
        .collect()
}

#[test]
fn test_same_cgroup_keeps_only_matching_process() {
    let host = FakeHost::new();
    host.add_process(10, WORKER_ARGS, POD);
    host.add_process(11, UNRELATED_ARGS, POD);
    host.add_process(12, &["/bin/bash"], POD);

    assert_eq!(pids(&discoverer(&host, POD, DiscoveryMode::All)), vec![10]);
}

#[test]
fn test_same_cgroup_keeps_every_match() {
    let host = FakeHost::new();
    host.add_process(10, WORKER_ARGS, POD);
    host.add_process(11, EXECUTOR_ARGS, POD);
    host.add_process(12, UNRELATED_ARGS, POD);

    assert_eq!(pids(&discoverer(&host, POD, DiscoveryMode::All)), vec![10, 11]);
}

#[test]
fn test_same_cgroup_pass_ignores_other_containers() {
    let host = FakeHost::new();
    host.add_process(10, MASTER_ARGS, OTHER_POD);
    host.add_process(20, EXECUTOR_ARGS, POD);

    // Same-cgroup pass finds the executor, so the master next door is never seen
    assert_eq!(pids(&discoverer(&host, POD, DiscoveryMode::All)), vec![20]);
}

#[test]
fn test_host_wide_pass_when_own_cgroup_has_no_match() {
    let host = FakeHost::new();
    host.add_process(10, WORKER_ARGS, OTHER_POD);
    host.add_process(11, UNRELATED_ARGS, POD);

    assert_eq!(pids(&discoverer(&host, POD, DiscoveryMode::All)), vec![10]);
}

#[test]
fn test_empty_self_membership_skips_same_cgroup_pass() {
    let host = FakeHost::new();
    host.add_process(10, WORKER_ARGS, "");
    host.add_process(11, EXECUTOR_ARGS, OTHER_POD);

    // An empty membership would otherwise match every process with an empty path
    assert_eq!(pids(&discoverer(&host, "", DiscoveryMode::All)), vec![10, 11]);
}

#[test]
fn test_results_sorted_by_role_then_pid() {
    let host = FakeHost::new();
    host.add_process(5, EXECUTOR_ARGS, POD);
    host.add_process(6, SUBMIT_ARGS, POD);
    host.add_process(7, MASTER_ARGS, POD);
    host.add_process(8, EXECUTOR_ARGS, POD);
    host.add_process(9, WORKER_ARGS, POD);

    let found = discoverer(&host, POD, DiscoveryMode::All)
        .discover()
        .expect("discovery should succeed");
    let got: Vec<(u32, Role)> = found
        .iter()
        .map(|p| (p.pid, p.classification.role))
        .collect();
    assert_eq!(
        got,
        vec![
            (7, Role::Master),
            (9, Role::Worker),
            (5, Role::Executor),
            (8, Role::Executor),
            (6, Role::Generic),
        ]
    );
}

#[test]
fn test_best_mode_keeps_highest_priority_only() {
    let host = FakeHost::new();
    host.add_process(5, EXECUTOR_ARGS, POD);
    host.add_process(9, WORKER_ARGS, POD);

    let found = discoverer(&host, POD, DiscoveryMode::Best)
        .discover()
        .expect("discovery should succeed");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].pid, 9);
    assert_eq!(found[0].classification.role, Role::Worker);
}

#[test]
fn test_own_pid_is_never_discovered() {
    let host = FakeHost::new();
    host.add_process(10, WORKER_ARGS, POD);
    host.add_process(11, SUBMIT_ARGS, POD);

    let mut opts = DiscoveryOptions {
        proc_root: host.proc_root(),
        self_membership: CgroupMembership::V2 {
            unified_path: POD.to_string(),
        },
        self_pid: Some(11),
        target_pid: None,
        mode: DiscoveryMode::All,
        extra_signatures: Vec::new(),
    };
    let d = Discoverer::new(
        opts.clone(),
        CgroupResolver::with_version(host.cgroup_root(), CgroupVersion::V2),
    );
    assert_eq!(pids(&d), vec![10]);

    opts.self_pid = None;
    let d = Discoverer::new(
        opts,
        CgroupResolver::with_version(host.cgroup_root(), CgroupVersion::V2),
    );
    assert_eq!(pids(&d), vec![10, 11]);
}

#[test]
fn test_extra_signatures_widen_the_match() {
    let host = FakeHost::new();
    host.add_process(10, &["java", "com.example.Pipeline"], POD);

    let d = Discoverer::new(
        DiscoveryOptions {
            proc_root: host.proc_root(),
            self_membership: CgroupMembership::V2 {
                unified_path: POD.to_string(),
            },
            self_pid: None,
            target_pid: None,
            mode: DiscoveryMode::All,
            extra_signatures: vec!["com.example.Pipeline".to_string()],
        },
        CgroupResolver::with_version(host.cgroup_root(), CgroupVersion::V2),
    );
    assert_eq!(pids(&d), vec![10]);
}

#[test]
fn test_pid1_fallback() {
    let host = FakeHost::new();
    host.add_process(1, &["java", "-jar", "/app/service.jar"], "/");
    host.add_process(30, UNRELATED_ARGS, POD);

    let found = discoverer(&host, POD, DiscoveryMode::All)
        .discover()
        .expect("pid 1 fallback should succeed");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].pid, 1);
    assert_eq!(found[0].classification.role, Role::Generic);
}

#[test]
fn test_exhausted_when_nothing_matches() {
    let host = FakeHost::new();
    host.add_process(1, &["/sbin/init"], "/");
    host.add_process(30, UNRELATED_ARGS, POD);

    let err = discoverer(&host, POD, DiscoveryMode::All)
        .discover()
        .expect_err("no process should match");
    assert!(matches!(err, DiscoveryError::Exhausted { passes: 3 }));
}

#[test]
fn test_target_pid_skips_discovery() {
    let host = FakeHost::new();
    host.add_process(10, WORKER_ARGS, POD);
    host.add_process(42, UNRELATED_ARGS, OTHER_POD);

    let d = Discoverer::new(
        DiscoveryOptions {
            proc_root: host.proc_root(),
            self_membership: CgroupMembership::V2 {
                unified_path: POD.to_string(),
            },
            self_pid: None,
            target_pid: Some(42),
            mode: DiscoveryMode::All,
            extra_signatures: Vec::new(),
        },
        CgroupResolver::with_version(host.cgroup_root(), CgroupVersion::V2),
    );
    let found = d.discover().expect("pinned pid always succeeds");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].pid, 42);
    assert_eq!(found[0].proc_path, host.proc_path(42));
}

#[test]
fn test_v1_same_cgroup_by_memory_controller() {
    let host = FakeHost::new();
    host.add_process_with_cgroup(
        10,
        EXECUTOR_ARGS,
        "11:memory:/docker/abc\n4:cpu,cpuacct:/docker/abc\n",
    );
    host.add_process_with_cgroup(
        11,
        WORKER_ARGS,
        "11:memory:/docker/def\n4:cpu,cpuacct:/docker/def\n",
    );

    let d = Discoverer::new(
        DiscoveryOptions {
            proc_root: host.proc_root(),
            self_membership: CgroupMembership::V1 {
                cpu_path: String::new(),
                memory_path: "/docker/abc".to_string(),
            },
            self_pid: None,
            target_pid: None,
            mode: DiscoveryMode::All,
            extra_signatures: Vec::new(),
        },
        CgroupResolver::with_version(host.cgroup_root(), CgroupVersion::V1),
    );
    assert_eq!(pids(&d), vec![10]);
}

#[test]
fn test_classification_carries_declared_resources() {
    let host = FakeHost::new();
    host.add_process(10, SUBMIT_ARGS, POD);

    let found = discoverer(&host, POD, DiscoveryMode::All)
        .discover()
        .expect("discovery should succeed");
    let c = &found[0].classification;
    assert_eq!(c.app_name, "MyJob");
    assert_eq!(c.declaration.driver_memory.as_deref(), Some("2g"));
}
