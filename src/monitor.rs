//! The polling loop: discover, print what was found, then sample until the
//! tracked set empties and start over.

use spark_meter::report::{describe_process, format_sample};
use spark_meter::{CgroupResolver, Discoverer, DiscoveryOptions, Sampler};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;

/// Builds the discovery engine from the effective config. The meter's own
/// cgroup membership is resolved here, once.
pub fn build_discoverer(config: &Config) -> Discoverer {
    let resolver = CgroupResolver::new(config.cgroup_root());
    let proc_root = config.proc_root();
    let self_membership = resolver.resolve(&proc_root.join("self"));
    debug!("Own cgroup membership: {:?}", self_membership);

    Discoverer::new(
        DiscoveryOptions {
            proc_root,
            self_membership,
            self_pid: Some(std::process::id()),
            target_pid: config.target_pid,
            mode: config.discovery_mode(),
            extra_signatures: config.extra_signatures(),
        },
        resolver,
    )
}

/// Discovers processes and starts tracking the ones that can be read,
/// printing the once-per-process header for each.
fn start_session(discoverer: &Discoverer, ticks_per_second: f64) -> Option<Sampler> {
    let found = match discoverer.discover() {
        Ok(found) => found,
        Err(e) => {
            warn!("{}", e);
            return None;
        }
    };

    let mut sampler = Sampler::new(ticks_per_second);
    for process in found {
        let limit = discoverer.resolver().limits_for(&process.proc_path);
        for line in describe_process(process.pid, &process.classification, &limit) {
            println!("{}", line);
        }
        println!();

        let pid = process.pid;
        if let Err(e) = sampler.track(process, limit, Instant::now()) {
            warn!("Could not take initial sample of PID={}: {}", pid, e);
        }
    }

    if sampler.is_empty() {
        warn!("No readable Spark processes to monitor");
        return None;
    }
    Some(sampler)
}

/// Samples every tracked process once and prints a line for each. Returns
/// false once nothing is left to track, which ends the session.
fn tick(sampler: &mut Sampler, now: Instant) -> bool {
    let report = sampler.refresh(now);
    for sample in &report.samples {
        println!("{}", format_sample(sample));
    }
    !sampler.is_empty()
}

/// Sleeps for `duration`; returns false if `shutdown` fired first.
async fn pause<F: Future<Output = ()>>(duration: Duration, shutdown: &mut Pin<&mut F>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = shutdown.as_mut() => false,
    }
}

/// Runs until `shutdown` completes. Cancellation is only observed between
/// ticks.
pub async fn run<F: Future<Output = ()>>(config: &Config, shutdown: F) {
    let discoverer = build_discoverer(config);
    let interval = config.sample_interval();
    let backoff = config.rediscover_backoff();
    let tps = config.ticks_per_second();
    tokio::pin!(shutdown);

    info!(
        "Auto-detecting Spark JVMs under {} (interval {:?}, {} ticks/s)",
        discoverer.proc_root().display(),
        interval,
        tps
    );

    loop {
        let mut sampler = match start_session(&discoverer, tps) {
            Some(s) => s,
            None => {
                info!("Retrying discovery in {:?}", backoff);
                if !pause(backoff, &mut shutdown).await {
                    return;
                }
                continue;
            }
        };

        println!("Live Usage:");
        loop {
            if !pause(interval, &mut shutdown).await {
                return;
            }

            if !tick(&mut sampler, Instant::now()) {
                info!("All tracked processes gone; re-detecting");
                break;
            }
        }
    }
}
