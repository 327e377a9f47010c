//! Host resource sampling for `/health`.
//!
//! A background task refreshes CPU, memory and disk figures every few
//! seconds and publishes the latest snapshot on a `watch` channel, so the
//! health endpoint never blocks on `sysinfo`.

use std::time::Duration;

use serde::Serialize;
use sysinfo::{Disks, System};
use tokio::sync::watch;

pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = MIB * 1024.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CpuUsage {
    pub percent: f64,
    pub cores: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MemoryUsage {
    pub total_mb: f64,
    pub available_mb: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DiskUsage {
    pub total_gb: f64,
    pub free_gb: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResourceSnapshot {
    pub cpu: CpuUsage,
    pub memory: MemoryUsage,
    pub disk: DiskUsage,
}

fn percent(used: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    round1(used / total * 100.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

struct Sampler {
    system: System,
    disks: Disks,
}

impl Sampler {
    fn new() -> Self {
        Self {
            system: System::new(),
            disks: Disks::new_with_refreshed_list(),
        }
    }

    fn sample(&mut self) -> ResourceSnapshot {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        self.disks.refresh(true);

        let cores = match self.system.cpus().len() {
            0 => std::thread::available_parallelism().map_or(1, |n| n.get()),
            n => n,
        };

        let total_memory = self.system.total_memory() as f64;
        let available_memory = self.system.available_memory() as f64;

        // the root filesystem, or the largest disk when there is no `/`
        let disk = self
            .disks
            .list()
            .iter()
            .find(|d| d.mount_point() == std::path::Path::new("/"))
            .or_else(|| self.disks.list().iter().max_by_key(|d| d.total_space()));
        let (disk_total, disk_free) = disk.map_or((0.0, 0.0), |d| {
            (d.total_space() as f64, d.available_space() as f64)
        });

        ResourceSnapshot {
            cpu: CpuUsage {
                percent: round1(f64::from(self.system.global_cpu_usage())),
                cores,
            },
            memory: MemoryUsage {
                total_mb: round1(total_memory / MIB),
                available_mb: round1(available_memory / MIB),
                percent: percent(total_memory - available_memory, total_memory),
            },
            disk: DiskUsage {
                total_gb: round1(disk_total / GIB),
                free_gb: round1(disk_free / GIB),
                percent: percent(disk_total - disk_free, disk_total),
            },
        }
    }
}

/// Spawn the sampler task. It stops when `shutdown_rx` flips to `true`.
pub fn spawn_sampler(
    mut shutdown_rx: watch::Receiver<bool>,
) -> (watch::Receiver<ResourceSnapshot>, tokio::task::JoinHandle<()>) {
    let (tx, rx) = watch::channel(ResourceSnapshot::default());
    let join = tokio::spawn(async move {
        let mut sampler = Sampler::new();
        let mut ticker = tokio::time::interval(SAMPLE_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        tracing::debug!("Resource sampler shutting down");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    let snapshot = sampler.sample();
                    tx.send_replace(snapshot);
                }
            }
        }
    });
    (rx, join)
}
