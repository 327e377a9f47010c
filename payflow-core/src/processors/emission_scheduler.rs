//! EmissionScheduler processor.
//!
//! Drives a [`BatchIssuer`] over a bounded window: one firing right away,
//! then one per grid point `start + k * interval` up to and including
//! `start + duration`. Firings run one after another in a single task, so a
//! slow batch delays the next one and grid points that pass in the meantime
//! are skipped rather than queued.
//!
//! Every firing appends a `processing` entry to the scheduler history and
//! settles it to `success` or `error` once the batch returns.

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{error, info, warn};

use crate::config::ScheduleConfig;
use crate::processors::batch_emitter::BatchIssuer;
use crate::telemetry::{SchedulerHistory, SchedulerRun};
use crate::utils::schedule::{advance_past, firings_in_window};

/// Observable lifecycle of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running { end_at: OffsetDateTime },
    Stopped,
}

pub struct EmissionScheduler {
    issuer: Arc<dyn BatchIssuer>,
    history: SchedulerHistory,
    config: ScheduleConfig,
    state_tx: watch::Sender<SchedulerState>,
}

/// Control handle returned by [`EmissionScheduler::start`].
///
/// Dropping the handle stops the scheduler the same way [`shutdown`] does.
///
/// [`shutdown`]: SchedulerHandle::shutdown
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<SchedulerState>,
    join: JoinHandle<()>,
}

impl EmissionScheduler {
    pub fn new(
        issuer: Arc<dyn BatchIssuer>,
        history: SchedulerHistory,
        config: ScheduleConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(SchedulerState::Idle);
        Self {
            issuer,
            history,
            config,
            state_tx,
        }
    }

    pub fn state(&self) -> watch::Receiver<SchedulerState> {
        self.state_tx.subscribe()
    }

    /// Spawn the scheduler task. The first firing happens immediately.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state_rx = self.state_tx.subscribe();
        let join = tokio::spawn(self.run(shutdown_rx));
        SchedulerHandle {
            shutdown_tx,
            state_rx,
            join,
        }
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let ScheduleConfig { interval, duration } = self.config;
        let start = Instant::now();
        let end = start.checked_add(duration);
        if end.is_none() {
            warn!(
                duration_secs = duration.as_secs(),
                "Emission window exceeds the clock range, running until shutdown"
            );
        }
        let now = OffsetDateTime::now_utc();
        let end_at = time::Duration::try_from(duration)
            .ok()
            .and_then(|d| now.checked_add(d))
            .unwrap_or(now);

        self.state_tx
            .send_replace(SchedulerState::Running { end_at });
        info!(
            interval_secs = interval.as_secs(),
            duration_secs = duration.as_secs(),
            planned_firings = firings_in_window(interval, duration),
            %end_at,
            "EmissionScheduler started"
        );

        self.fire().await;

        let mut next_slot = start.checked_add(interval).filter(|_| !interval.is_zero());
        while let Some(slot) = next_slot {
            let (due, skipped) = advance_past(slot, Instant::now(), interval);
            if skipped > 0 {
                warn!(skipped, "Emission slots passed while a batch was running, skipping them");
            }
            if end.is_some_and(|end| due > end) {
                info!("Emission window closed");
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("EmissionScheduler received shutdown signal");
                        break;
                    }
                }

                _ = sleep_until(due) => {
                    self.fire().await;
                    next_slot = due.checked_add(interval);
                }
            }
        }

        self.state_tx.send_replace(SchedulerState::Stopped);
        info!("EmissionScheduler stopped");
    }

    async fn fire(&self) {
        let entry = self
            .history
            .push(SchedulerRun::processing(OffsetDateTime::now_utc()))
            .await;

        match self.issuer.issue_batch().await {
            Ok(invoices) => {
                let ids: Vec<String> = invoices.into_iter().map(|i| i.id).collect();
                info!(count = ids.len(), "Scheduled batch issued");
                self.history.update(entry, |run| run.succeed(ids)).await;
            }
            Err(e) => {
                error!(error = %e, "Scheduled batch failed");
                let reason = e.to_string();
                self.history.update(entry, |run| run.fail(reason)).await;
            }
        }
    }
}

impl SchedulerHandle {
    /// Cancel pending firings. A firing already in progress completes.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn state(&self) -> SchedulerState {
        *self.state_rx.borrow()
    }

    /// Wait for the scheduler task to finish.
    pub async fn join(self) -> Result<(), tokio::task::JoinError> {
        let SchedulerHandle {
            shutdown_tx, join, ..
        } = self;
        let result = join.await;
        drop(shutdown_tx);
        result
    }
}
