//! Application state shared across all request handlers.

use crate::resources::ResourceSnapshot;
use payflow_core::events::EventQueueSender;
use payflow_core::processors::SchedulerState;
use payflow_core::telemetry::{SchedulerHistoryReader, WebhookCounters, WebhookHistoryReader};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc or
/// a channel handle).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: SqlitePool,
    /// Producer side of the event queue drained by the event processor.
    pub queue: EventQueueSender,
    /// Whether callbacks come from the mock processor.
    pub mock_mode: bool,
    pub counters: Arc<WebhookCounters>,
    pub scheduler_runs: SchedulerHistoryReader,
    pub webhook_events: WebhookHistoryReader,
    pub scheduler_state: watch::Receiver<SchedulerState>,
    pub resources: watch::Receiver<ResourceSnapshot>,
    pub started_at: Instant,
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use payflow_core::events::{EventQueueReceiver, event_queue};
    use payflow_core::framework::connect_and_migrate;
    use payflow_core::telemetry::{HISTORY_CAPACITY, SchedulerHistory, WebhookHistory, history};

    /// An [`AppState`] plus the producer/consumer ends the background tasks
    /// would normally own.
    pub struct TestApp {
        pub state: AppState,
        pub queue: EventQueueReceiver,
        pub scheduler_runs: SchedulerHistory,
        pub webhook_events: WebhookHistory,
        pub scheduler_state: watch::Sender<SchedulerState>,
        pub resources: watch::Sender<ResourceSnapshot>,
    }

    pub async fn test_app(mock_mode: bool) -> TestApp {
        let db = connect_and_migrate("sqlite::memory:", 1).await.unwrap();
        let (queue_tx, queue_rx) = event_queue();
        let (scheduler_runs, scheduler_reader) = history(HISTORY_CAPACITY);
        let (webhook_events, webhook_reader) = history(HISTORY_CAPACITY);
        let (scheduler_state, scheduler_state_rx) = watch::channel(SchedulerState::Idle);
        let (resources, resources_rx) = watch::channel(ResourceSnapshot::default());

        TestApp {
            state: AppState {
                db,
                queue: queue_tx,
                mock_mode,
                counters: Arc::new(WebhookCounters::default()),
                scheduler_runs: scheduler_reader,
                webhook_events: webhook_reader,
                scheduler_state: scheduler_state_rx,
                resources: resources_rx,
                started_at: Instant::now(),
            },
            queue: queue_rx,
            scheduler_runs,
            webhook_events,
            scheduler_state,
            resources,
        }
    }
}
