//! In-memory operational telemetry.
//!
//! Two bounded histories (scheduler runs and webhook events), each with a
//! single writer and any number of readers, plus lock-free ingress counters.

mod counters;
mod history;
mod records;

pub use counters::{CountersSnapshot, WebhookCounters};
pub use history::{EntryId, HISTORY_CAPACITY, HistoryReader, HistoryWriter, history};
pub use records::{RunStatus, SchedulerRun, WebhookEventRecord};

pub type SchedulerHistory = HistoryWriter<SchedulerRun>;
pub type SchedulerHistoryReader = HistoryReader<SchedulerRun>;
pub type WebhookHistory = HistoryWriter<WebhookEventRecord>;
pub type WebhookHistoryReader = HistoryReader<WebhookEventRecord>;
