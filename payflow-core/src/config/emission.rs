//! Invoice emission configuration.

use std::time::Duration;

/// Most invoices the processor accepts in one create call.
pub const MAX_BATCH_SIZE: u32 = 100;

/// Longest accepted interval or window, ten years.
pub const MAX_SCHEDULE_HOURS: u64 = 24 * 365 * 10;

/// Shape of one invoice batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Smallest batch size (inclusive).
    pub min_batch: u32,
    /// Largest batch size (inclusive).
    pub max_batch: u32,
    /// Smallest invoice amount in cents (inclusive).
    pub min_amount: i64,
    /// Largest invoice amount in cents (inclusive).
    pub max_amount: i64,
    /// How far in the future each invoice is due.
    pub due_in: time::Duration,
    /// How long after the due date an invoice stays payable.
    pub expiration: time::Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            min_batch: 8,
            max_batch: 12,
            min_amount: 1_000,
            max_amount: 50_000,
            due_in: time::Duration::hours(1),
            expiration: time::Duration::hours(1),
        }
    }
}

/// Cadence of the emission scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Gap between two grid points.
    pub interval: Duration,
    /// Length of the emission window, measured from start.
    pub duration: Duration,
}

impl ScheduleConfig {
    /// `None` when either value does not fit in a `Duration` of seconds.
    pub fn from_hours(interval_hours: u64, duration_hours: u64) -> Option<Self> {
        Some(Self {
            interval: Duration::from_secs(interval_hours.checked_mul(3600)?),
            duration: Duration::from_secs(duration_hours.checked_mul(3600)?),
        })
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3 * 3600),
            duration: Duration::from_secs(24 * 3600),
        }
    }
}
