use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use time::OffsetDateTime;

/// Webhook ingress counters.
#[derive(Debug, Default)]
pub struct WebhookCounters {
    received: AtomicU64,
    rejected: AtomicU64,
    errors: AtomicU64,
    credited_cents: AtomicI64,
    /// Unix milliseconds; 0 means no event yet.
    last_event_at: AtomicI64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub received: u64,
    pub rejected: u64,
    pub errors: u64,
    pub credited_cents: i64,
    pub last_event_at: Option<OffsetDateTime>,
}

impl WebhookCounters {
    pub fn record_received(&self, at: OffsetDateTime) {
        self.received.fetch_add(1, Ordering::Relaxed);
        let millis = (at.unix_timestamp_nanos() / 1_000_000) as i64;
        self.last_event_at.store(millis, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_credited(&self, cents: i64) {
        self.credited_cents.fetch_add(cents, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        let millis = self.last_event_at.load(Ordering::Relaxed);
        let last_event_at = (millis != 0)
            .then(|| OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok())
            .flatten();
        CountersSnapshot {
            received: self.received.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            credited_cents: self.credited_cents.load(Ordering::Relaxed),
            last_event_at,
        }
    }
}
