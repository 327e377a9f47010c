//! Paid-invoice reconciliation configuration.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationConfig {
    pub enabled: bool,
    /// Delay before the first run after startup.
    pub initial_delay: Duration,
    /// Gap between two runs.
    pub interval: Duration,
    /// Maximum number of paid invoices examined per run.
    pub page_limit: u32,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay: Duration::from_secs(60),
            interval: Duration::from_secs(15 * 60),
            page_limit: 100,
        }
    }
}
