use serde::Serialize;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Processing,
    Success,
    Error,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Processing => "processing",
            RunStatus::Success => "success",
            RunStatus::Error => "error",
        }
    }
}

/// One firing of the emission scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerRun {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub status: RunStatus,
    pub invoice_count: usize,
    pub invoice_ids: Vec<String>,
    pub error: Option<String>,
}

impl SchedulerRun {
    pub fn processing(timestamp: OffsetDateTime) -> Self {
        Self {
            timestamp,
            status: RunStatus::Processing,
            invoice_count: 0,
            invoice_ids: Vec::new(),
            error: None,
        }
    }

    pub fn succeed(&mut self, invoice_ids: Vec<String>) {
        self.status = RunStatus::Success;
        self.invoice_count = invoice_ids.len();
        self.invoice_ids = invoice_ids;
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = RunStatus::Error;
        self.error = Some(reason.into());
    }
}

/// One webhook callback as seen by the event processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookEventRecord {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// `invoice.<log type>`, the bare subscription, or `rejected`.
    pub event_type: String,
    pub invoice_id: Option<String>,
    /// Gross amount in cents, 0 when the event carries no invoice.
    pub amount: i64,
}

impl WebhookEventRecord {
    pub const REJECTED: &'static str = "rejected";

    pub fn rejected(timestamp: OffsetDateTime) -> Self {
        Self {
            timestamp,
            event_type: Self::REJECTED.to_string(),
            invoice_id: None,
            amount: 0,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.event_type == Self::REJECTED
    }
}
