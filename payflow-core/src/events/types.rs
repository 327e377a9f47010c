//! Event type definitions.

use bytes::Bytes;
use time::OffsetDateTime;

/// A webhook callback as received, before any verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedEvent {
    /// Raw request body, byte for byte.
    pub content: Bytes,
    /// Value of the signature header; empty when the header was missing.
    pub signature: String,
    /// Whether the callback came from the mock processor.
    pub is_mock: bool,
    pub enqueued_at: OffsetDateTime,
}

impl QueuedEvent {
    pub fn new(content: impl Into<Bytes>, signature: impl Into<String>, is_mock: bool) -> Self {
        Self {
            content: content.into(),
            signature: signature.into(),
            is_mock,
            enqueued_at: OffsetDateTime::now_utc(),
        }
    }
}
