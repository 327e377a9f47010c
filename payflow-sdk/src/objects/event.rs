//! Webhook event bodies.
//!
//! The processor posts `{"event": {...}}`; some senders post the bare event.
//! Every field is optional on the wire, so absent values decode to their
//! defaults (empty strings, zero amounts) instead of failing the event.

use serde::{Deserialize, Serialize};

/// Invoice snapshot attached to an invoice log entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedInvoice {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub fee: i64,
}

/// The log entry that caused the event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    #[serde(default)]
    pub id: String,
    /// `created`, `paid`, `credited`, `overdue`, ...
    #[serde(rename = "type", default)]
    pub log_type: String,
    #[serde(default)]
    pub invoice: Option<LoggedInvoice>,
}

/// A webhook event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub id: String,
    /// `invoice`, `transfer`, `boleto`, ...
    #[serde(default)]
    pub subscription: String,
    #[serde(default)]
    pub log: Option<EventLog>,
    #[serde(default)]
    pub workspace_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EventPayload {
    Wrapped { event: Event },
    Bare(Event),
}

impl Event {
    /// Decode an event body, accepting both the wrapped and the bare form.
    pub fn from_slice(content: &[u8]) -> Result<Self, serde_json::Error> {
        match serde_json::from_slice(content)? {
            EventPayload::Wrapped { event } => Ok(event),
            EventPayload::Bare(event) => Ok(event),
        }
    }

    /// The invoice snapshot, if this is an invoice log event.
    pub fn invoice(&self) -> Option<&LoggedInvoice> {
        self.log.as_ref().and_then(|log| log.invoice.as_ref())
    }

    /// The log type, or an empty string when the event carries no log.
    pub fn log_type(&self) -> &str {
        self.log.as_ref().map(|log| log.log_type.as_str()).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_event() {
        let body = br#"{"event":{"id":"evt_1","subscription":"invoice","workspaceId":"ws",
            "log":{"id":"log_1","type":"credited","invoice":{"id":"inv_1","amount":2500,"fee":50}}}}"#;
        let event = Event::from_slice(body).unwrap();
        assert_eq!(event.subscription, "invoice");
        assert_eq!(event.log_type(), "credited");
        let invoice = event.invoice().unwrap();
        assert_eq!((invoice.id.as_str(), invoice.amount, invoice.fee), ("inv_1", 2500, 50));
        assert_eq!(event.workspace_id.as_deref(), Some("ws"));
    }

    #[test]
    fn test_bare_event_and_missing_fee() {
        let body = br#"{"subscription":"invoice","log":{"type":"credited","invoice":{"id":"inv_2","amount":800}}}"#;
        let event = Event::from_slice(body).unwrap();
        assert_eq!(event.invoice().unwrap().fee, 0);
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let event = Event::from_slice(b"{}").unwrap();
        assert!(event.subscription.is_empty());
        assert_eq!(event.log_type(), "");
        assert!(event.invoice().is_none());
    }

    #[test]
    fn test_non_json_is_rejected() {
        assert!(Event::from_slice(b"not json").is_err());
    }
}
