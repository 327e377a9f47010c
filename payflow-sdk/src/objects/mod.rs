//! Request and response bodies of the processor's v2 REST API.
//!
//! The API speaks camelCase JSON and wraps collections in a named field
//! (`{"invoices": [...]}`), which the `*Envelope` types model.

pub mod event;
pub mod invoice;
pub mod public_key;
pub mod transfer;
pub mod webhook;

pub use event::{Event, EventLog, LoggedInvoice};
pub use invoice::{Invoice, InvoiceDescription, InvoiceEnvelope, InvoicePage, InvoiceRequest};
pub use public_key::{PublicKeyEntry, PublicKeyList};
pub use transfer::{Transfer, TransferEnvelope, TransferRequest};
pub use webhook::{Webhook, WebhookEnvelope, WebhookList, WebhookRequest};
