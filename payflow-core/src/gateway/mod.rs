//! Capabilities the processors are built on.
//!
//! Each external collaborator (invoice creation, transfers, event signature
//! verification, payer attributes) sits behind a trait. Production wiring
//! uses [`ProcessorClient`](payflow_sdk::client::ProcessorClient); mock mode
//! is just a client pointed at another base URL without credentials.

mod processor_api;
mod verifier;

pub use verifier::EcdsaEventVerifier;

use async_trait::async_trait;
use k256::ecdsa::VerifyingKey;
use payflow_sdk::client::ClientError;
use payflow_sdk::objects::{Event, Invoice, InvoiceRequest, Transfer, TransferRequest};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("processor request failed: {0}")]
    Client(#[from] ClientError),

    #[error("processor returned no {0}")]
    EmptyResponse(&'static str),

    #[error("processor rejected the request: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("invalid event signature")]
    InvalidSignature,

    #[error("malformed event: {0}")]
    MalformedEvent(#[from] serde_json::Error),

    #[error("public key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("no public key source for {0} events")]
    UnsupportedOrigin(EventOrigin),
}

/// Where a webhook callback claims to come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventOrigin {
    Processor,
    Mock,
}

impl EventOrigin {
    pub fn from_mock_flag(is_mock: bool) -> Self {
        if is_mock {
            EventOrigin::Mock
        } else {
            EventOrigin::Processor
        }
    }
}

impl std::fmt::Display for EventOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventOrigin::Processor => write!(f, "processor"),
            EventOrigin::Mock => write!(f, "mock"),
        }
    }
}

/// A verified event, tagged with the origin whose key verified it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedEvent {
    Processor(Event),
    Mock(Event),
}

impl ParsedEvent {
    pub fn new(origin: EventOrigin, event: Event) -> Self {
        match origin {
            EventOrigin::Processor => ParsedEvent::Processor(event),
            EventOrigin::Mock => ParsedEvent::Mock(event),
        }
    }

    pub fn origin(&self) -> EventOrigin {
        match self {
            ParsedEvent::Processor(_) => EventOrigin::Processor,
            ParsedEvent::Mock(_) => EventOrigin::Mock,
        }
    }

    pub fn event(&self) -> &Event {
        match self {
            ParsedEvent::Processor(event) | ParsedEvent::Mock(event) => event,
        }
    }
}

/// Invoice creation and lookup.
#[async_trait]
pub trait InvoiceGateway: Send + Sync {
    /// Create all invoices in a single upstream call.
    async fn create_invoices(
        &self,
        invoices: Vec<InvoiceRequest>,
    ) -> Result<Vec<Invoice>, GatewayError>;

    /// Invoices the processor reports as paid, newest first.
    async fn list_paid_invoices(&self, limit: u32) -> Result<Vec<Invoice>, GatewayError>;
}

#[async_trait]
pub trait TransferGateway: Send + Sync {
    async fn create_transfers(
        &self,
        transfers: Vec<TransferRequest>,
    ) -> Result<Vec<Transfer>, GatewayError>;
}

/// Source of the key that signs webhook events.
#[async_trait]
pub trait PublicKeySource: Send + Sync {
    async fn fetch_public_key(&self) -> Result<VerifyingKey, VerifyError>;
}

/// Turns a raw callback into a trusted event.
#[async_trait]
pub trait EventVerifier: Send + Sync {
    async fn parse(
        &self,
        content: &[u8],
        signature: &str,
        origin: EventOrigin,
    ) -> Result<ParsedEvent, VerifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payer {
    pub name: String,
    pub tax_id: String,
}

pub trait PayerGenerator: Send + Sync {
    fn payer(&self) -> Payer;
}
