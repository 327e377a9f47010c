//! Fake gateways shared by processor tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use payflow_sdk::objects::{Event, Invoice, InvoiceRequest, Transfer, TransferRequest};

use crate::gateway::{
    EventOrigin, EventVerifier, GatewayError, InvoiceGateway, ParsedEvent, Payer,
    PayerGenerator, TransferGateway, VerifyError,
};

fn upstream_error() -> GatewayError {
    GatewayError::Rejected("upstream unavailable".to_string())
}

pub struct FixedPayer;

impl PayerGenerator for FixedPayer {
    fn payer(&self) -> Payer {
        Payer {
            name: "Ana Souza".to_string(),
            tax_id: "529.982.247-25".to_string(),
        }
    }
}

/// Echoes requested invoices back with sequential ids.
#[derive(Default)]
pub struct FakeInvoices {
    fail: bool,
    calls: AtomicUsize,
    next_id: AtomicUsize,
    pub paid: Mutex<Vec<Invoice>>,
}

impl FakeInvoices {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_paid(paid: Vec<Invoice>) -> Self {
        Self {
            paid: Mutex::new(paid),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InvoiceGateway for FakeInvoices {
    async fn create_invoices(
        &self,
        invoices: Vec<InvoiceRequest>,
    ) -> Result<Vec<Invoice>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(upstream_error());
        }
        Ok(invoices
            .into_iter()
            .map(|request| Invoice {
                id: format!("inv-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
                amount: request.amount,
                name: request.name,
                tax_id: request.tax_id,
                fee: 0,
                status: "created".to_string(),
                tags: request.tags,
            })
            .collect())
    }

    async fn list_paid_invoices(&self, limit: u32) -> Result<Vec<Invoice>, GatewayError> {
        if self.fail {
            return Err(upstream_error());
        }
        let paid = self.paid.lock().unwrap();
        Ok(paid.iter().take(limit as usize).cloned().collect())
    }
}

/// Records transfer requests; fails for invoices listed in `fail_for`.
#[derive(Default)]
pub struct FakeTransfers {
    pub requests: Mutex<Vec<TransferRequest>>,
    fail_for: HashSet<String>,
}

impl FakeTransfers {
    pub fn failing_for(invoice_ids: &[&str]) -> Self {
        Self {
            fail_for: invoice_ids.iter().map(|id| id.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<TransferRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransferGateway for FakeTransfers {
    async fn create_transfers(
        &self,
        transfers: Vec<TransferRequest>,
    ) -> Result<Vec<Transfer>, GatewayError> {
        if transfers
            .iter()
            .any(|t| t.tags.iter().any(|tag| self.fail_for.contains(tag)))
        {
            return Err(upstream_error());
        }
        let mut requests = self.requests.lock().unwrap();
        let mut created = Vec::with_capacity(transfers.len());
        for transfer in transfers {
            created.push(Transfer {
                id: format!("tr-{}", requests.len()),
                amount: transfer.amount,
                status: "created".to_string(),
                name: transfer.name.clone(),
            });
            requests.push(transfer);
        }
        Ok(created)
    }
}

/// Accepts any signature except `"bad"` and records the order of calls.
#[derive(Default)]
pub struct RecordingVerifier {
    pub seen: Mutex<Vec<Vec<u8>>>,
}

impl RecordingVerifier {
    pub fn seen(&self) -> Vec<Vec<u8>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventVerifier for RecordingVerifier {
    async fn parse(
        &self,
        content: &[u8],
        signature: &str,
        origin: EventOrigin,
    ) -> Result<ParsedEvent, VerifyError> {
        self.seen.lock().unwrap().push(content.to_vec());
        if signature == "bad" {
            return Err(VerifyError::InvalidSignature);
        }
        Ok(ParsedEvent::new(origin, Event::from_slice(content)?))
    }
}

/// A signed-looking credited invoice event body.
pub fn credited_event(invoice_id: &str, amount: i64, fee: i64) -> Vec<u8> {
    serde_json::json!({
        "event": {
            "id": format!("evt-{invoice_id}"),
            "subscription": "invoice",
            "log": {
                "id": format!("log-{invoice_id}"),
                "type": "credited",
                "invoice": { "id": invoice_id, "amount": amount, "fee": fee }
            }
        }
    })
    .to_string()
    .into_bytes()
}
