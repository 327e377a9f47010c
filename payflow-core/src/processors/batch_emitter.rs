//! BatchEmitter processor.
//!
//! The BatchEmitter is responsible for:
//! - Drawing a batch size and per-invoice amounts from the configured ranges
//! - Creating the whole batch with a single upstream call
//! - Recording every created invoice as `issued` in one ledger transaction

use std::sync::Arc;

use async_trait::async_trait;
use payflow_sdk::objects::{Invoice, InvoiceRequest};
use rand::Rng;
use sqlx::SqlitePool;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::config::BatchConfig;
use crate::entities::invoice_records::{InvoiceRecord, LedgerError, NewInvoiceRecord};
use crate::framework::TransactionProcessor;
use crate::gateway::{GatewayError, InvoiceGateway, PayerGenerator};

/// Tag attached to every invoice this service issues.
pub const INVOICE_TAG: &str = "payflow";

#[derive(Debug, Error)]
pub enum EmitError {
    /// Invoice creation failed; nothing was recorded.
    #[error("invoice creation failed: {0}")]
    Upstream(#[from] GatewayError),

    /// Invoices were created upstream but could not be recorded.
    #[error("failed to record issued invoices: {0}")]
    Ledger(#[from] LedgerError),
}

impl From<sqlx::Error> for EmitError {
    fn from(e: sqlx::Error) -> Self {
        EmitError::Ledger(LedgerError::Database(e))
    }
}

/// Something that can issue one batch of invoices.
#[async_trait]
pub trait BatchIssuer: Send + Sync {
    async fn issue_batch(&self) -> Result<Vec<Invoice>, EmitError>;
}

pub struct BatchEmitter {
    pool: SqlitePool,
    invoices: Arc<dyn InvoiceGateway>,
    payers: Arc<dyn PayerGenerator>,
    config: BatchConfig,
}

impl BatchEmitter {
    pub fn new(
        pool: SqlitePool,
        invoices: Arc<dyn InvoiceGateway>,
        payers: Arc<dyn PayerGenerator>,
        config: BatchConfig,
    ) -> Self {
        Self {
            pool,
            invoices,
            payers,
            config,
        }
    }

    /// Draw a batch of invoice requests.
    fn build_requests(&self, now: OffsetDateTime) -> Vec<InvoiceRequest> {
        let BatchConfig {
            min_batch,
            max_batch,
            min_amount,
            max_amount,
            due_in,
            expiration,
        } = self.config;

        let mut rng = rand::rng();
        let size = rng.random_range(min_batch..=max_batch);
        let due = now + due_in;

        (0..size)
            .map(|_| {
                let payer = self.payers.payer();
                InvoiceRequest {
                    amount: rng.random_range(min_amount..=max_amount),
                    name: payer.name,
                    tax_id: payer.tax_id,
                    due,
                    expiration: expiration.whole_seconds(),
                    tags: vec![INVOICE_TAG.to_string()],
                    descriptions: Vec::new(),
                }
            })
            .collect()
    }

    /// Issue one batch and record it.
    pub async fn issue_batch(&self) -> Result<Vec<Invoice>, EmitError> {
        let requests = self.build_requests(OffsetDateTime::now_utc());
        debug!(size = requests.len(), "Submitting invoice batch");

        let created = self.invoices.create_invoices(requests.clone()).await?;

        let records: Vec<NewInvoiceRecord> = created
            .iter()
            .enumerate()
            .map(|(i, invoice)| to_record(invoice, requests.get(i)))
            .collect();

        let mut tx = TransactionProcessor {
            tx: self.pool.begin().await?,
        };
        let inserted = InvoiceRecord::insert_many(&mut tx, records).await?;
        tx.tx.commit().await?;

        info!(
            requested = requests.len(),
            recorded = inserted,
            "Issued invoice batch"
        );
        Ok(created)
    }
}

/// Ledger row for a created invoice. The processor's response wins; the
/// request fills in anything the response left out.
fn to_record(invoice: &Invoice, request: Option<&InvoiceRequest>) -> NewInvoiceRecord {
    let pick = |returned: &str, requested: Option<&str>| {
        if returned.is_empty() {
            requested.unwrap_or_default().to_string()
        } else {
            returned.to_string()
        }
    };
    let amount = match (invoice.amount, request) {
        (0, Some(request)) => request.amount,
        (amount, _) => amount,
    };
    NewInvoiceRecord {
        id: invoice.id.clone(),
        amount,
        payer_name: pick(&invoice.name, request.map(|r| r.name.as_str())),
        payer_tax_id: pick(&invoice.tax_id, request.map(|r| r.tax_id.as_str())),
    }
}

#[async_trait]
impl BatchIssuer for BatchEmitter {
    async fn issue_batch(&self) -> Result<Vec<Invoice>, EmitError> {
        BatchEmitter::issue_batch(self).await
    }
}
