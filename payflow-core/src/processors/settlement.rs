//! SettlementForwarder.
//!
//! Forwards the net amount of a credited invoice (gross minus processor fee)
//! to the configured destination account, then marks the invoice `received`.

use std::sync::Arc;

use kanau::processor::Processor;
use payflow_sdk::objects::{Transfer, TransferRequest};
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::TransferDestination;
use crate::entities::invoice_records::{GetInvoiceRecordById, LedgerError, MarkInvoiceReceived};
use crate::framework::DatabaseProcessor;
use crate::gateway::{GatewayError, TransferGateway};

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("transfer failed: {0}")]
    Upstream(#[from] GatewayError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

pub struct SettlementForwarder {
    pool: SqlitePool,
    transfers: Arc<dyn TransferGateway>,
    destination: TransferDestination,
    lock: Mutex<()>,
}

/// Processor-side idempotency key for the settlement of `invoice_id`.
pub fn settlement_external_id(invoice_id: &str) -> String {
    format!("payflow-{invoice_id}")
}

impl SettlementForwarder {
    pub fn new(
        pool: SqlitePool,
        transfers: Arc<dyn TransferGateway>,
        destination: TransferDestination,
    ) -> Self {
        Self {
            pool,
            transfers,
            destination,
            lock: Mutex::new(()),
        }
    }

    /// Transfer `credited_amount - fee` to the destination.
    ///
    /// Returns `None` without side effects when the net amount is not
    /// positive or the invoice is already settled.
    #[tracing::instrument(skip(self))]
    pub async fn forward_payment(
        &self,
        invoice_id: &str,
        credited_amount: i64,
        fee: i64,
    ) -> Result<Option<Transfer>, SettlementError> {
        let net = credited_amount.saturating_sub(fee);
        if net <= 0 {
            warn!(
                invoice_id,
                credited_amount, fee, "Fee absorbs the whole credit, nothing to forward"
            );
            return Ok(None);
        }

        let _guard = self.lock.lock().await;
        let db = DatabaseProcessor {
            pool: self.pool.clone(),
        };

        let existing = db
            .process(GetInvoiceRecordById {
                invoice_id: invoice_id.to_string(),
            })
            .await
            .map_err(LedgerError::from)?;
        if existing.as_ref().is_some_and(|record| record.is_received()) {
            info!(invoice_id, "Invoice already settled, skipping transfer");
            return Ok(None);
        }

        let transfer = self
            .transfers
            .create_transfers(vec![self.transfer_request(invoice_id, net)])
            .await?
            .into_iter()
            .next()
            .ok_or(GatewayError::EmptyResponse("transfers"))?;

        info!(invoice_id, transfer_id = %transfer.id, net, "Forwarded settlement");

        match db
            .process(MarkInvoiceReceived {
                invoice_id: invoice_id.to_string(),
                transfer_id: transfer.id.clone(),
            })
            .await
        {
            Ok(_) => {}
            Err(LedgerError::NotFound(_)) => {
                warn!(
                    invoice_id,
                    transfer_id = %transfer.id,
                    "Settled an invoice that is not in the ledger"
                );
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Some(transfer))
    }

    fn transfer_request(&self, invoice_id: &str, net: i64) -> TransferRequest {
        let TransferDestination {
            bank_code,
            branch_code,
            account_number,
            account_type,
            name,
            tax_id,
        } = self.destination.clone();
        TransferRequest {
            amount: net,
            name,
            tax_id,
            bank_code,
            branch_code,
            account_number,
            account_type,
            external_id: Some(settlement_external_id(invoice_id)),
            tags: vec![invoice_id.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::invoice_records::{
        CreateInvoiceRecord, InvoiceRecord, InvoiceStatus, NewInvoiceRecord,
    };
    use crate::framework::testing::memory_pool;
    use crate::processors::testing::FakeTransfers;

    async fn setup(transfers: Arc<FakeTransfers>) -> (SettlementForwarder, DatabaseProcessor) {
        let pool = memory_pool().await;
        let db = DatabaseProcessor { pool: pool.clone() };
        db.process(CreateInvoiceRecord {
            record: NewInvoiceRecord {
                id: "inv-1".to_string(),
                amount: 10_000,
                payer_name: "Ana Souza".to_string(),
                payer_tax_id: "529.982.247-25".to_string(),
            },
        })
        .await
        .unwrap();
        (
            SettlementForwarder::new(pool, transfers, TransferDestination::default()),
            db,
        )
    }

    async fn record(db: &DatabaseProcessor) -> InvoiceRecord {
        db.process(GetInvoiceRecordById {
            invoice_id: "inv-1".to_string(),
        })
        .await
        .unwrap()
        .unwrap()
    }

    #[tokio::test]
    async fn test_non_positive_net_is_skipped() {
        let transfers = Arc::new(FakeTransfers::default());
        let (forwarder, db) = setup(transfers.clone()).await;

        assert!(forwarder.forward_payment("inv-1", 500, 500).await.unwrap().is_none());
        assert!(forwarder.forward_payment("inv-1", 100, 500).await.unwrap().is_none());

        assert!(transfers.requests().is_empty());
        assert_eq!(record(&db).await.status, InvoiceStatus::Issued);
    }

    #[tokio::test]
    async fn test_forwards_net_amount() {
        let transfers = Arc::new(FakeTransfers::default());
        let (forwarder, db) = setup(transfers.clone()).await;

        let transfer = forwarder
            .forward_payment("inv-1", 10_000, 250)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(transfer.amount, 9_750);

        let requests = transfers.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].amount, 9_750);
        assert_eq!(requests[0].bank_code, "20018183");
        assert_eq!(requests[0].external_id.as_deref(), Some("payflow-inv-1"));
        assert_eq!(requests[0].tags, vec!["inv-1".to_string()]);

        let stored = record(&db).await;
        assert_eq!(stored.status, InvoiceStatus::Received);
        assert_eq!(stored.transfer_id, Some(transfer.id));
        assert!(stored.received_at.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_delivery_transfers_once() {
        let transfers = Arc::new(FakeTransfers::default());
        let (forwarder, _db) = setup(transfers.clone()).await;

        assert!(forwarder.forward_payment("inv-1", 10_000, 250).await.unwrap().is_some());
        assert!(forwarder.forward_payment("inv-1", 10_000, 250).await.unwrap().is_none());
        assert_eq!(transfers.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_invoice_still_transfers() {
        let transfers = Arc::new(FakeTransfers::default());
        let (forwarder, db) = setup(transfers.clone()).await;

        let transfer = forwarder.forward_payment("ghost", 2_000, 0).await.unwrap();
        assert_eq!(transfer.map(|t| t.amount), Some(2_000));
        assert!(
            db.process(GetInvoiceRecordById {
                invoice_id: "ghost".to_string()
            })
            .await
            .unwrap()
            .is_none()
        );
    }

    #[tokio::test]
    async fn test_transfer_failure_leaves_invoice_issued() {
        let transfers = Arc::new(FakeTransfers::failing_for(&["inv-1"]));
        let (forwarder, db) = setup(transfers).await;

        let err = forwarder
            .forward_payment("inv-1", 10_000, 250)
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::Upstream(_)));
        let stored = record(&db).await;
        assert_eq!(stored.status, InvoiceStatus::Issued);
        assert!(stored.transfer_id.is_none());
    }
}
