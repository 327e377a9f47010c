//! Reconciler processor.
//!
//! Recovers settlements for webhooks that never arrived: periodically lists
//! the invoices the processor reports as paid and settles the ones the ledger
//! still has as `issued`.

use std::sync::Arc;

use kanau::processor::Processor;
use sqlx::SqlitePool;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::ReconciliationConfig;
use crate::entities::invoice_records::GetInvoiceRecordById;
use crate::framework::DatabaseProcessor;
use crate::gateway::{GatewayError, InvoiceGateway};
use crate::processors::settlement::SettlementForwarder;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Invoices settled by this run.
    pub processed: u32,
    /// Invoices unknown locally, already received, or with nothing to forward.
    pub skipped: u32,
    pub errors: u32,
}

pub struct Reconciler {
    pool: SqlitePool,
    invoices: Arc<dyn InvoiceGateway>,
    settlement: Arc<SettlementForwarder>,
    config: ReconciliationConfig,
    shutdown_rx: watch::Receiver<bool>,
}

impl Reconciler {
    pub fn new(
        pool: SqlitePool,
        invoices: Arc<dyn InvoiceGateway>,
        settlement: Arc<SettlementForwarder>,
        config: ReconciliationConfig,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            pool,
            invoices,
            settlement,
            config,
            shutdown_rx,
        }
    }

    pub async fn run(mut self) {
        if !self.config.enabled {
            info!("Reconciler disabled");
            return;
        }
        info!(
            interval_secs = self.config.interval.as_secs(),
            page_limit = self.config.page_limit,
            "Reconciler started"
        );

        let mut delay = self.config.initial_delay;
        loop {
            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("Reconciler received shutdown signal");
                        break;
                    }
                }

                _ = tokio::time::sleep(delay) => {
                    match self.reconcile().await {
                        Ok(report) if report.processed > 0 || report.errors > 0 => {
                            info!(?report, "Reconciliation run finished");
                        }
                        Ok(report) => debug!(?report, "Reconciliation run finished"),
                        Err(e) => error!(error = %e, "Failed to list paid invoices"),
                    }
                    delay = self.config.interval;
                }
            }
        }
    }

    /// One reconciliation pass.
    pub async fn reconcile(&self) -> Result<ReconcileReport, GatewayError> {
        let paid = self
            .invoices
            .list_paid_invoices(self.config.page_limit)
            .await?;
        let db = DatabaseProcessor {
            pool: self.pool.clone(),
        };

        let mut report = ReconcileReport::default();
        for invoice in paid {
            let record = match db
                .process(GetInvoiceRecordById {
                    invoice_id: invoice.id.clone(),
                })
                .await
            {
                Ok(record) => record,
                Err(e) => {
                    warn!(invoice_id = %invoice.id, error = %e, "Ledger lookup failed");
                    report.errors += 1;
                    continue;
                }
            };

            match record {
                None => report.skipped += 1,
                Some(record) if record.is_received() => report.skipped += 1,
                Some(_) => {
                    match self
                        .settlement
                        .forward_payment(&invoice.id, invoice.amount, invoice.fee)
                        .await
                    {
                        Ok(Some(_)) => {
                            info!(invoice_id = %invoice.id, "Settled paid invoice missed by webhooks");
                            report.processed += 1;
                        }
                        Ok(None) => report.skipped += 1,
                        Err(e) => {
                            warn!(invoice_id = %invoice.id, error = %e, "Reconciliation settlement failed");
                            report.errors += 1;
                        }
                    }
                }
            }
        }
        Ok(report)
    }
}
