//! EventProcessor.
//!
//! The EventProcessor is responsible for:
//! - Receiving `QueuedEvent` from the event queue, one at a time, in order
//! - Verifying each event against the key of its origin
//! - Recording every event in the webhook history
//! - Forwarding credited invoices to the `SettlementForwarder`
//!
//! No single event can stop the loop: every failure is logged, counted and
//! dropped.

use std::sync::Arc;

use payflow_sdk::objects::Event;
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::events::{EventQueueReceiver, QueuedEvent};
use crate::gateway::{EventOrigin, EventVerifier, VerifyError};
use crate::processors::settlement::SettlementForwarder;
use crate::telemetry::{WebhookCounters, WebhookEventRecord, WebhookHistory};

const INVOICE_SUBSCRIPTION: &str = "invoice";
const CREDITED_LOG: &str = "credited";

/// What happened to one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Signature did not verify.
    Rejected,
    /// Could not be verified or understood for another reason.
    Discarded,
    /// Recorded; nothing else to do.
    Recorded,
    /// Credited invoice handed to settlement. `None` if no transfer was made.
    Settled { transfer_id: Option<String> },
    /// Credited invoice whose settlement failed.
    SettlementFailed,
}

pub struct EventProcessor {
    queue: EventQueueReceiver,
    verifier: Arc<dyn EventVerifier>,
    settlement: Arc<SettlementForwarder>,
    history: WebhookHistory,
    counters: Arc<WebhookCounters>,
    shutdown_rx: watch::Receiver<bool>,
}

impl EventProcessor {
    pub fn new(
        queue: EventQueueReceiver,
        verifier: Arc<dyn EventVerifier>,
        settlement: Arc<SettlementForwarder>,
        history: WebhookHistory,
        counters: Arc<WebhookCounters>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            queue,
            verifier,
            settlement,
            history,
            counters,
            shutdown_rx,
        }
    }

    /// Run until shutdown or until every queue sender is dropped.
    pub async fn run(mut self) {
        info!("EventProcessor started");

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("EventProcessor received shutdown signal");
                        break;
                    }
                }

                event = self.queue.recv() => {
                    let Some(event) = event else {
                        info!("Event queue closed");
                        break;
                    };
                    let outcome = self.handle(event).await;
                    debug!(?outcome, "Processed webhook event");
                }
            }
        }

        info!("EventProcessor shutdown complete");
    }

    /// Verify, record and act on a single event.
    pub async fn handle(&self, event: QueuedEvent) -> EventOutcome {
        let origin = EventOrigin::from_mock_flag(event.is_mock);

        let parsed = match self
            .verifier
            .parse(&event.content, &event.signature, origin)
            .await
        {
            Ok(parsed) => parsed,
            Err(VerifyError::InvalidSignature) => {
                warn!(%origin, "Rejected webhook event with invalid signature");
                self.counters.record_rejected();
                self.history
                    .push(WebhookEventRecord::rejected(OffsetDateTime::now_utc()))
                    .await;
                return EventOutcome::Rejected;
            }
            Err(e) => {
                error!(%origin, error = %e, "Failed to verify webhook event");
                self.counters.record_error();
                return EventOutcome::Discarded;
            }
        };

        let event = parsed.event();
        self.history
            .push(event_record(event, OffsetDateTime::now_utc()))
            .await;

        if event.subscription != INVOICE_SUBSCRIPTION || event.log_type() != CREDITED_LOG {
            debug!(
                subscription = %event.subscription,
                log_type = event.log_type(),
                "Webhook event recorded"
            );
            return EventOutcome::Recorded;
        }

        let Some(invoice) = event.invoice() else {
            warn!(event_id = %event.id, "Credited event carries no invoice");
            self.counters.record_error();
            return EventOutcome::Discarded;
        };
        if invoice.id.trim().is_empty() {
            warn!(event_id = %event.id, "Credited event carries an invoice without id");
            self.counters.record_error();
            return EventOutcome::Discarded;
        }

        self.counters.add_credited(invoice.amount);
        info!(
            invoice_id = %invoice.id,
            amount = invoice.amount,
            fee = invoice.fee,
            %origin,
            "Invoice credited"
        );

        match self
            .settlement
            .forward_payment(&invoice.id, invoice.amount, invoice.fee)
            .await
        {
            Ok(transfer) => EventOutcome::Settled {
                transfer_id: transfer.map(|t| t.id),
            },
            Err(e) => {
                error!(invoice_id = %invoice.id, error = %e, "Settlement failed");
                self.counters.record_error();
                EventOutcome::SettlementFailed
            }
        }
    }
}

/// History entry for a verified event.
fn event_record(event: &Event, timestamp: OffsetDateTime) -> WebhookEventRecord {
    let event_type = if event.subscription == INVOICE_SUBSCRIPTION {
        format!("{}.{}", event.subscription, event.log_type())
    } else {
        event.subscription.clone()
    };
    let invoice = event.invoice();
    WebhookEventRecord {
        timestamp,
        event_type,
        invoice_id: invoice.map(|i| i.id.clone()),
        amount: invoice.map(|i| i.amount).unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransferDestination;
    use crate::entities::invoice_records::{
        CreateInvoiceRecord, GetInvoiceRecordById, InvoiceStatus, NewInvoiceRecord,
    };
    use crate::events::event_queue;
    use crate::framework::DatabaseProcessor;
    use crate::framework::testing::memory_pool;
    use crate::gateway::{EcdsaEventVerifier, PublicKeySource};
    use crate::processors::testing::{FakeTransfers, RecordingVerifier, credited_event};
    use crate::telemetry::{HISTORY_CAPACITY, WebhookHistoryReader, history};
    use async_trait::async_trait;
    use k256::ecdsa::{SigningKey, VerifyingKey};
    use kanau::processor::Processor;
    use payflow_sdk::signature::sign_message;

    struct Harness {
        db: DatabaseProcessor,
        transfers: Arc<FakeTransfers>,
        history: WebhookHistoryReader,
        counters: Arc<WebhookCounters>,
    }

    async fn processor_with(
        verifier: Arc<dyn EventVerifier>,
        transfers: FakeTransfers,
        queue: EventQueueReceiver,
        invoices: &[&str],
    ) -> (EventProcessor, Harness, watch::Sender<bool>) {
        let pool = memory_pool().await;
        let db = DatabaseProcessor { pool: pool.clone() };
        for id in invoices {
            db.process(CreateInvoiceRecord {
                record: NewInvoiceRecord {
                    id: id.to_string(),
                    amount: 10_000,
                    payer_name: "Ana Souza".to_string(),
                    payer_tax_id: "529.982.247-25".to_string(),
                },
            })
            .await
            .unwrap();
        }

        let transfers = Arc::new(transfers);
        let settlement = Arc::new(SettlementForwarder::new(
            pool,
            transfers.clone(),
            TransferDestination::default(),
        ));
        let (writer, reader) = history(HISTORY_CAPACITY);
        let counters = Arc::new(WebhookCounters::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let processor = EventProcessor::new(
            queue,
            verifier,
            settlement,
            writer,
            counters.clone(),
            shutdown_rx,
        );
        (
            processor,
            Harness {
                db,
                transfers,
                history: reader,
                counters,
            },
            shutdown_tx,
        )
    }

    async fn status(db: &DatabaseProcessor, id: &str) -> InvoiceStatus {
        db.process(GetInvoiceRecordById {
            invoice_id: id.to_string(),
        })
        .await
        .unwrap()
        .unwrap()
        .status
    }

    #[tokio::test]
    async fn test_events_are_verified_in_queue_order() {
        let (tx, rx) = event_queue();
        let verifier = Arc::new(RecordingVerifier::default());
        let (processor, harness, _shutdown) =
            processor_with(verifier.clone(), FakeTransfers::default(), rx, &[]).await;

        let bodies: Vec<Vec<u8>> = (1..=3)
            .map(|i| format!(r#"{{"event":{{"id":"e{i}","subscription":"transfer"}}}}"#).into_bytes())
            .collect();
        for body in &bodies {
            tx.send(QueuedEvent::new(body.clone(), "sig", false)).unwrap();
        }
        drop(tx);
        processor.run().await;

        assert_eq!(verifier.seen(), bodies);
        let recorded = harness.history.snapshot().await;
        assert_eq!(recorded.len(), 3);
        assert!(recorded.iter().all(|r| r.event_type == "transfer"));
        assert!(harness.transfers.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failed_settlement_does_not_stop_the_loop() {
        let (tx, rx) = event_queue();
        let (processor, harness, _shutdown) = processor_with(
            Arc::new(RecordingVerifier::default()),
            FakeTransfers::failing_for(&["inv-2"]),
            rx,
            &["inv-1", "inv-2", "inv-3"],
        )
        .await;

        for id in ["inv-1", "inv-2", "inv-3"] {
            tx.send(QueuedEvent::new(credited_event(id, 10_000, 250), "sig", false))
                .unwrap();
        }
        drop(tx);
        processor.run().await;

        assert_eq!(status(&harness.db, "inv-1").await, InvoiceStatus::Received);
        assert_eq!(status(&harness.db, "inv-2").await, InvoiceStatus::Issued);
        assert_eq!(status(&harness.db, "inv-3").await, InvoiceStatus::Received);

        let amounts: Vec<i64> = harness.transfers.requests().iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![9_750, 9_750]);

        let counters = harness.counters.snapshot();
        assert_eq!(counters.credited_cents, 30_000);
        assert_eq!(counters.errors, 1);

        let types: Vec<String> = harness
            .history
            .snapshot()
            .await
            .into_iter()
            .map(|r| r.event_type)
            .collect();
        assert_eq!(types, vec!["invoice.credited"; 3]);
    }

    struct StaticKey(VerifyingKey);

    #[async_trait]
    impl PublicKeySource for StaticKey {
        async fn fetch_public_key(&self) -> Result<VerifyingKey, VerifyError> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn test_tampered_event_never_reaches_settlement() {
        let key = SigningKey::from_slice(&[5u8; 32]).unwrap();
        let verifier = EcdsaEventVerifier::new().with_source(
            EventOrigin::Mock,
            Arc::new(StaticKey(*key.verifying_key())),
        );
        let (_tx, rx) = event_queue();
        let (processor, harness, _shutdown) = processor_with(
            Arc::new(verifier),
            FakeTransfers::default(),
            rx,
            &["inv-1"],
        )
        .await;

        let signature = sign_message(&credited_event("inv-1", 100, 1), &key);
        let tampered = credited_event("inv-1", 10_000, 1);
        let outcome = processor
            .handle(QueuedEvent::new(tampered, signature.clone(), true))
            .await;
        assert_eq!(outcome, EventOutcome::Rejected);
        assert!(harness.transfers.requests().is_empty());
        assert_eq!(status(&harness.db, "inv-1").await, InvoiceStatus::Issued);

        let recorded = harness.history.snapshot().await;
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0].is_rejected());
        assert_eq!(harness.counters.snapshot().rejected, 1);

        // the untampered body goes through
        let outcome = processor
            .handle(QueuedEvent::new(credited_event("inv-1", 100, 1), signature, true))
            .await;
        assert!(matches!(outcome, EventOutcome::Settled { transfer_id: Some(_) }));
    }

    #[tokio::test]
    async fn test_unverifiable_origin_is_discarded() {
        let (_tx, rx) = event_queue();
        let (processor, harness, _shutdown) = processor_with(
            Arc::new(EcdsaEventVerifier::new()),
            FakeTransfers::default(),
            rx,
            &[],
        )
        .await;

        let outcome = processor
            .handle(QueuedEvent::new(credited_event("inv-1", 100, 1), "sig", false))
            .await;
        assert_eq!(outcome, EventOutcome::Discarded);
        assert_eq!(harness.counters.snapshot().errors, 1);
        assert!(harness.history.is_empty().await);
    }

    #[tokio::test]
    async fn test_non_credited_invoice_event_is_only_recorded() {
        let (_tx, rx) = event_queue();
        let (processor, harness, _shutdown) = processor_with(
            Arc::new(RecordingVerifier::default()),
            FakeTransfers::default(),
            rx,
            &["inv-1"],
        )
        .await;

        let body = br#"{"event":{"subscription":"invoice","log":{"type":"paid","invoice":{"id":"inv-1","amount":700}}}}"#;
        let outcome = processor
            .handle(QueuedEvent::new(body.to_vec(), "sig", false))
            .await;
        assert_eq!(outcome, EventOutcome::Recorded);

        let recorded = harness.history.snapshot().await;
        assert_eq!(recorded[0].event_type, "invoice.paid");
        assert_eq!(recorded[0].invoice_id.as_deref(), Some("inv-1"));
        assert_eq!(recorded[0].amount, 700);
        assert!(harness.transfers.requests().is_empty());
    }

    #[tokio::test]
    async fn test_credited_event_without_invoice_id_is_discarded() {
        let (_tx, rx) = event_queue();
        let (processor, harness, _shutdown) = processor_with(
            Arc::new(RecordingVerifier::default()),
            FakeTransfers::default(),
            rx,
            &[],
        )
        .await;

        let body = br#"{"event":{"subscription":"invoice","log":{"type":"credited","invoice":{"amount":10000}}}}"#;
        for _ in 0..2 {
            let outcome = processor
                .handle(QueuedEvent::new(body.to_vec(), "sig", false))
                .await;
            assert_eq!(outcome, EventOutcome::Discarded);
        }

        assert!(harness.transfers.requests().is_empty());
        let counters = harness.counters.snapshot();
        assert_eq!(counters.errors, 2);
        assert_eq!(counters.credited_cents, 0);
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_the_loop() {
        let (_tx, rx) = event_queue();
        let (processor, _harness, shutdown) = processor_with(
            Arc::new(RecordingVerifier::default()),
            FakeTransfers::default(),
            rx,
            &[],
        )
        .await;

        let task = tokio::spawn(processor.run());
        shutdown.send(true).unwrap();
        task.await.unwrap();
    }
}
