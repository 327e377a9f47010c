//! Processors of the payment pipeline.
//!
//! - `BatchEmitter`: creates a batch of invoices upstream, records them `issued`
//! - `EmissionScheduler`: fires the `BatchEmitter` on a bounded fixed grid
//! - `EventProcessor`: consumes the event queue, verifies and classifies events
//! - `SettlementForwarder`: transfers the net amount of credited invoices
//! - `Reconciler`: settles paid invoices whose webhook never arrived

pub mod batch_emitter;
pub mod emission_scheduler;
pub mod event_processor;
pub mod reconciler;
pub mod settlement;

#[cfg(test)]
pub(crate) mod testing;

pub use batch_emitter::{BatchEmitter, BatchIssuer, EmitError};
pub use emission_scheduler::{EmissionScheduler, SchedulerHandle, SchedulerState};
pub use event_processor::{EventOutcome, EventProcessor};
pub use reconciler::{ReconcileReport, Reconciler};
pub use settlement::{SettlementError, SettlementForwarder};
