//! Event queue between webhook ingress and the event processor.
//!
//! # Event Flow
//!
//! 1. `POST /webhook` pushes a `QueuedEvent` and answers immediately
//! 2. `EventProcessor` pops events one at a time, verifies and classifies them
//! 3. credited invoice events go to the `SettlementForwarder`
//!
//! The queue is unbounded: ingress never waits on the consumer.

pub mod channels;
pub mod types;

pub use channels::{EventQueueReceiver, EventQueueSender, event_queue};
pub use types::QueuedEvent;
