//! Event queue factory and handles.

use super::types::QueuedEvent;
use tokio::sync::mpsc;

/// Sender handle for the event queue. Cheap to clone.
pub type EventQueueSender = mpsc::UnboundedSender<QueuedEvent>;
/// Receiver handle for the event queue. Owned by the event processor.
pub type EventQueueReceiver = mpsc::UnboundedReceiver<QueuedEvent>;

/// Create the event queue.
///
/// Pushes never block and never drop; events come out in push order.
pub fn event_queue() -> (EventQueueSender, EventQueueReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_preserves_order() {
        let (tx, mut rx) = event_queue();
        for i in 0..100u8 {
            tx.send(QueuedEvent::new(vec![i], "", false)).unwrap();
        }
        drop(tx);

        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            seen.push(event.content[0]);
        }
        assert_eq!(seen, (0..100u8).collect::<Vec<_>>());
    }
}
