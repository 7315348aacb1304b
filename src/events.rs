use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Lifecycle events emitted by the orchestration services.
///
/// Events are a side channel: emission failures are logged and never affect
/// the primary operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order events
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderCancelled(Uuid),

    // Payment events
    PaymentVerified(Uuid),

    // Return events
    ReturnCreated(Uuid),

    // Stock drift observability
    StockDecrementFailed {
        order_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Consumes lifecycle events and logs them. Runs until the channel closes.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderCreated(order_id) => {
                info!(order_id = %order_id, "event: order created");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(order_id = %order_id, old_status = %old_status, new_status = %new_status, "event: order status changed");
            }
            Event::OrderCancelled(order_id) => {
                info!(order_id = %order_id, "event: order cancelled");
            }
            Event::PaymentVerified(order_id) => {
                info!(order_id = %order_id, "event: payment verified");
            }
            Event::ReturnCreated(return_id) => {
                info!(return_id = %return_id, "event: return created");
            }
            Event::StockDecrementFailed {
                order_id,
                product_id,
                quantity,
            } => {
                warn!(
                    order_id = %order_id,
                    product_id = %product_id,
                    quantity = quantity,
                    "event: stock decrement failed; counts may drift"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_round_trip_through_the_channel() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);
        let order_id = Uuid::new_v4();

        sender.send(Event::OrderCreated(order_id)).await.unwrap();

        match rx.recv().await {
            Some(Event::OrderCreated(id)) => assert_eq!(id, order_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_after_receiver_drops() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender.send(Event::OrderCancelled(Uuid::new_v4())).await.is_err());
    }
}
