use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::OrderStatus;

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

    /// Publishes an event after a committed write. A closed or full channel
    /// is logged and otherwise ignored: the write already happened.
    pub async fn publish(&self, event: Event) {
        let kind = event.kind();
        if let Err(e) = self.send(event).await {
            warn!(event = kind, error = %e, "Dropping domain event");
        }
    }
}

/// Domain events emitted by the services once their transaction commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        tenant_id: Uuid,
        order_id: Uuid,
        order_number: i32,
        total: Decimal,
    },
    OrderUpdated {
        tenant_id: Uuid,
        order_id: Uuid,
        total: Decimal,
    },
    OrderDeleted {
        tenant_id: Uuid,
        order_id: Uuid,
        order_number: i32,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    StockAdjusted {
        product_id: Uuid,
        delta: i32,
        stock_after: i32,
    },
    ComboConfigured {
        product_id: Uuid,
        slot_count: usize,
    },
    ProductAvailabilityChanged {
        product_id: Uuid,
        is_active: bool,
    },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::OrderCreated { .. } => "order_created",
            Event::OrderUpdated { .. } => "order_updated",
            Event::OrderDeleted { .. } => "order_deleted",
            Event::OrderStatusChanged { .. } => "order_status_changed",
            Event::StockAdjusted { .. } => "stock_adjusted",
            Event::ComboConfigured { .. } => "combo_configured",
            Event::ProductAvailabilityChanged { .. } => "product_availability_changed",
        }
    }
}

// Handlers registered with the event loop. Failures are logged, never propagated.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: &Event) -> Result<(), String>;
}

/// Writes every event to the log with structured fields.
pub struct LoggingEventHandler;

#[async_trait]
impl EventHandler for LoggingEventHandler {
    async fn handle_event(&self, event: &Event) -> Result<(), String> {
        match event {
            Event::OrderCreated {
                tenant_id,
                order_id,
                order_number,
                total,
            } => {
                info!(%tenant_id, %order_id, order_number, %total, "Order created");
            }
            Event::OrderUpdated {
                tenant_id,
                order_id,
                total,
            } => {
                info!(%tenant_id, %order_id, %total, "Order updated");
            }
            Event::OrderDeleted {
                tenant_id,
                order_id,
                order_number,
            } => {
                info!(%tenant_id, %order_id, order_number, "Order deleted, stock restored");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(
                    %order_id,
                    old_status = %old_status.to_value(),
                    new_status = %new_status.to_value(),
                    "Order status changed"
                );
            }
            Event::StockAdjusted {
                product_id,
                delta,
                stock_after,
            } => {
                if *stock_after < 0 {
                    warn!(%product_id, delta, stock_after, "Stock went negative");
                } else {
                    info!(%product_id, delta, stock_after, "Stock adjusted");
                }
            }
            Event::ComboConfigured {
                product_id,
                slot_count,
            } => {
                info!(%product_id, slot_count, "Combo configuration replaced");
            }
            Event::ProductAvailabilityChanged {
                product_id,
                is_active,
            } => {
                info!(%product_id, is_active, "Product availability changed");
            }
        }
        Ok(())
    }
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(rx: mpsc::Receiver<Event>) {
    process_events_with(rx, vec![Box::new(LoggingEventHandler)]).await
}

pub async fn process_events_with(
    mut rx: mpsc::Receiver<Event>,
    handlers: Vec<Box<dyn EventHandler>>,
) {
    info!("Starting event processing loop");
    while let Some(event) = rx.recv().await {
        for handler in &handlers {
            if let Err(e) = handler.handle_event(&event).await {
                warn!(event = event.kind(), error = %e, "Event handler failed");
            }
        }
    }
    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recorder(Arc<Mutex<Vec<&'static str>>>);

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle_event(&self, event: &Event) -> Result<(), String> {
            self.0.lock().unwrap().push(event.kind());
            Ok(())
        }
    }

    #[tokio::test]
    async fn events_reach_every_handler_in_order() {
        let (tx, rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);
        let seen = Arc::new(Mutex::new(Vec::new()));

        sender
            .publish(Event::ProductAvailabilityChanged {
                product_id: Uuid::new_v4(),
                is_active: false,
            })
            .await;
        sender
            .publish(Event::ComboConfigured {
                product_id: Uuid::new_v4(),
                slot_count: 2,
            })
            .await;
        drop(sender);

        process_events_with(rx, vec![Box::new(Recorder(seen.clone()))]).await;
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["product_availability_changed", "combo_configured"]
        );
    }

    #[tokio::test]
    async fn publishing_to_a_closed_channel_does_not_fail() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        EventSender::new(tx)
            .publish(Event::OrderDeleted {
                tenant_id: Uuid::new_v4(),
                order_id: Uuid::new_v4(),
                order_number: 1,
            })
            .await;
    }
}
