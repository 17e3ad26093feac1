use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::entities::order::OrderStatus;

/// Domain events emitted by services after their transaction commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    CustomerRegistered(String),

    CategoryCreated(String),
    CategoryDeleted(String),
    ProductCreated(String),
    ProductUpdated(String),
    ProductDeactivated(String),
    ReviewCreated { product_id: String, review_id: String },

    CartItemAdded { cart_id: String, product_id: String },
    CartItemUpdated { cart_id: String, detail_id: String },
    CartItemRemoved { cart_id: String, detail_id: String },
    CartCleared(String),

    OrderCreated { order_id: String, total: Decimal },
    OrderStatusChanged {
        order_id: String,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    OrderCancelled(String),

    PaymentSessionCreated { order_id: String, app_trans_id: String },
    PaymentConfirmed { order_id: String, zp_trans_id: Option<String> },
    PaymentFailed { order_id: String, reason: String },

    PromotionCreated { event_id: String, discount_percent: i32 },
    StoreSettingsUpdated(String),
    NotificationFannedOut { notification_id: String, recipients: usize },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, failing if the processing loop has gone away.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event; a closed or full channel is logged and otherwise ignored
    /// since the write that produced the event has already committed.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(err) = self.sender.try_send(event) {
            warn!(error = %err, "Dropping domain event");
        }
    }
}

/// Creates a bounded event channel.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender::new(tx), rx)
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderCreated { order_id, total } => {
                info!(order_id = %order_id, total = %total, "Order created");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(
                    order_id = %order_id,
                    from = %old_status,
                    to = %new_status,
                    "Order status changed"
                );
            }
            Event::PaymentConfirmed {
                order_id,
                zp_trans_id,
            } => {
                info!(order_id = %order_id, zp_trans_id = ?zp_trans_id, "Payment confirmed");
            }
            Event::PaymentFailed { order_id, reason } => {
                warn!(order_id = %order_id, reason = %reason, "Payment failed");
            }
            Event::NotificationFannedOut {
                notification_id,
                recipients,
            } => {
                debug!(notification_id = %notification_id, recipients, "Notification delivered");
            }
            other => {
                debug!(event = ?other, "Domain event");
            }
        }
    }

    warn!("Event processing loop has ended");
}
