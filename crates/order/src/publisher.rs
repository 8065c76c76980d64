//! Outgoing integration events and their publisher.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId, PaymentId};
use serde::{Deserialize, Serialize};

/// Events the order service publishes to other services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OrderIntegrationEvent {
    OrderCreated {
        order_id: OrderId,
        customer_id: CustomerId,
    },
    OrderCancelled {
        order_id: OrderId,
    },
    PaymentRefundRequested {
        order_id: OrderId,
        payment_id: PaymentId,
        refunded_at: DateTime<Utc>,
    },
}

impl OrderIntegrationEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderIntegrationEvent::OrderCreated { .. } => "OrderCreated",
            OrderIntegrationEvent::OrderCancelled { .. } => "OrderCancelled",
            OrderIntegrationEvent::PaymentRefundRequested { .. } => "PaymentRefundRequested",
        }
    }

    /// Returns the order the event concerns.
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderIntegrationEvent::OrderCreated { order_id, .. }
            | OrderIntegrationEvent::OrderCancelled { order_id }
            | OrderIntegrationEvent::PaymentRefundRequested { order_id, .. } => *order_id,
        }
    }
}

/// Publishes integration events keyed by order id.
///
/// Publishing is fire-and-forget: delivery failures are the transport's
/// concern and never fail the command that published.
pub trait OrderEventPublisher: Send + Sync {
    fn publish(&self, key: &str, event: OrderIntegrationEvent);
}

/// A published event together with its partition key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedEvent {
    pub key: String,
    pub event: OrderIntegrationEvent,
}

/// Publisher that records events in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventPublisher {
    published: Arc<RwLock<Vec<PublishedEvent>>>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every published event, oldest first.
    pub fn published(&self) -> Vec<PublishedEvent> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the type names of published events, oldest first.
    pub fn event_types(&self) -> Vec<&'static str> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|p| p.event.event_type())
            .collect()
    }
}

impl OrderEventPublisher for InMemoryEventPublisher {
    fn publish(&self, key: &str, event: OrderIntegrationEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => tracing::debug!(key, %payload, "integration event published"),
            Err(error) => tracing::warn!(key, %error, "integration event not serializable"),
        }
        metrics::counter!("order_events_published_total", "type" => event.event_type())
            .increment(1);

        self.published
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PublishedEvent {
                key: key.to_string(),
                event,
            });
    }
}
