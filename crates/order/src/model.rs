//! Order aggregate and its status lifecycle.
//!
//! ```text
//! Created ──► Paid ──► InventoryReserved ──► ... ──► Completed
//!    │          │              │
//!    ├──► PaymentFailed   InventoryFailed
//!    └──────────┴──────────────┴──────────────────► Cancelled
//! ```
//!
//! Any status other than `Completed` may be cancelled. A cancelled order
//! rejects every further transition except `mark_as_created`, which undo
//! paths use to restore a prior state.

use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId, PaymentId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{OrderError, Result};

/// The status of an order in the saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Created,
    Paid,
    PaymentFailed,
    InventoryReserved,
    InventoryFailed,
    PointsApplied,
    PointsFailed,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Returns the status name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Paid => "PAID",
            OrderStatus::PaymentFailed => "PAYMENT_FAILED",
            OrderStatus::InventoryReserved => "INVENTORY_RESERVED",
            OrderStatus::InventoryFailed => "INVENTORY_FAILED",
            OrderStatus::PointsApplied => "POINTS_APPLIED",
            OrderStatus::PointsFailed => "POINTS_FAILED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line item in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub quantity: u32,
    pub price: Money,
}

impl OrderItem {
    /// Creates a new line item.
    pub fn new(product_id: Uuid, quantity: u32, price: Money) -> Self {
        Self {
            product_id,
            quantity,
            price,
        }
    }

    /// Returns price times quantity.
    pub fn subtotal(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// An order as stored by the order repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    customer_id: CustomerId,
    status: OrderStatus,
    payment_id: Option<PaymentId>,
    applied_points: Option<u32>,
    items: Vec<OrderItem>,
    total_amount: Money,
    created_at: DateTime<Utc>,
}

impl Order {
    /// Creates an order in `Created` status with its total computed from the items.
    pub fn create(id: OrderId, customer_id: CustomerId, items: Vec<OrderItem>) -> Self {
        let total_amount = items.iter().map(OrderItem::subtotal).sum();
        Self {
            id,
            customer_id,
            status: OrderStatus::Created,
            payment_id: None,
            applied_points: None,
            items,
            total_amount,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_id(&self) -> Option<PaymentId> {
        self.payment_id
    }

    pub fn applied_points(&self) -> Option<u32> {
        self.applied_points
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn mark_as_paid(&mut self) -> Result<()> {
        self.transition(OrderStatus::Paid)
    }

    pub fn mark_as_payment_failed(&mut self) -> Result<()> {
        self.transition(OrderStatus::PaymentFailed)
    }

    pub fn mark_as_inventory_reserved(&mut self) -> Result<()> {
        self.transition(OrderStatus::InventoryReserved)
    }

    pub fn mark_as_inventory_failed(&mut self) -> Result<()> {
        self.transition(OrderStatus::InventoryFailed)
    }

    /// Resets the status to `Created` regardless of the current status.
    pub fn mark_as_created(&mut self) {
        self.status = OrderStatus::Created;
    }

    /// Cancels the order. A completed order cannot be cancelled.
    pub fn cancel(&mut self) -> Result<()> {
        if self.status == OrderStatus::Completed {
            return Err(self.invalid(OrderStatus::Cancelled));
        }
        self.status = OrderStatus::Cancelled;
        Ok(())
    }

    pub fn update_payment_id(&mut self, payment_id: Option<PaymentId>) {
        self.payment_id = payment_id;
    }

    pub fn apply_points(&mut self, points: u32) {
        self.applied_points = Some(points);
    }

    pub fn remove_points(&mut self) {
        self.applied_points = None;
    }

    fn transition(&mut self, to: OrderStatus) -> Result<()> {
        if self.status == OrderStatus::Cancelled {
            return Err(self.invalid(to));
        }
        self.status = to;
        Ok(())
    }

    fn invalid(&self, to: OrderStatus) -> OrderError {
        OrderError::InvalidTransition {
            order_id: self.id,
            from: self.status,
            to,
        }
    }
}
