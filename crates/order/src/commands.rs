//! Reversible order commands and the factory that binds them to collaborators.
//!
//! Undo re-loads the order and applies a hand-written inverse. It restores
//! the statuses listed on each command and leaves any other prior status
//! untouched, so an undone command does not always reproduce the exact
//! pre-execute state.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CustomerId, OrderId, PaymentId};
use saga::Command;

use crate::error::{OrderError, Result};
use crate::model::{Order, OrderItem, OrderStatus};
use crate::publisher::{OrderEventPublisher, OrderIntegrationEvent};
use crate::repository::OrderRepository;

async fn load(repository: &dyn OrderRepository, order_id: OrderId) -> Result<Order> {
    repository
        .find_by_id(order_id)
        .await?
        .ok_or(OrderError::NotFound(order_id))
}

/// Input for [`CreateOrder`].
#[derive(Debug, Clone)]
pub struct OrderCreation {
    pub customer_id: CustomerId,
    pub items: Vec<OrderItem>,
}

/// Creates and stores a new order, then publishes `OrderCreated`.
///
/// Undo cancels the order and publishes `OrderCancelled`.
pub struct CreateOrder {
    request: OrderCreation,
    repository: Arc<dyn OrderRepository>,
    publisher: Arc<dyn OrderEventPublisher>,
    order_id: Option<OrderId>,
}

#[async_trait]
impl Command for CreateOrder {
    type Output = Order;
    type Error = OrderError;

    async fn execute(&mut self) -> Result<Order> {
        let order_id = OrderId::new();
        let order = Order::create(order_id, self.request.customer_id, self.request.items.clone());
        let saved = self.repository.save(order).await?;
        self.order_id = Some(order_id);

        self.publisher.publish(
            &order_id.to_string(),
            OrderIntegrationEvent::OrderCreated {
                order_id,
                customer_id: saved.customer_id(),
            },
        );

        tracing::info!(%order_id, total = %saved.total_amount(), "order created");
        Ok(saved)
    }

    async fn undo(&mut self) -> Result<()> {
        let Some(order_id) = self.order_id else {
            return Ok(());
        };
        let Some(mut order) = self.repository.find_by_id(order_id).await? else {
            return Ok(());
        };

        order.cancel()?;
        self.repository.save(order).await?;
        self.publisher.publish(
            &order_id.to_string(),
            OrderIntegrationEvent::OrderCancelled { order_id },
        );

        tracing::info!(%order_id, "order creation undone");
        Ok(())
    }
}

/// Moves an order to `Paid`, `PaymentFailed` or `InventoryFailed`.
///
/// Undo restores a previous status of `Created` or `Paid`.
pub struct UpdateOrderStatus {
    order_id: OrderId,
    new_status: OrderStatus,
    repository: Arc<dyn OrderRepository>,
    previous_status: Option<OrderStatus>,
}

#[async_trait]
impl Command for UpdateOrderStatus {
    type Output = Order;
    type Error = OrderError;

    async fn execute(&mut self) -> Result<Order> {
        let transition: fn(&mut Order) -> Result<()> = match self.new_status {
            OrderStatus::Paid => Order::mark_as_paid,
            OrderStatus::PaymentFailed => Order::mark_as_payment_failed,
            OrderStatus::InventoryFailed => Order::mark_as_inventory_failed,
            other => return Err(OrderError::UnsupportedStatus(other)),
        };

        let mut order = load(self.repository.as_ref(), self.order_id).await?;
        let previous = order.status();
        transition(&mut order)?;

        let saved = self.repository.save(order).await?;
        self.previous_status = Some(previous);

        tracing::info!(
            order_id = %self.order_id,
            from = %previous,
            to = %self.new_status,
            "order status updated"
        );
        Ok(saved)
    }

    async fn undo(&mut self) -> Result<()> {
        let Some(previous) = self.previous_status else {
            return Ok(());
        };
        let mut order = load(self.repository.as_ref(), self.order_id).await?;

        match previous {
            OrderStatus::Created => order.mark_as_created(),
            OrderStatus::Paid => order.mark_as_paid()?,
            _ => {}
        }

        let current = order.status();
        self.repository.save(order).await?;
        tracing::info!(
            order_id = %self.order_id,
            restored = %previous,
            status = %current,
            "order status update undone"
        );
        Ok(())
    }
}

/// Cancels an order and publishes `OrderCancelled`.
///
/// Undo restores a previous status of `Created`, `Paid` or `InventoryReserved`.
pub struct CancelOrder {
    order_id: OrderId,
    repository: Arc<dyn OrderRepository>,
    publisher: Arc<dyn OrderEventPublisher>,
    previous_status: Option<OrderStatus>,
}

#[async_trait]
impl Command for CancelOrder {
    type Output = Order;
    type Error = OrderError;

    async fn execute(&mut self) -> Result<Order> {
        let mut order = load(self.repository.as_ref(), self.order_id).await?;
        let previous = order.status();

        order.cancel()?;
        let saved = self.repository.save(order).await?;
        self.previous_status = Some(previous);

        self.publisher.publish(
            &self.order_id.to_string(),
            OrderIntegrationEvent::OrderCancelled {
                order_id: self.order_id,
            },
        );

        tracing::info!(order_id = %self.order_id, from = %previous, "order cancelled");
        Ok(saved)
    }

    async fn undo(&mut self) -> Result<()> {
        let Some(previous) = self.previous_status else {
            return Ok(());
        };
        let mut order = load(self.repository.as_ref(), self.order_id).await?;

        // A cancelled order only accepts `mark_as_created`, so reopen it first.
        match previous {
            OrderStatus::Created => order.mark_as_created(),
            OrderStatus::Paid => {
                order.mark_as_created();
                order.mark_as_paid()?;
            }
            OrderStatus::InventoryReserved => {
                order.mark_as_created();
                order.mark_as_inventory_reserved()?;
            }
            _ => {}
        }

        self.repository.save(order).await?;
        tracing::info!(order_id = %self.order_id, restored = %previous, "order cancellation undone");
        Ok(())
    }
}

/// Requests a refund for the order's payment.
///
/// Returns `true` when a `PaymentRefundRequested` event was published and
/// `false` when the order has no recorded payment. Undo cannot recall a
/// refund request and only logs that manual handling is needed.
pub struct RefundPayment {
    order_id: OrderId,
    repository: Arc<dyn OrderRepository>,
    publisher: Arc<dyn OrderEventPublisher>,
}

#[async_trait]
impl Command for RefundPayment {
    type Output = bool;
    type Error = OrderError;

    async fn execute(&mut self) -> Result<bool> {
        let order = load(self.repository.as_ref(), self.order_id).await?;

        let Some(payment_id) = order.payment_id() else {
            tracing::warn!(order_id = %self.order_id, "no payment to refund");
            return Ok(false);
        };

        self.publisher.publish(
            &self.order_id.to_string(),
            OrderIntegrationEvent::PaymentRefundRequested {
                order_id: self.order_id,
                payment_id,
                refunded_at: Utc::now(),
            },
        );

        tracing::info!(order_id = %self.order_id, %payment_id, "payment refund requested");
        Ok(true)
    }

    async fn undo(&mut self) -> Result<()> {
        tracing::warn!(
            order_id = %self.order_id,
            "refund request cannot be recalled, manual intervention required"
        );
        Ok(())
    }
}

/// Records the payment that settled an order.
///
/// Undo restores the previously recorded payment id, if any.
pub struct RecordPayment {
    order_id: OrderId,
    payment_id: PaymentId,
    repository: Arc<dyn OrderRepository>,
    previous_payment_id: Option<Option<PaymentId>>,
}

#[async_trait]
impl Command for RecordPayment {
    type Output = Order;
    type Error = OrderError;

    async fn execute(&mut self) -> Result<Order> {
        let mut order = load(self.repository.as_ref(), self.order_id).await?;
        let previous = order.payment_id();

        order.update_payment_id(Some(self.payment_id));
        let saved = self.repository.save(order).await?;
        self.previous_payment_id = Some(previous);

        tracing::info!(order_id = %self.order_id, payment_id = %self.payment_id, "payment recorded");
        Ok(saved)
    }

    async fn undo(&mut self) -> Result<()> {
        let Some(previous) = self.previous_payment_id else {
            return Ok(());
        };
        let mut order = load(self.repository.as_ref(), self.order_id).await?;
        order.update_payment_id(previous);
        self.repository.save(order).await?;
        tracing::info!(order_id = %self.order_id, "payment record undone");
        Ok(())
    }
}

/// Builds order commands bound to the repository and publisher.
#[derive(Clone)]
pub struct OrderCommandFactory {
    repository: Arc<dyn OrderRepository>,
    publisher: Arc<dyn OrderEventPublisher>,
}

impl OrderCommandFactory {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        publisher: Arc<dyn OrderEventPublisher>,
    ) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    /// Returns the repository commands are bound to.
    pub fn repository(&self) -> &Arc<dyn OrderRepository> {
        &self.repository
    }

    pub fn create_order(&self, request: OrderCreation) -> CreateOrder {
        CreateOrder {
            request,
            repository: Arc::clone(&self.repository),
            publisher: Arc::clone(&self.publisher),
            order_id: None,
        }
    }

    pub fn update_order_status(&self, order_id: OrderId, new_status: OrderStatus) -> UpdateOrderStatus {
        UpdateOrderStatus {
            order_id,
            new_status,
            repository: Arc::clone(&self.repository),
            previous_status: None,
        }
    }

    pub fn cancel_order(&self, order_id: OrderId) -> CancelOrder {
        CancelOrder {
            order_id,
            repository: Arc::clone(&self.repository),
            publisher: Arc::clone(&self.publisher),
            previous_status: None,
        }
    }

    pub fn refund_payment(&self, order_id: OrderId) -> RefundPayment {
        RefundPayment {
            order_id,
            repository: Arc::clone(&self.repository),
            publisher: Arc::clone(&self.publisher),
        }
    }

    pub fn record_payment(&self, order_id: OrderId, payment_id: PaymentId) -> RecordPayment {
        RecordPayment {
            order_id,
            payment_id,
            repository: Arc::clone(&self.repository),
            previous_payment_id: None,
        }
    }
}

impl std::fmt::Debug for OrderCommandFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderCommandFactory").finish_non_exhaustive()
    }
}
