//! Order application service.

use std::sync::Arc;

use common::OrderId;
use saga::{Command, ScopedInvoker};

use crate::commands::{OrderCommandFactory, OrderCreation};
use crate::error::{OrderError, Result};
use crate::model::Order;
use crate::repository::OrderRepository;

/// Entry point for order requests that do not arrive as saga events.
///
/// Every mutating call runs its command in a scope of its own, which is
/// closed before the call returns.
#[derive(Debug, Clone)]
pub struct OrderService {
    factory: OrderCommandFactory,
}

impl OrderService {
    pub fn new(factory: OrderCommandFactory) -> Self {
        Self { factory }
    }

    fn repository(&self) -> &Arc<dyn OrderRepository> {
        self.factory.repository()
    }

    /// Creates an order.
    #[tracing::instrument(skip_all, fields(customer_id = %request.customer_id, items = request.items.len()))]
    pub async fn create_order(&self, request: OrderCreation) -> Result<Order> {
        let order = run_scoped(self.factory.create_order(request))
            .await
            .inspect_err(|error| tracing::error!(%error, "order creation failed"))?;
        tracing::info!(order_id = %order.id(), "order creation succeeded");
        Ok(order)
    }

    /// Cancels an order.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<Order> {
        let order = run_scoped(self.factory.cancel_order(order_id))
            .await
            .inspect_err(|error| tracing::error!(%error, "order cancellation failed"))?;
        tracing::info!("order cancellation succeeded");
        Ok(order)
    }

    /// Loads an order.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.repository()
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!("order not found");
                OrderError::NotFound(order_id)
            })
    }
}

async fn run_scoped<C>(command: C) -> std::result::Result<C::Output, C::Error>
where
    C: Command,
{
    let mut invoker = ScopedInvoker::new();
    let result = invoker.execute(command).await;
    if let Err(error) = invoker.close() {
        tracing::warn!(%error, "failed to close command scope");
    }
    result
}
