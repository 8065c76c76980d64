//! Saga event handlers for the order service.

use async_trait::async_trait;
use saga::{EventHandler, RegisteredHandler, ScopedInvoker};

use crate::commands::OrderCommandFactory;
use crate::error::OrderError;
use crate::events::{InventoryReservationFailed, PaymentCompleted, PaymentFailed};
use crate::model::OrderStatus;

/// Marks the order paid and records the payment.
///
/// Runs two commands, so a successful scope closes with two history entries:
/// `UpdateOrderStatus(Paid)` then `RecordPayment`. The second step stores the
/// payment id on the order; without it a later inventory failure finds no
/// payment and `RefundPayment` has nothing to refund.
///
/// If either step fails, the most recent successful step is undone and the
/// event is considered handled.
#[derive(Debug, Clone)]
pub struct PaymentCompletedHandler {
    factory: OrderCommandFactory,
}

impl PaymentCompletedHandler {
    pub fn new(factory: OrderCommandFactory) -> Self {
        Self { factory }
    }

    async fn apply(
        &self,
        event: &PaymentCompleted,
        invoker: &mut ScopedInvoker,
    ) -> Result<(), OrderError> {
        invoker
            .execute(self.factory.update_order_status(event.order_id, OrderStatus::Paid))
            .await?;
        invoker
            .execute(self.factory.record_payment(event.order_id, event.payment_id))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for PaymentCompletedHandler {
    type Event = PaymentCompleted;
    type Error = OrderError;

    fn variant(&self) -> &'static str {
        PaymentCompleted::VARIANT
    }

    async fn handle(
        &self,
        event: PaymentCompleted,
        invoker: &mut ScopedInvoker,
    ) -> Result<(), OrderError> {
        match self.apply(&event, invoker).await {
            Ok(()) => {
                tracing::info!(order_id = %event.order_id, amount = %event.amount, "payment completed");
            }
            Err(error) => {
                tracing::error!(order_id = %event.order_id, %error, "payment completion failed");
                invoker.undo_last().await;
            }
        }
        Ok(())
    }
}

/// Marks the order's payment as failed, then cancels the order.
#[derive(Debug, Clone)]
pub struct PaymentFailedHandler {
    factory: OrderCommandFactory,
}

impl PaymentFailedHandler {
    pub fn new(factory: OrderCommandFactory) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl EventHandler for PaymentFailedHandler {
    type Event = PaymentFailed;
    type Error = OrderError;

    fn variant(&self) -> &'static str {
        PaymentFailed::VARIANT
    }

    async fn handle(&self, event: PaymentFailed, invoker: &mut ScopedInvoker) -> Result<(), OrderError> {
        let order_id = event.order_id;
        let result = async {
            invoker
                .execute(self.factory.update_order_status(order_id, OrderStatus::PaymentFailed))
                .await?;
            invoker.execute(self.factory.cancel_order(order_id)).await?;
            Ok::<_, OrderError>(())
        }
        .await;

        match &result {
            Ok(()) => tracing::info!(
                %order_id,
                reason = %event.reason,
                steps = ?invoker.history(),
                "payment failure compensated"
            ),
            Err(error) => tracing::error!(%order_id, %error, "payment failure handling failed"),
        }
        result
    }
}

/// Marks the order's inventory as failed, requests a refund and cancels the order.
#[derive(Debug, Clone)]
pub struct InventoryReservationFailedHandler {
    factory: OrderCommandFactory,
}

impl InventoryReservationFailedHandler {
    pub fn new(factory: OrderCommandFactory) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl EventHandler for InventoryReservationFailedHandler {
    type Event = InventoryReservationFailed;
    type Error = OrderError;

    fn variant(&self) -> &'static str {
        InventoryReservationFailed::VARIANT
    }

    async fn handle(
        &self,
        event: InventoryReservationFailed,
        invoker: &mut ScopedInvoker,
    ) -> Result<(), OrderError> {
        let order_id = event.order_id;
        let result = async {
            invoker
                .execute(self.factory.update_order_status(order_id, OrderStatus::InventoryFailed))
                .await?;
            let refunded = invoker.execute(self.factory.refund_payment(order_id)).await?;
            invoker.execute(self.factory.cancel_order(order_id)).await?;
            Ok::<_, OrderError>(refunded)
        }
        .await;

        match result {
            Ok(refunded) => {
                tracing::info!(
                    %order_id,
                    reason = %event.reason,
                    refunded,
                    steps = ?invoker.history(),
                    "inventory failure compensated"
                );
                Ok(())
            }
            Err(error) => {
                tracing::error!(%order_id, %error, "inventory failure handling failed");
                Err(error)
            }
        }
    }
}

/// Returns the order service's handlers, ready for orchestrator startup.
pub fn order_handlers(factory: &OrderCommandFactory) -> Vec<RegisteredHandler> {
    vec![
        RegisteredHandler::new(PaymentCompletedHandler::new(factory.clone())),
        RegisteredHandler::new(PaymentFailedHandler::new(factory.clone())),
        RegisteredHandler::new(InventoryReservationFailedHandler::new(factory.clone())),
    ]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use common::{CustomerId, Money, OrderId, PaymentId};

    use super::*;
    use crate::model::Order;
    use crate::publisher::InMemoryEventPublisher;
    use crate::repository::{InMemoryOrderRepository, OrderRepository};

    fn fixture() -> (InMemoryOrderRepository, InMemoryEventPublisher, OrderCommandFactory) {
        let repository = InMemoryOrderRepository::new();
        let publisher = InMemoryEventPublisher::new();
        let factory =
            OrderCommandFactory::new(Arc::new(repository.clone()), Arc::new(publisher.clone()));
        (repository, publisher, factory)
    }

    async fn seed(repository: &InMemoryOrderRepository) -> OrderId {
        let order = Order::create(OrderId::new(), CustomerId::new(), vec![]);
        repository.save(order).await.unwrap().id()
    }

    #[tokio::test]
    async fn test_payment_completed_records_payment() {
        let (repository, _, factory) = fixture();
        let order_id = seed(&repository).await;
        let payment_id = PaymentId::new();
        let mut invoker = ScopedInvoker::new();

        PaymentCompletedHandler::new(factory)
            .handle(
                PaymentCompleted {
                    order_id,
                    payment_id,
                    amount: Money::new(30_000),
                },
                &mut invoker,
            )
            .await
            .unwrap();

        let order = repository.find_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Paid);
        assert_eq!(order.payment_id(), Some(payment_id));
        assert_eq!(invoker.history(), vec!["UpdateOrderStatus", "RecordPayment"]);
    }

    #[tokio::test]
    async fn test_payment_completed_for_missing_order_is_swallowed() {
        let (_, _, factory) = fixture();
        let mut invoker = ScopedInvoker::new();

        let result = PaymentCompletedHandler::new(factory)
            .handle(
                PaymentCompleted {
                    order_id: OrderId::new(),
                    payment_id: PaymentId::new(),
                    amount: Money::new(30_000),
                },
                &mut invoker,
            )
            .await;

        assert!(result.is_ok());
        assert!(invoker.is_empty());
    }

    /// Fails only the `fail_on`-th save made through it.
    struct FailNthSave {
        inner: InMemoryOrderRepository,
        attempts: AtomicUsize,
        fail_on: usize,
    }

    #[async_trait]
    impl OrderRepository for FailNthSave {
        async fn save(&self, order: Order) -> crate::error::Result<Order> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
                return Err(OrderError::Repository("disk full".to_string()));
            }
            self.inner.save(order).await
        }

        async fn find_by_id(&self, id: OrderId) -> crate::error::Result<Option<Order>> {
            self.inner.find_by_id(id).await
        }
    }

    #[tokio::test]
    async fn test_payment_completed_undoes_status_when_recording_fails() {
        let repository = InMemoryOrderRepository::new();
        let order_id = seed(&repository).await;
        let failing = Arc::new(FailNthSave {
            inner: repository.clone(),
            attempts: AtomicUsize::new(0),
            fail_on: 2,
        });
        let factory = OrderCommandFactory::new(failing, Arc::new(InMemoryEventPublisher::new()));
        let mut invoker = ScopedInvoker::new();

        let result = PaymentCompletedHandler::new(factory)
            .handle(
                PaymentCompleted {
                    order_id,
                    payment_id: PaymentId::new(),
                    amount: Money::new(30_000),
                },
                &mut invoker,
            )
            .await;

        assert!(result.is_ok());
        assert!(invoker.is_empty());
        let order = repository.find_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Created);
        assert_eq!(order.payment_id(), None);
    }

    #[tokio::test]
    async fn test_payment_failed_returns_error_for_cancelled_order() {
        let (repository, _, factory) = fixture();
        let order_id = seed(&repository).await;
        let mut order = repository.find_by_id(order_id).await.unwrap().unwrap();
        order.cancel().unwrap();
        repository.save(order).await.unwrap();
        let mut invoker = ScopedInvoker::new();

        let result = PaymentFailedHandler::new(factory)
            .handle(
                PaymentFailed {
                    order_id,
                    reason: "insufficient funds".to_string(),
                },
                &mut invoker,
            )
            .await;

        assert!(matches!(result, Err(OrderError::InvalidTransition { .. })));
        assert!(invoker.is_empty());
    }

    #[test]
    fn test_order_handlers_cover_each_variant_once() {
        let (_, _, factory) = fixture();
        let mut variants: Vec<_> = order_handlers(&factory)
            .iter()
            .map(RegisteredHandler::variant)
            .collect();
        variants.sort_unstable();
        assert_eq!(
            variants,
            vec!["InventoryReservationFailed", "PaymentCompleted", "PaymentFailed"]
        );
    }
}
