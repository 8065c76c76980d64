//! Order repository trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use common::OrderId;

use crate::error::{OrderError, Result};
use crate::model::Order;

/// Storage for orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts or replaces an order and returns the stored copy.
    async fn save(&self, order: Order) -> Result<Order>;

    /// Loads an order by id.
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>>;
}

#[derive(Debug, Default)]
struct InMemoryOrderState {
    orders: HashMap<OrderId, Order>,
    saves: usize,
    fail_on_save: bool,
}

/// In-memory order repository for tests and the demo worker.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderRepository {
    state: Arc<RwLock<InMemoryOrderState>>,
}

impl InMemoryOrderRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the repository to fail every save call.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_on_save = fail;
    }

    /// Returns the number of successful saves.
    pub fn save_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .saves
    }

    /// Returns the number of stored orders.
    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .orders
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: Order) -> Result<Order> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if state.fail_on_save {
            return Err(OrderError::Repository("order store unavailable".to_string()));
        }

        state.saves += 1;
        state.orders.insert(order.id(), order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .orders
            .get(&id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use common::CustomerId;

    use super::*;
    use crate::model::OrderStatus;

    #[tokio::test]
    async fn test_save_and_find() {
        let repo = InMemoryOrderRepository::new();
        let order = Order::create(OrderId::new(), CustomerId::new(), vec![]);
        let id = order.id();

        repo.save(order).await.unwrap();

        let found = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.status(), OrderStatus::Created);
        assert_eq!(repo.save_count(), 1);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_save_replaces_existing() {
        let repo = InMemoryOrderRepository::new();
        let mut order = Order::create(OrderId::new(), CustomerId::new(), vec![]);
        repo.save(order.clone()).await.unwrap();

        order.mark_as_paid().unwrap();
        repo.save(order.clone()).await.unwrap();

        let found = repo.find_by_id(order.id()).await.unwrap().unwrap();
        assert_eq!(found.status(), OrderStatus::Paid);
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.save_count(), 2);
    }

    #[tokio::test]
    async fn test_find_missing_returns_none() {
        let repo = InMemoryOrderRepository::new();
        assert!(repo.find_by_id(OrderId::new()).await.unwrap().is_none());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_fail_on_save() {
        let repo = InMemoryOrderRepository::new();
        repo.set_fail_on_save(true);

        let order = Order::create(OrderId::new(), CustomerId::new(), vec![]);
        let result = repo.save(order).await;

        assert!(matches!(result, Err(OrderError::Repository(_))));
        assert_eq!(repo.save_count(), 0);
        assert!(repo.is_empty());
    }
}
