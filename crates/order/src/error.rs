//! Order error types.

use common::OrderId;
use thiserror::Error;

use crate::model::OrderStatus;

/// Errors that can occur in order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No order exists with the given id.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// The order's current status does not allow the requested change.
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidTransition {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// The status update command does not support this target status.
    #[error("Unsupported target status: {0}")]
    UnsupportedStatus(OrderStatus),

    /// The order repository failed.
    #[error("Repository error: {0}")]
    Repository(String),
}

/// Result type for order operations.
pub type Result<T> = std::result::Result<T, OrderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_message_names_both_statuses() {
        let err = OrderError::InvalidTransition {
            order_id: OrderId::new(),
            from: OrderStatus::Cancelled,
            to: OrderStatus::Paid,
        };
        let message = err.to_string();
        assert!(message.contains("CANCELLED"));
        assert!(message.contains("PAID"));
    }
}
