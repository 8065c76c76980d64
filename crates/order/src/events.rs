//! Integration events the order saga reacts to.

use common::{Money, OrderId, PaymentId};
use saga::Event;
use serde::{Deserialize, Serialize};

/// A payment for the order was captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCompleted {
    pub order_id: OrderId,
    pub payment_id: PaymentId,
    pub amount: Money,
}

impl PaymentCompleted {
    pub const VARIANT: &'static str = "PaymentCompleted";
}

impl Event for PaymentCompleted {
    fn variant(&self) -> &'static str {
        Self::VARIANT
    }
}

/// The payment for the order was declined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailed {
    pub order_id: OrderId,
    pub reason: String,
}

impl PaymentFailed {
    pub const VARIANT: &'static str = "PaymentFailed";
}

impl Event for PaymentFailed {
    fn variant(&self) -> &'static str {
        Self::VARIANT
    }
}

/// Inventory could not be reserved for the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryReservationFailed {
    pub order_id: OrderId,
    pub reason: String,
}

impl InventoryReservationFailed {
    pub const VARIANT: &'static str = "InventoryReservationFailed";
}

impl Event for InventoryReservationFailed {
    fn variant(&self) -> &'static str {
        Self::VARIANT
    }
}

#[cfg(test)]
mod tests {
    use saga::VariantKey;

    use super::*;

    #[test]
    fn test_variant_keys_are_valid_and_distinct() {
        let order_id = OrderId::new();
        let events: Vec<Box<dyn Event>> = vec![
            Box::new(PaymentCompleted {
                order_id,
                payment_id: PaymentId::new(),
                amount: Money::new(30_000),
            }),
            Box::new(PaymentFailed {
                order_id,
                reason: "insufficient funds".to_string(),
            }),
            Box::new(InventoryReservationFailed {
                order_id,
                reason: "out of stock".to_string(),
            }),
        ];

        let keys: Vec<_> = events
            .iter()
            .map(|e| VariantKey::of(e.as_ref()).unwrap().as_str())
            .collect();
        assert_eq!(
            keys,
            vec!["PaymentCompleted", "PaymentFailed", "InventoryReservationFailed"]
        );
    }

    #[test]
    fn test_payment_completed_deserializes() {
        let order_id = OrderId::new();
        let payment_id = PaymentId::new();
        let json = format!(
            r#"{{"order_id":"{order_id}","payment_id":"{payment_id}","amount":30000}}"#
        );

        let event: PaymentCompleted = serde_json::from_str(&json).unwrap();
        assert_eq!(event.order_id, order_id);
        assert_eq!(event.amount, Money::new(30_000));
    }
}
