//! Shared identifier and value types for the order saga workspace.

mod types;

pub use types::{CustomerId, Money, OrderId, PaymentId};
