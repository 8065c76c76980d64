//! Order service built on the saga kernel.
//!
//! Orders are created and cancelled through reversible commands. Payment and
//! inventory outcomes arrive as integration events, and the handlers in
//! [`handlers`] translate them into status updates, refunds and
//! cancellations inside a per-event scope.

pub mod commands;
pub mod error;
pub mod events;
pub mod handlers;
pub mod model;
pub mod publisher;
pub mod repository;
pub mod service;

pub use commands::{
    CancelOrder, CreateOrder, OrderCommandFactory, OrderCreation, RecordPayment, RefundPayment,
    UpdateOrderStatus,
};
pub use error::{OrderError, Result};
pub use events::{InventoryReservationFailed, PaymentCompleted, PaymentFailed};
pub use handlers::{
    InventoryReservationFailedHandler, PaymentCompletedHandler, PaymentFailedHandler,
    order_handlers,
};
pub use model::{Order, OrderItem, OrderStatus};
pub use publisher::{
    InMemoryEventPublisher, OrderEventPublisher, OrderIntegrationEvent, PublishedEvent,
};
pub use repository::{InMemoryOrderRepository, OrderRepository};
pub use service::OrderService;
