//! Saga coordination kernel.
//!
//! Events arriving from an external bus are routed to the one handler
//! registered for their variant. Each event is processed inside its own
//! [`ScopedInvoker`], which runs reversible [`Command`]s and keeps a LIFO
//! history so the handler can compensate with `undo_last` / `undo_all`.
//!
//! The orchestrator guarantees that the scope is closed on every exit path.
//! It never compensates on a handler's behalf: closing a scope discards its
//! history without calling `undo`.

pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod handler;
pub mod invoker;
pub mod orchestrator;
pub mod processor;
pub mod registry;

#[cfg(test)]
mod testing;

pub use command::Command;
pub use config::ProcessorConfig;
pub use error::{BoxError, CloseError, Result, SagaError};
pub use event::{AsAny, Event, VariantKey};
pub use handler::{EventHandler, RegisteredHandler};
pub use invoker::{ScopedInvoker, UndoReport};
pub use orchestrator::{DispatchOutcome, DispatchReport, SagaOrchestrator};
pub use processor::{EventProcessor, EventReceiver, EventSender, ProcessorStats, SagaEventProcessor};
pub use registry::HandlerRegistry;
