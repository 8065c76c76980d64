//! Event handlers and their type-erased registration form.

use std::sync::Arc;

use async_trait::async_trait;

use crate::command::short_type_name;
use crate::error::{Result, SagaError};
use crate::event::Event;
use crate::invoker::ScopedInvoker;

/// Reacts to one event variant by issuing commands through a scoped invoker.
///
/// A handler owns compensation: the orchestrator never undoes anything on
/// its behalf. Call [`ScopedInvoker::undo_last`] or
/// [`ScopedInvoker::undo_all`] when a partial sequence must be rolled back.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// The concrete event type this handler accepts.
    type Event: Event;

    /// Error returned when handling fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Variant key of [`Self::Event`].
    fn variant(&self) -> &'static str;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        short_type_name::<Self>()
    }

    /// Handles one event inside the given scope.
    async fn handle(
        &self,
        event: Self::Event,
        invoker: &mut ScopedInvoker,
    ) -> std::result::Result<(), Self::Error>;
}

#[async_trait]
trait DynEventHandler: Send + Sync {
    fn variant(&self) -> &'static str;

    fn name(&self) -> &'static str;

    async fn dispatch(&self, event: Box<dyn Event>, invoker: &mut ScopedInvoker) -> Result<()>;
}

struct Erased<H>(H);

#[async_trait]
impl<H: EventHandler> DynEventHandler for Erased<H> {
    fn variant(&self) -> &'static str {
        self.0.variant()
    }

    fn name(&self) -> &'static str {
        self.0.name()
    }

    async fn dispatch(&self, event: Box<dyn Event>, invoker: &mut ScopedInvoker) -> Result<()> {
        let variant = event.variant();
        let event = event
            .into_any()
            .downcast::<H::Event>()
            .map_err(|_| SagaError::EventTypeMismatch {
                variant,
                handler: self.0.name(),
            })?;

        self.0
            .handle(*event, invoker)
            .await
            .map_err(|error| SagaError::Handler {
                variant,
                source: Box::new(error),
            })
    }
}

/// A handler ready to be stored in a [`HandlerRegistry`](crate::HandlerRegistry).
#[derive(Clone)]
pub struct RegisteredHandler(Arc<dyn DynEventHandler>);

impl RegisteredHandler {
    /// Erases the event type of `handler`.
    pub fn new<H: EventHandler>(handler: H) -> Self {
        Self(Arc::new(Erased(handler)))
    }

    /// Variant key declared by the handler.
    pub fn variant(&self) -> &'static str {
        self.0.variant()
    }

    /// Name of the wrapped handler.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    pub(crate) async fn dispatch(
        &self,
        event: Box<dyn Event>,
        invoker: &mut ScopedInvoker,
    ) -> Result<()> {
        self.0.dispatch(event, invoker).await
    }
}

impl std::fmt::Debug for RegisteredHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredHandler")
            .field("variant", &self.variant())
            .field("name", &self.name())
            .finish()
    }
}
