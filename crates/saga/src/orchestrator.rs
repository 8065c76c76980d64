//! Saga orchestrator: binds incoming events to handlers and owns scope lifecycle.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use uuid::Uuid;

use crate::error::{Result, SagaError, panic_message};
use crate::event::{Event, VariantKey};
use crate::handler::RegisteredHandler;
use crate::invoker::ScopedInvoker;
use crate::registry::HandlerRegistry;

/// How a delivered event ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchOutcome {
    /// The handler returned successfully.
    Completed,
    /// No handler is registered for the variant; the event was dropped.
    Unhandled,
    /// The handler returned an error or panicked; the event is consumed.
    HandlerFailed,
}

impl DispatchOutcome {
    /// Returns the outcome name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Completed => "completed",
            DispatchOutcome::Unhandled => "unhandled",
            DispatchOutcome::HandlerFailed => "handler_failed",
        }
    }
}

impl std::fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Summary of one [`SagaOrchestrator::process_event`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Variant key of the event.
    pub variant: VariantKey,
    /// How the dispatch ended.
    pub outcome: DispatchOutcome,
    /// Scope opened for the handler, if one was dispatched.
    pub scope_id: Option<Uuid>,
    /// History entries discarded (not undone) when the scope closed.
    pub discarded: usize,
    /// Whether closing the scope failed.
    pub close_failed: bool,
}

impl DispatchReport {
    fn unhandled(variant: VariantKey) -> Self {
        Self {
            variant,
            outcome: DispatchOutcome::Unhandled,
            scope_id: None,
            discarded: 0,
            close_failed: false,
        }
    }
}

/// Dispatches events to registered handlers, one scope per event.
///
/// Handler failures are logged and suppressed: the event counts as consumed
/// and the orchestrator does not compensate. The scope is closed on every
/// exit path, including handler panics.
#[derive(Debug)]
pub struct SagaOrchestrator {
    registry: Arc<HandlerRegistry>,
}

impl SagaOrchestrator {
    /// Registers `handlers` in `registry` and returns the orchestrator.
    ///
    /// A handler declaring an invalid variant key aborts startup. Duplicate
    /// keys keep the first handler.
    pub fn new(registry: Arc<HandlerRegistry>, handlers: Vec<RegisteredHandler>) -> Result<Self> {
        tracing::info!(count = handlers.len(), "registering saga event handlers");

        for handler in handlers {
            let name = handler.name();
            if let Err(error) = registry.register(handler) {
                tracing::error!(handler = name, %error, "failed to register saga event handler");
                return Err(error);
            }
        }

        tracing::info!(registered = registry.len(), "saga event handlers registered");
        Ok(Self { registry })
    }

    /// Returns the handler registry.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Processes one delivered event.
    ///
    /// Returns an error only for a malformed event (invalid variant key).
    /// Unknown variants and handler failures return `Ok` with the matching
    /// [`DispatchOutcome`].
    #[tracing::instrument(
        skip(self, event),
        fields(variant = event.variant(), scope_id = tracing::field::Empty)
    )]
    pub async fn process_event(&self, event: Box<dyn Event>) -> Result<DispatchReport> {
        let variant = match VariantKey::of(event.as_ref()) {
            Ok(variant) => variant,
            Err(error) => {
                tracing::error!(%error, ?event, "rejecting saga event");
                return Err(error);
            }
        };
        metrics::counter!("saga_events_received_total", "variant" => variant.as_str())
            .increment(1);

        let Some(handler) = self.registry.lookup(variant) else {
            tracing::warn!(%variant, "unregistered saga event received");
            metrics::counter!("saga_events_unhandled_total", "variant" => variant.as_str())
                .increment(1);
            return Ok(DispatchReport::unhandled(variant));
        };

        let start = Instant::now();
        let mut invoker = ScopedInvoker::new();
        let scope_id = invoker.scope_id();
        tracing::Span::current().record("scope_id", tracing::field::display(scope_id));
        tracing::info!(%variant, handler = handler.name(), "saga event processing started");

        let result = AssertUnwindSafe(handler.dispatch(event, &mut invoker))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                Err(SagaError::HandlerPanicked {
                    variant: variant.as_str(),
                    message: panic_message(payload.as_ref()),
                })
            });

        let outcome = match result {
            Ok(()) => {
                tracing::info!(%variant, "saga event processing completed");
                DispatchOutcome::Completed
            }
            Err(error) => {
                tracing::error!(%variant, %error, "saga event processing failed");
                metrics::counter!("saga_handler_failures_total", "variant" => variant.as_str())
                    .increment(1);
                DispatchOutcome::HandlerFailed
            }
        };

        let (discarded, close_failed) = match invoker.close() {
            Ok(discarded) => (discarded, false),
            Err(error) => {
                tracing::warn!(%variant, %error, "closing command invoker failed");
                metrics::counter!("saga_scope_close_failures_total").increment(1);
                (error.discarded, true)
            }
        };

        metrics::histogram!("saga_dispatch_duration_seconds", "outcome" => outcome.as_str())
            .record(start.elapsed().as_secs_f64());

        Ok(DispatchReport {
            variant,
            outcome,
            scope_id: Some(scope_id),
            discarded,
            close_failed,
        })
    }
}
