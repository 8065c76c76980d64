//! Saga error types.

use std::any::Any;

use thiserror::Error;
use uuid::Uuid;

/// Boxed error used where handler and command errors are type-erased.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in the saga kernel.
#[derive(Debug, Error)]
pub enum SagaError {
    /// An event or handler carries a malformed variant key.
    #[error("Invalid variant key '{key}': {reason}")]
    InvalidVariant { key: String, reason: &'static str },

    /// The event delivered under a variant key is not the type the handler expects.
    #[error("Event of variant '{variant}' does not match the event type of handler {handler}")]
    EventTypeMismatch {
        variant: &'static str,
        handler: &'static str,
    },

    /// A handler returned an error.
    #[error("Handler for '{variant}' failed: {source}")]
    Handler {
        variant: &'static str,
        #[source]
        source: BoxError,
    },

    /// A handler panicked.
    #[error("Handler for '{variant}' panicked: {message}")]
    HandlerPanicked {
        variant: &'static str,
        message: String,
    },

    /// Releasing one or more history entries panicked while closing a scope.
    #[error(transparent)]
    CloseFailed(#[from] CloseError),

    /// The event channel was closed before the event could be delivered.
    #[error("Event channel closed")]
    ChannelClosed,
}

/// Releasing one or more history entries panicked while clearing or closing a scope.
///
/// Every entry is still released; `discarded` counts all of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Closing scope {scope_id} failed: {failed} of {discarded} entries panicked on release")]
pub struct CloseError {
    pub scope_id: Uuid,
    pub discarded: usize,
    pub failed: usize,
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;

/// Extracts a printable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
