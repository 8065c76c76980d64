//! Worker error types.

use order::OrderError;
use saga::SagaError;
use thiserror::Error;

/// Errors that stop the worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Wiring or feeding the saga kernel failed.
    #[error("Saga error: {0}")]
    Saga(#[from] SagaError),

    /// Seeding demo orders failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// A processor task could not be joined.
    #[error("Processor task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
