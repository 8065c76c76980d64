//! Order saga worker.
//!
//! Wires the in-memory order collaborators, the order handlers and the saga
//! event processor, then replays a scripted sequence of integration events.

pub mod config;
pub mod demo;
pub mod error;

pub use config::{Config, LogFormat};
pub use demo::{DemoReport, Worker};
pub use error::WorkerError;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global tracing subscriber described by `config`.
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let json = config.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}
