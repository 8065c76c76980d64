//! Worker entry point.

use tokio::signal;
use worker::{Config, Worker, WorkerError};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, stopping");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, stopping");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), WorkerError> {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    worker::init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Wire the order service and saga processor
    let worker = Worker::new(config.processor.clone())?;
    tracing::info!(
        max_in_flight = config.processor.max_in_flight,
        channel_capacity = config.processor.channel_capacity,
        "worker started"
    );

    // 4. Replay the scripted events until done or interrupted
    tokio::select! {
        report = worker.run_demo() => {
            let report = report?;
            for order in &report.orders {
                tracing::info!(
                    order_id = %order.id(),
                    status = %order.status(),
                    payment_id = ?order.payment_id(),
                    "final order state"
                );
            }
            tracing::info!(
                delivered = report.stats.delivered,
                handled = report.stats.handled,
                unhandled = report.stats.unhandled,
                failed = report.stats.failed,
                rejected = report.stats.rejected,
                published = report.published.len(),
                "demo finished"
            );
        }
        () = shutdown_signal() => {}
    }

    // 5. Dump metrics
    tracing::info!(metrics = %metrics_handle.render(), "metrics snapshot");
    tracing::info!("worker shut down");
    Ok(())
}
