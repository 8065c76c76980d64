//! Scripted demo run over in-memory collaborators.

use std::sync::Arc;

use common::{CustomerId, Money, PaymentId};
use order::{
    InMemoryEventPublisher, InMemoryOrderRepository, InventoryReservationFailed, Order,
    OrderCommandFactory, OrderCreation, OrderItem, OrderRepository, OrderService,
    PaymentCompleted, PaymentFailed, PublishedEvent, order_handlers,
};
use saga::{
    Event, HandlerRegistry, ProcessorConfig, ProcessorStats, SagaError, SagaEventProcessor,
    SagaOrchestrator,
};
use uuid::Uuid;

use crate::error::WorkerError;

/// Event this service does not handle; exercises the unhandled path.
#[derive(Debug)]
struct LoyaltyPointsEarned;

impl Event for LoyaltyPointsEarned {
    fn variant(&self) -> &'static str {
        "LoyaltyPointsEarned"
    }
}

/// Outcome of [`Worker::run_demo`].
#[derive(Debug, Clone)]
pub struct DemoReport {
    pub stats: ProcessorStats,
    pub orders: Vec<Order>,
    pub published: Vec<PublishedEvent>,
}

/// The order service and its saga processor, wired over in-memory storage.
#[derive(Debug)]
pub struct Worker {
    repository: InMemoryOrderRepository,
    publisher: InMemoryEventPublisher,
    service: OrderService,
    processor: SagaEventProcessor,
}

impl Worker {
    /// Wires collaborators, handlers, orchestrator and processor.
    pub fn new(config: ProcessorConfig) -> Result<Self, WorkerError> {
        let repository = InMemoryOrderRepository::new();
        let publisher = InMemoryEventPublisher::new();
        let factory =
            OrderCommandFactory::new(Arc::new(repository.clone()), Arc::new(publisher.clone()));

        let orchestrator =
            SagaOrchestrator::new(Arc::new(HandlerRegistry::new()), order_handlers(&factory))?;
        tracing::info!(
            variants = ?orchestrator.registry().variants(),
            "saga handlers registered"
        );

        Ok(Self {
            repository,
            publisher,
            service: OrderService::new(factory),
            processor: SagaEventProcessor::new(Arc::new(orchestrator), config),
        })
    }

    pub fn processor(&self) -> &SagaEventProcessor {
        &self.processor
    }

    /// Creates three orders and replays payment and inventory outcomes for them.
    ///
    /// Events for the same order are delivered in separate batches so that
    /// concurrent processing cannot reorder them.
    #[tracing::instrument(skip(self))]
    pub async fn run_demo(&self) -> Result<DemoReport, WorkerError> {
        let paid = self.seed_order(1).await?;
        let declined = self.seed_order(2).await?;
        let out_of_stock = self.seed_order(3).await?;

        let first: Vec<Box<dyn Event>> = vec![
            Box::new(PaymentCompleted {
                order_id: paid.id(),
                payment_id: PaymentId::new(),
                amount: paid.total_amount(),
            }),
            Box::new(PaymentFailed {
                order_id: declined.id(),
                reason: "insufficient funds".to_string(),
            }),
            Box::new(PaymentCompleted {
                order_id: out_of_stock.id(),
                payment_id: PaymentId::new(),
                amount: out_of_stock.total_amount(),
            }),
            Box::new(LoyaltyPointsEarned),
        ];
        let second: Vec<Box<dyn Event>> = vec![Box::new(InventoryReservationFailed {
            order_id: out_of_stock.id(),
            reason: "out of stock".to_string(),
        })];

        let mut stats = ProcessorStats::default();
        for batch in [first, second] {
            stats += self.deliver(batch).await?;
        }

        let mut orders = Vec::new();
        for id in [paid.id(), declined.id(), out_of_stock.id()] {
            if let Some(order) = self.repository.find_by_id(id).await? {
                orders.push(order);
            }
        }

        let report = DemoReport {
            stats,
            orders,
            published: self.publisher.published(),
        };
        record_demo_metrics(&report);
        Ok(report)
    }

    async fn seed_order(&self, quantity: u32) -> Result<Order, WorkerError> {
        let order = self
            .service
            .create_order(OrderCreation {
                customer_id: CustomerId::new(),
                items: vec![OrderItem::new(Uuid::new_v4(), quantity, Money::new(10_000))],
            })
            .await?;
        Ok(order)
    }

    async fn deliver(&self, events: Vec<Box<dyn Event>>) -> Result<ProcessorStats, WorkerError> {
        let (sender, receiver) = self.processor.channel();
        let producer = tokio::spawn(async move {
            for event in events {
                sender.send_boxed(event).await?;
            }
            Ok::<_, SagaError>(())
        });

        let stats = self.processor.run(receiver).await;
        producer.await??;
        Ok(stats)
    }
}

fn record_demo_metrics(report: &DemoReport) {
    metrics::counter!("worker_demo_runs_total").increment(1);
    let stats = &report.stats;
    for (result, count) in [
        ("handled", stats.handled),
        ("unhandled", stats.unhandled),
        ("failed", stats.failed),
        ("rejected", stats.rejected),
    ] {
        metrics::counter!("worker_demo_events_total", "result" => result).increment(count);
    }
    metrics::gauge!("worker_demo_published_events").set(report.published.len() as f64);
}

#[cfg(test)]
mod tests {
    use metrics_exporter_prometheus::PrometheusBuilder;
    use order::{OrderIntegrationEvent, OrderStatus};

    use super::*;

    #[tokio::test]
    async fn test_demo_runs_every_scenario() {
        let worker = Worker::new(ProcessorConfig::default()).unwrap();

        let report = worker.run_demo().await.unwrap();

        assert_eq!(report.stats.delivered, 5);
        assert_eq!(report.stats.handled, 4);
        assert_eq!(report.stats.unhandled, 1);
        assert_eq!(report.stats.failed, 0);

        let statuses: Vec<_> = report.orders.iter().map(Order::status).collect();
        assert_eq!(
            statuses,
            vec![OrderStatus::Paid, OrderStatus::Cancelled, OrderStatus::Cancelled]
        );

        let refunds = report
            .published
            .iter()
            .filter(|p| matches!(p.event, OrderIntegrationEvent::PaymentRefundRequested { .. }))
            .count();
        assert_eq!(refunds, 1);
        assert_eq!(report.published.len(), 6);
    }

    #[tokio::test]
    async fn test_demo_respects_single_in_flight() {
        let worker = Worker::new(ProcessorConfig {
            max_in_flight: 1,
            channel_capacity: 1,
        })
        .unwrap();

        let report = worker.run_demo().await.unwrap();

        assert_eq!(report.stats.delivered, 5);
        assert_eq!(worker.processor().config().max_in_flight, 1);
    }

    #[tokio::test]
    async fn test_demo_run_is_recorded_in_metrics() {
        let worker = Worker::new(ProcessorConfig::default()).unwrap();
        let report = worker.run_demo().await.unwrap();

        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || record_demo_metrics(&report));

        let rendered = handle.render();
        assert!(rendered.contains("worker_demo_runs_total 1"), "{rendered}");
        assert!(
            rendered.contains(r#"worker_demo_events_total{result="handled"} 4"#),
            "{rendered}"
        );
        assert!(
            rendered.contains(r#"worker_demo_events_total{result="unhandled"} 1"#),
            "{rendered}"
        );
        assert!(rendered.contains("worker_demo_published_events 6"), "{rendered}");
    }
}
