//! Refund settlement worker.
//!
//! Same shape as the payment worker, keyed by refund id. Refunds have
//! no high-value review step.

use crate::bus::{Delivery, Subscriber};
use crate::consumer::settlement::{ProcessingError, SettlementProcessor};
use crate::events::BusinessEvent;
use crate::idempotency::IdempotencyGuard;
use kanau::processor::Processor;
use payrail_sdk::objects::RefundEvent;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Settles refunds from the refund channel.
pub struct RefundWorker {
    subscriber: Box<dyn Subscriber>,
    guard: Arc<dyn IdempotencyGuard>,
    settlement: Arc<dyn SettlementProcessor>,
    shutdown_rx: watch::Receiver<bool>,
}

impl RefundWorker {
    pub fn new(
        subscriber: Box<dyn Subscriber>,
        guard: Arc<dyn IdempotencyGuard>,
        settlement: Arc<dyn SettlementProcessor>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            subscriber,
            guard,
            settlement,
            shutdown_rx,
        }
    }

    /// Run the RefundWorker.
    pub async fn run(mut self) {
        info!("RefundWorker started");

        loop {
            tokio::select! {
                biased;

                // Check for shutdown
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("RefundWorker received shutdown signal");
                        break;
                    }
                }

                // Receive refund deliveries
                delivery = self.subscriber.next() => {
                    match delivery {
                        Some(delivery) => self.handle(delivery).await,
                        None => {
                            info!("Refund channel closed");
                            break;
                        }
                    }
                }
            }
        }

        info!("RefundWorker shutdown complete");
    }

    async fn handle(&mut self, delivery: Delivery) {
        let event = match &delivery.event {
            BusinessEvent::Refund(event) => event.clone(),
            _ => {
                warn!(
                    key = %delivery.key,
                    payload = delivery.event.payload_name(),
                    "Unexpected payload on refund channel, dropping"
                );
                self.subscriber.ack(delivery).await;
                return;
            }
        };

        match self.process(event).await {
            Ok(()) => self.subscriber.ack(delivery).await,
            Err(e) => {
                error!(
                    trace_id = %delivery.event.trace_id(),
                    key = %delivery.key,
                    attempt = delivery.attempt,
                    error = %e,
                    "Refund processing failed"
                );
                self.subscriber.nack(delivery).await;
            }
        }
    }
}

impl Processor<RefundEvent> for RefundWorker {
    type Output = ();
    type Error = ProcessingError;

    async fn process(&self, event: RefundEvent) -> Result<(), ProcessingError> {
        if !self.guard.claim(event.refund_id) {
            warn!(
                refund_id = %event.refund_id,
                trace_id = %event.trace_id,
                "Duplicate refund ignored"
            );
            return Ok(());
        }

        self.settlement.settle_refund(&event).await?;

        self.guard.mark_success(event.refund_id);
        info!(
            refund_id = %event.refund_id,
            transaction_id = %event.transaction_id,
            trace_id = %event.trace_id,
            amount = %event.amount,
            "Refund processed"
        );
        Ok(())
    }
}
