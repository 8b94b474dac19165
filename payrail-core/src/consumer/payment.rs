//! Payment settlement worker.
//!
//! The PaymentWorker is responsible for:
//! - Receiving payment deliveries from the transaction channel
//! - Claiming each transaction id before any settlement work
//! - Flagging high-value payments for manual review
//! - Acking settled and duplicate payments, nacking transient failures

use crate::bus::{Delivery, Subscriber};
use crate::consumer::settlement::{ProcessingError, SettlementProcessor};
use crate::events::BusinessEvent;
use crate::idempotency::IdempotencyGuard;
use kanau::processor::Processor;
use payrail_sdk::objects::PaymentEvent;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Settles payments from the transaction channel.
pub struct PaymentWorker {
    subscriber: Box<dyn Subscriber>,
    guard: Arc<dyn IdempotencyGuard>,
    settlement: Arc<dyn SettlementProcessor>,
    high_value_threshold: Decimal,
    shutdown_rx: watch::Receiver<bool>,
}

impl PaymentWorker {
    pub fn new(
        subscriber: Box<dyn Subscriber>,
        guard: Arc<dyn IdempotencyGuard>,
        settlement: Arc<dyn SettlementProcessor>,
        high_value_threshold: Decimal,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            subscriber,
            guard,
            settlement,
            high_value_threshold,
            shutdown_rx,
        }
    }

    /// Run the PaymentWorker.
    pub async fn run(mut self) {
        info!("PaymentWorker started");

        loop {
            tokio::select! {
                biased;

                // Check for shutdown
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("PaymentWorker received shutdown signal");
                        break;
                    }
                }

                // Receive payment deliveries
                delivery = self.subscriber.next() => {
                    match delivery {
                        Some(delivery) => self.handle(delivery).await,
                        None => {
                            info!("Payment channel closed");
                            break;
                        }
                    }
                }
            }
        }

        info!("PaymentWorker shutdown complete");
    }

    async fn handle(&mut self, delivery: Delivery) {
        let event = match &delivery.event {
            BusinessEvent::Payment(event) => event.clone(),
            _ => {
                warn!(
                    key = %delivery.key,
                    payload = delivery.event.payload_name(),
                    "Unexpected payload on payment channel, dropping"
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
                    "Payment processing failed"
                );
                self.subscriber.nack(delivery).await;
            }
        }
    }
}

impl Processor<PaymentEvent> for PaymentWorker {
    type Output = ();
    type Error = ProcessingError;

    async fn process(&self, event: PaymentEvent) -> Result<(), ProcessingError> {
        // The claim is taken before any settlement work. A worker that
        // crashes mid-settlement leaves the claim held, so a redelivery
        // is dropped rather than settled twice.
        if !self.guard.claim(event.transaction_id) {
            warn!(
                transaction_id = %event.transaction_id,
                trace_id = %event.trace_id,
                "Duplicate payment ignored"
            );
            return Ok(());
        }

        if event.amount > self.high_value_threshold {
            warn!(
                transaction_id = %event.transaction_id,
                user_id = %event.user_id,
                amount = %event.amount,
                "High-value payment flagged for review"
            );
        }

        self.settlement.settle_payment(&event).await?;

        self.guard.mark_success(event.transaction_id);
        info!(
            transaction_id = %event.transaction_id,
            trace_id = %event.trace_id,
            amount = %event.amount,
            "Payment processed"
        );
        Ok(())
    }
}
