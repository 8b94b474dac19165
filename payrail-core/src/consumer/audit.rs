//! Audit trail for the payment log channel.

use crate::bus::{Delivery, Subscriber};
use crate::events::BusinessEvent;
use kanau::processor::Processor;
use payrail_sdk::objects::PaymentEvent;
use std::convert::Infallible;
use tokio::sync::watch;
use tracing::{info, warn};

/// Writes one audit line per accepted payment.
pub struct AuditLogger {
    subscriber: Box<dyn Subscriber>,
    shutdown_rx: watch::Receiver<bool>,
}

impl AuditLogger {
    pub fn new(subscriber: Box<dyn Subscriber>, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            subscriber,
            shutdown_rx,
        }
    }

    /// Run the AuditLogger.
    pub async fn run(mut self) {
        info!("AuditLogger started");

        loop {
            tokio::select! {
                biased;

                // Check for shutdown
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("AuditLogger received shutdown signal");
                        break;
                    }
                }

                // Receive audit deliveries
                delivery = self.subscriber.next() => {
                    match delivery {
                        Some(delivery) => self.handle(delivery).await,
                        None => {
                            info!("Payment log channel closed");
                            break;
                        }
                    }
                }
            }
        }

        info!("AuditLogger shutdown complete");
    }

    async fn handle(&mut self, delivery: Delivery) {
        match &delivery.event {
            BusinessEvent::Payment(event) => {
                let _ = self.process(event.clone()).await;
            }
            _ => warn!(
                key = %delivery.key,
                payload = delivery.event.payload_name(),
                "Unexpected payload on payment log channel"
            ),
        }
        self.subscriber.ack(delivery).await;
    }
}

impl Processor<PaymentEvent> for AuditLogger {
    type Output = ();
    type Error = Infallible;

    async fn process(&self, event: PaymentEvent) -> Result<(), Infallible> {
        info!(
            transaction_id = %event.transaction_id,
            trace_id = %event.trace_id,
            record = ?event,
            "Audit record"
        );
        Ok(())
    }
}
