//! Failure channel monitor.
//!
//! Compensation events are payments whose transactional publish was
//! rolled back. The monitor surfaces them loudly in the logs; nothing
//! downstream retries them automatically.

use crate::bus::{Delivery, Subscriber};
use crate::events::BusinessEvent;
use kanau::processor::Processor;
use payrail_sdk::objects::PaymentEvent;
use std::convert::Infallible;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Logs every compensation event on the failure channel.
pub struct FailureMonitor {
    subscriber: Box<dyn Subscriber>,
    shutdown_rx: watch::Receiver<bool>,
}

impl FailureMonitor {
    pub fn new(subscriber: Box<dyn Subscriber>, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            subscriber,
            shutdown_rx,
        }
    }

    /// Run the FailureMonitor.
    pub async fn run(mut self) {
        info!("FailureMonitor started");

        loop {
            tokio::select! {
                biased;

                // Check for shutdown
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("FailureMonitor received shutdown signal");
                        break;
                    }
                }

                // Receive compensation deliveries
                delivery = self.subscriber.next() => {
                    match delivery {
                        Some(delivery) => self.handle(delivery).await,
                        None => {
                            info!("Failure channel closed");
                            break;
                        }
                    }
                }
            }
        }

        info!("FailureMonitor shutdown complete");
    }

    async fn handle(&mut self, delivery: Delivery) {
        match &delivery.event {
            BusinessEvent::Payment(event) => {
                let _ = self.process(event.clone()).await;
            }
            _ => warn!(
                key = %delivery.key,
                payload = delivery.event.payload_name(),
                "Unexpected payload on failure channel"
            ),
        }
        // Observing the failure is the whole job; always ack.
        self.subscriber.ack(delivery).await;
    }
}

impl Processor<PaymentEvent> for FailureMonitor {
    type Output = ();
    type Error = Infallible;

    async fn process(&self, event: PaymentEvent) -> Result<(), Infallible> {
        // TODO: feed an operator alerting pipeline once one exists.
        error!(
            transaction_id = %event.transaction_id,
            user_id = %event.user_id,
            amount = %event.amount,
            trace_id = %event.trace_id,
            "Failed payment received"
        );
        Ok(())
    }
}
