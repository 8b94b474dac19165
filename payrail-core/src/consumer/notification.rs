//! Notification dispatch worker.
//!
//! The NotificationDispatcher is responsible for:
//! - Receiving notification deliveries from the notification channel
//! - Routing each event to the sink matching its kind
//! - Dropping events whose kind no sink handles
//! - Nacking sink failures so delivery is retried

use crate::bus::{Delivery, Subscriber};
use crate::events::BusinessEvent;
use crate::notify::{DispatchError, NotificationRouter};
use kanau::processor::Processor;
use payrail_sdk::objects::NotificationEvent;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Delivers user notifications through the router.
pub struct NotificationDispatcher {
    subscriber: Box<dyn Subscriber>,
    router: Arc<NotificationRouter>,
    shutdown_rx: watch::Receiver<bool>,
}

impl NotificationDispatcher {
    pub fn new(
        subscriber: Box<dyn Subscriber>,
        router: Arc<NotificationRouter>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            subscriber,
            router,
            shutdown_rx,
        }
    }

    /// Run the NotificationDispatcher.
    pub async fn run(mut self) {
        info!("NotificationDispatcher started");

        loop {
            tokio::select! {
                biased;

                // Check for shutdown
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("NotificationDispatcher received shutdown signal");
                        break;
                    }
                }

                // Receive notification deliveries
                delivery = self.subscriber.next() => {
                    match delivery {
                        Some(delivery) => self.handle(delivery).await,
                        None => {
                            info!("Notification channel closed");
                            break;
                        }
                    }
                }
            }
        }

        info!("NotificationDispatcher shutdown complete");
    }

    async fn handle(&mut self, delivery: Delivery) {
        let event = match &delivery.event {
            BusinessEvent::Notification(event) => event.clone(),
            _ => {
                warn!(
                    key = %delivery.key,
                    payload = delivery.event.payload_name(),
                    "Unexpected payload on notification channel, dropping"
                );
                self.subscriber.ack(delivery).await;
                return;
            }
        };

        match self.process(event).await {
            Ok(()) => self.subscriber.ack(delivery).await,
            // An unknown kind never becomes routable; retrying it would
            // only recycle the same delivery.
            Err(DispatchError::UnknownKind { kind }) => {
                warn!(
                    kind = %kind,
                    trace_id = %delivery.event.trace_id(),
                    "Unknown notification kind, dropping"
                );
                self.subscriber.ack(delivery).await;
            }
            Err(e) => {
                error!(
                    trace_id = %delivery.event.trace_id(),
                    attempt = delivery.attempt,
                    error = %e,
                    "Notification dispatch failed"
                );
                self.subscriber.nack(delivery).await;
            }
        }
    }
}

impl Processor<NotificationEvent> for NotificationDispatcher {
    type Output = ();
    type Error = DispatchError;

    async fn process(&self, event: NotificationEvent) -> Result<(), DispatchError> {
        let kind = self.router.dispatch(&event).await?;
        info!(
            user_id = %event.user_id,
            kind = %kind,
            trace_id = %event.trace_id,
            "Notification dispatched"
        );
        Ok(())
    }
}
