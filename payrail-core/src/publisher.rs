//! Producer-side transactional publisher.
//!
//! Accepted requests become `INITIATED` events published atomically to
//! every channel that must observe them, keyed by user id so one
//! user's events stay ordered. When the transactional publish fails,
//! the original event is pushed best-effort to the compensation
//! channel and the transport error is handed back to the API layer.
//!
//! Only the copy returned to the caller is stamped `SUCCESS`; the wire
//! copies stay `INITIATED` because success is not known at publish
//! time.

use crate::bus::{Channel, ChannelRecord, EventBus, TransportError};
use crate::events::{BusinessEvent, InvalidPayload};
use crate::utils::clock;
use payrail_sdk::objects::{
    EventStatus, NotificationEvent, PaymentEvent, PaymentRequest, RefundEvent, RefundRequest,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PublishError {
    /// The transactional publish failed after compensation ran.
    #[error("transactional publish failed: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    InvalidPayload(#[from] InvalidPayload),
}

/// Publishes business events for the producer API.
#[derive(Clone)]
pub struct EventPublisher {
    bus: Arc<dyn EventBus>,
}

impl EventPublisher {
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    /// Publishes a payment to the transaction, audit log and
    /// notification channels in one transaction. Returns the caller's
    /// copy stamped `SUCCESS` with a fresh timestamp.
    pub async fn send_payment(&self, request: PaymentRequest) -> Result<PaymentEvent, PublishError> {
        let kind = request.notification_type;
        let event = build_payment_event(request);
        info!(
            trace_id = %event.trace_id,
            transaction_id = %event.transaction_id,
            user_id = %event.user_id,
            amount = %event.amount,
            "Initiating payment"
        );

        let notification = NotificationEvent {
            user_id: event.user_id.clone(),
            kind: kind.as_str().to_string(),
            message: format!("Payment SUCCESS for transaction {}", event.transaction_id),
            transaction_id: None,
            trace_id: event.trace_id,
            timestamp: event.timestamp,
        };
        let records = vec![
            ChannelRecord::new(
                Channel::PaymentTransactions,
                BusinessEvent::Payment(event.clone()),
            ),
            ChannelRecord::new(Channel::PaymentLogs, BusinessEvent::Payment(event.clone())),
            ChannelRecord::new(
                Channel::NotificationEvents,
                BusinessEvent::Notification(notification),
            ),
        ];
        self.publish_or_compensate(
            BusinessEvent::Payment(event.clone()),
            records,
            Channel::PaymentFailures,
        )
        .await?;

        let mut committed = event;
        committed.status = EventStatus::Success;
        committed.timestamp = clock::now_unix_millis();
        info!(
            trace_id = %committed.trace_id,
            transaction_id = %committed.transaction_id,
            "Payment published"
        );
        Ok(committed)
    }

    /// Publishes a refund to the refund and notification channels in
    /// one transaction. Returns the caller's copy stamped `SUCCESS`.
    pub async fn send_refund(&self, request: RefundRequest) -> Result<RefundEvent, PublishError> {
        let kind = request.notification_type;
        let event = build_refund_event(request);
        info!(
            trace_id = %event.trace_id,
            refund_id = %event.refund_id,
            transaction_id = %event.transaction_id,
            user_id = %event.user_id,
            amount = %event.amount,
            "Initiating refund"
        );

        let notification = NotificationEvent {
            user_id: event.user_id.clone(),
            kind: kind.as_str().to_string(),
            message: format!("Refund SUCCESS for transaction {}", event.transaction_id),
            transaction_id: Some(event.transaction_id),
            trace_id: event.trace_id,
            timestamp: event.timestamp,
        };
        let records = vec![
            ChannelRecord::new(
                Channel::RefundTransactions,
                BusinessEvent::Refund(event.clone()),
            ),
            ChannelRecord::new(
                Channel::NotificationEvents,
                BusinessEvent::Notification(notification),
            ),
        ];
        // Refunds have no dedicated failure channel; compensation
        // republishes to the primary refund channel.
        self.publish_or_compensate(
            BusinessEvent::Refund(event.clone()),
            records,
            Channel::RefundTransactions,
        )
        .await?;

        let mut committed = event;
        committed.status = EventStatus::Success;
        committed.timestamp = clock::now_unix_millis();
        info!(
            trace_id = %committed.trace_id,
            refund_id = %committed.refund_id,
            "Refund published"
        );
        Ok(committed)
    }

    /// On transactional failure the original payload goes best-effort
    /// to `failure_channel`; the transactional error is propagated
    /// either way.
    async fn publish_or_compensate(
        &self,
        payload: BusinessEvent,
        records: Vec<ChannelRecord>,
        failure_channel: Channel,
    ) -> Result<(), PublishError> {
        let key = payload.partition_key()?.to_string();
        match self.bus.publish_transactional(&key, records).await {
            Ok(()) => Ok(()),
            Err(cause) => {
                error!(
                    key = %key,
                    trace_id = %payload.trace_id(),
                    error = %cause,
                    "Transactional publish failed, publishing compensation"
                );
                if let Err(compensation_error) =
                    self.bus.publish(failure_channel, &key, payload).await
                {
                    error!(
                        channel = %failure_channel,
                        error = %compensation_error,
                        "Compensation publish failed"
                    );
                }
                Err(PublishError::Transport(cause))
            }
        }
    }
}

fn build_payment_event(request: PaymentRequest) -> PaymentEvent {
    PaymentEvent {
        transaction_id: Uuid::new_v4(),
        user_id: request.user_id,
        amount: request.amount,
        currency: request.currency,
        merchant_id: request.merchant_id,
        payment_method: request.payment_method,
        status: EventStatus::Initiated,
        timestamp: clock::now_unix_millis(),
        trace_id: Uuid::new_v4(),
    }
}

fn build_refund_event(request: RefundRequest) -> RefundEvent {
    RefundEvent {
        refund_id: Uuid::new_v4(),
        transaction_id: request.transaction_id,
        user_id: request.user_id,
        amount: request.amount,
        status: EventStatus::Initiated,
        timestamp: clock::now_unix_millis(),
        trace_id: Uuid::new_v4(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InMemoryBus;
    use crate::testing::{payment_request, refund_request};

    fn setup() -> (Arc<InMemoryBus>, EventPublisher) {
        let bus = Arc::new(InMemoryBus::new());
        let publisher = EventPublisher::new(Arc::clone(&bus) as Arc<dyn EventBus>);
        (bus, publisher)
    }

    #[tokio::test]
    async fn test_payment_publish_reaches_all_three_channels() {
        let (bus, publisher) = setup();

        let committed = publisher.send_payment(payment_request("u1", 500)).await;
        assert!(matches!(
            &committed,
            Ok(event) if event.status == EventStatus::Success
        ));

        let transactions = bus.published(Channel::PaymentTransactions);
        assert_eq!(transactions.len(), 1);
        assert!(matches!(
            transactions.first(),
            Some(BusinessEvent::Payment(p)) if p.status == EventStatus::Initiated
        ));
        assert_eq!(bus.published(Channel::PaymentLogs).len(), 1);

        let notifications = bus.published(Channel::NotificationEvents);
        assert_eq!(notifications.len(), 1);
        if let (Ok(event), Some(BusinessEvent::Notification(notification))) =
            (&committed, notifications.first())
        {
            assert_eq!(
                notification.message,
                format!("Payment SUCCESS for transaction {}", event.transaction_id)
            );
            assert_eq!(notification.transaction_id, None);
            assert_eq!(notification.trace_id, event.trace_id);
            assert_eq!(notification.kind, "EMAIL");
        }
    }

    #[tokio::test]
    async fn test_publish_failure_lands_on_the_failure_channel() {
        let (bus, publisher) = setup();
        bus.fail_next_publish(Channel::PaymentLogs);

        let result = publisher.send_payment(payment_request("u1", 500)).await;
        assert!(matches!(
            result,
            Err(PublishError::Transport(TransportError::Rejected {
                channel: Channel::PaymentLogs,
                ..
            }))
        ));

        // Nothing from the aborted transaction is visible.
        assert!(bus.published(Channel::PaymentTransactions).is_empty());
        assert!(bus.published(Channel::NotificationEvents).is_empty());

        let failures = bus.published(Channel::PaymentFailures);
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            failures.first(),
            Some(BusinessEvent::Payment(p)) if p.status == EventStatus::Initiated
        ));
    }

    #[tokio::test]
    async fn test_commit_failure_lands_on_the_failure_channel() {
        let (bus, publisher) = setup();
        bus.fail_next_commit();

        let result = publisher.send_payment(payment_request("u1", 500)).await;
        assert!(matches!(
            result,
            Err(PublishError::Transport(TransportError::CommitAborted { .. }))
        ));
        assert_eq!(bus.published(Channel::PaymentFailures).len(), 1);
    }

    #[tokio::test]
    async fn test_failed_compensation_still_returns_the_original_error() {
        let (bus, publisher) = setup();
        bus.fail_next_publish(Channel::PaymentLogs);
        bus.fail_next_publish(Channel::PaymentFailures);

        let result = publisher.send_payment(payment_request("u1", 500)).await;
        assert!(matches!(
            result,
            Err(PublishError::Transport(TransportError::Rejected {
                channel: Channel::PaymentLogs,
                ..
            }))
        ));
        assert!(bus.published(Channel::PaymentFailures).is_empty());
    }

    #[tokio::test]
    async fn test_refund_notification_links_the_original_transaction() {
        let (bus, publisher) = setup();
        let original = Uuid::new_v4();

        let committed = publisher.send_refund(refund_request(original, "u2", 40)).await;
        assert!(matches!(
            &committed,
            Ok(refund) if refund.status == EventStatus::Success && refund.transaction_id == original
        ));
        assert_eq!(bus.published(Channel::RefundTransactions).len(), 1);

        let notifications = bus.published(Channel::NotificationEvents);
        assert!(matches!(
            notifications.first(),
            Some(BusinessEvent::Notification(n))
                if n.transaction_id == Some(original)
                    && n.message == format!("Refund SUCCESS for transaction {original}")
                    && n.kind == "SMS"
        ));
    }

    #[tokio::test]
    async fn test_refund_compensation_uses_the_refund_channel() {
        let (bus, publisher) = setup();
        bus.fail_next_publish(Channel::NotificationEvents);

        let result = publisher
            .send_refund(refund_request(Uuid::new_v4(), "u2", 40))
            .await;
        assert!(result.is_err());

        // Only the compensation copy made it to the refund channel.
        let refunds = bus.published(Channel::RefundTransactions);
        assert_eq!(refunds.len(), 1);
        assert!(matches!(
            refunds.first(),
            Some(BusinessEvent::Refund(r)) if r.status == EventStatus::Initiated
        ));
        assert!(bus.published(Channel::PaymentFailures).is_empty());
        assert!(bus.published(Channel::NotificationEvents).is_empty());
    }
}
