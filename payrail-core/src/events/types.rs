//! Business event payloads carried by the bus.

use payrail_sdk::objects::{NotificationEvent, PaymentEvent, RefundEvent};
use thiserror::Error;
use uuid::Uuid;

/// Raised when a payload type cannot supply a partition key.
///
/// Only payment and refund events carry a routing key; asking for one
/// on any other payload is a programming error and is never retried.
#[derive(Debug, Clone, Error)]
#[error("no partition key for payload type {payload}")]
pub struct InvalidPayload {
    /// Name of the offending payload type.
    pub payload: &'static str,
}

/// The payloads a bus channel can carry.
#[derive(Debug, Clone)]
pub enum BusinessEvent {
    Payment(PaymentEvent),
    Refund(RefundEvent),
    Notification(NotificationEvent),
}

impl BusinessEvent {
    /// Partition key for publishes. Payments and refunds key on the
    /// user, so one user's events stay ordered relative to each other.
    pub fn partition_key(&self) -> Result<&str, InvalidPayload> {
        match self {
            BusinessEvent::Payment(event) => Ok(&event.user_id),
            BusinessEvent::Refund(event) => Ok(&event.user_id),
            BusinessEvent::Notification(_) => Err(InvalidPayload {
                payload: "NotificationEvent",
            }),
        }
    }

    /// Trace id carried by the payload.
    pub fn trace_id(&self) -> Uuid {
        match self {
            BusinessEvent::Payment(event) => event.trace_id,
            BusinessEvent::Refund(event) => event.trace_id,
            BusinessEvent::Notification(event) => event.trace_id,
        }
    }

    /// Short payload name for logs.
    pub fn payload_name(&self) -> &'static str {
        match self {
            BusinessEvent::Payment(_) => "PaymentEvent",
            BusinessEvent::Refund(_) => "RefundEvent",
            BusinessEvent::Notification(_) => "NotificationEvent",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{notification_event, payment_event};

    #[test]
    fn test_partition_key_is_user_id() {
        let event = BusinessEvent::Payment(payment_event("u1", 100));
        assert_eq!(event.partition_key().ok(), Some("u1"));
    }

    #[test]
    fn test_notifications_have_no_partition_key() {
        let event = BusinessEvent::Notification(notification_event("u1", "EMAIL"));
        assert!(matches!(
            event.partition_key(),
            Err(InvalidPayload {
                payload: "NotificationEvent"
            })
        ));
    }
}
