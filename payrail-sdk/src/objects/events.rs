//! Event payloads carried on the bus channels.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status stamped on payment and refund events.
///
/// The producer publishes events as `Initiated` and flips only the copy
/// returned to the API caller to `Success` after the transactional
/// publish commits. Consumers never write this field; they track their
/// own outcome in the idempotency guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Initiated,
    Success,
    Failed,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Initiated => write!(f, "INITIATED"),
            EventStatus::Success => write!(f, "SUCCESS"),
            EventStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Delivery channel a user notification goes out on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationKind {
    Email,
    Sms,
    Push,
}

impl NotificationKind {
    /// Wire string for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Email => "EMAIL",
            NotificationKind::Sms => "SMS",
            NotificationKind::Push => "PUSH",
        }
    }

    /// Parse a wire string, case-insensitively.
    ///
    /// Returns `None` for kinds outside the known set; the caller
    /// decides whether that is an error.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind.to_ascii_uppercase().as_str() {
            "EMAIL" => Some(NotificationKind::Email),
            "SMS" => Some(NotificationKind::Sms),
            "PUSH" => Some(NotificationKind::Push),
            _ => None,
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A payment accepted by the producer and published for settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    /// Producer-generated settlement identifier, unique per request.
    pub transaction_id: Uuid,
    pub user_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub merchant_id: String,
    /// Settlement instrument, passed through opaquely
    /// (e.g. "CREDIT_CARD", "UPI", "WALLET").
    pub payment_method: String,
    pub status: EventStatus,
    /// Unix-epoch milliseconds, re-stamped when the publish commits.
    pub timestamp: i64,
    /// Correlates every event emitted for one business operation.
    pub trace_id: Uuid,
}

/// A refund requested against a prior payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundEvent {
    /// Producer-generated refund identifier, unique per request.
    pub refund_id: Uuid,
    /// The payment being refunded; existence is not checked here.
    pub transaction_id: Uuid,
    pub user_id: String,
    pub amount: Decimal,
    pub status: EventStatus,
    pub timestamp: i64,
    pub trace_id: Uuid,
}

/// Fire-and-forget user notification. Immutable once created, no
/// status field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub user_id: String,
    /// Kind travels as a raw string: a shared broker carries events
    /// from producers that are not guaranteed to use the closed enum.
    pub kind: String,
    pub message: String,
    /// Optional link back to the payment this notification is about.
    pub transaction_id: Option<Uuid>,
    pub trace_id: Uuid,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_kind_case_insensitive_parse() {
        assert_eq!(NotificationKind::parse("EMAIL"), Some(NotificationKind::Email));
        assert_eq!(NotificationKind::parse("sms"), Some(NotificationKind::Sms));
        assert_eq!(NotificationKind::parse("Push"), Some(NotificationKind::Push));
        assert_eq!(NotificationKind::parse("FAX"), None);
        assert_eq!(NotificationKind::parse(""), None);
    }

    #[test]
    fn test_status_and_kind_wire_strings() {
        let status = serde_json::to_string(&EventStatus::Initiated).unwrap();
        assert_eq!(status, "\"INITIATED\"");

        let kind = serde_json::to_string(&NotificationKind::Email).unwrap();
        assert_eq!(kind, "\"EMAIL\"");

        let parsed: EventStatus = serde_json::from_str("\"SUCCESS\"").unwrap();
        assert_eq!(parsed, EventStatus::Success);
    }
}
