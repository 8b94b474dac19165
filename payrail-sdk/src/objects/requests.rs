//! Inbound request payloads for the producer API.

use crate::objects::events::NotificationKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request payload for initiating a payment.
///
/// Sent by the application backend to `POST /api/v1/payments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub user_id: String,
    pub amount: Decimal,
    pub currency: String,
    /// Settlement instrument, passed through opaquely.
    pub payment_method: String,
    pub merchant_id: String,
    /// How the user wants to hear about the outcome.
    pub notification_type: NotificationKind,
}

/// Request payload for refunding a previously settled payment.
///
/// Sent by the application backend to `POST /api/v1/refunds`.
/// `transaction_id` references an earlier payment; existence is not
/// validated by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub transaction_id: Uuid,
    pub user_id: String,
    pub amount: Decimal,
    pub notification_type: NotificationKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_request_parsing() {
        let body = r#"{
            "user_id": "u1",
            "amount": 15000,
            "currency": "USD",
            "payment_method": "UPI",
            "merchant_id": "m1",
            "notification_type": "EMAIL"
        }"#;
        let request: PaymentRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.user_id, "u1");
        assert_eq!(request.amount, Decimal::from(15000));
        assert_eq!(request.notification_type, NotificationKind::Email);
    }

    #[test]
    fn test_unknown_notification_type_rejected() {
        let body = r#"{
            "transaction_id": "5f0f5f5e-3a66-44dd-9f34-4a3a1bd3ff10",
            "user_id": "u1",
            "amount": 50,
            "notification_type": "FAX"
        }"#;
        assert!(serde_json::from_str::<RefundRequest>(body).is_err());
    }
}
