//! Shared fixtures and instrumented fakes for the crate's tests.

use crate::bus::{Delivery, Subscriber};
use crate::consumer::settlement::{ProcessingError, SettlementProcessor};
use crate::notify::{NotificationSink, SinkError};
use crate::utils::{clock, lock};
use async_trait::async_trait;
use payrail_sdk::objects::{
    EventStatus, NotificationEvent, NotificationKind, PaymentEvent, PaymentRequest, RefundEvent,
    RefundRequest,
};
use rust_decimal::Decimal;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

pub(crate) fn payment_request(user: &str, amount: i64) -> PaymentRequest {
    PaymentRequest {
        user_id: user.to_string(),
        amount: Decimal::from(amount),
        currency: "USD".to_string(),
        payment_method: "UPI".to_string(),
        merchant_id: "m1".to_string(),
        notification_type: NotificationKind::Email,
    }
}

pub(crate) fn refund_request(transaction_id: Uuid, user: &str, amount: i64) -> RefundRequest {
    RefundRequest {
        transaction_id,
        user_id: user.to_string(),
        amount: Decimal::from(amount),
        notification_type: NotificationKind::Sms,
    }
}

pub(crate) fn payment_event(user: &str, amount: i64) -> PaymentEvent {
    PaymentEvent {
        transaction_id: Uuid::new_v4(),
        user_id: user.to_string(),
        amount: Decimal::from(amount),
        currency: "USD".to_string(),
        merchant_id: "m1".to_string(),
        payment_method: "UPI".to_string(),
        status: EventStatus::Initiated,
        timestamp: clock::now_unix_millis(),
        trace_id: Uuid::new_v4(),
    }
}

pub(crate) fn notification_event(user: &str, kind: &str) -> NotificationEvent {
    NotificationEvent {
        user_id: user.to_string(),
        kind: kind.to_string(),
        message: "test notification".to_string(),
        transaction_id: None,
        trace_id: Uuid::new_v4(),
        timestamp: clock::now_unix_millis(),
    }
}

/// Next delivery, bounded so a broken test fails instead of hanging.
pub(crate) async fn recv(sub: &mut dyn Subscriber) -> Option<Delivery> {
    match tokio::time::timeout(Duration::from_secs(1), sub.next()).await {
        Ok(delivery) => delivery,
        Err(_) => None,
    }
}

/// Polls `condition` every few milliseconds for up to two seconds.
pub(crate) async fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Settlement fake that counts calls and can fail the first `n` of
/// them with a transient error.
#[derive(Default)]
pub(crate) struct CountingSettlement {
    payments: AtomicUsize,
    refunds: AtomicUsize,
    fail_first: AtomicU32,
}

impl CountingSettlement {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_first(failures: u32) -> Self {
        let settlement = Self::default();
        settlement.fail_first.store(failures, Ordering::SeqCst);
        settlement
    }

    pub(crate) fn payments(&self) -> usize {
        self.payments.load(Ordering::SeqCst)
    }

    pub(crate) fn refunds(&self) -> usize {
        self.refunds.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        self.fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
    }
}

#[async_trait]
impl SettlementProcessor for CountingSettlement {
    async fn settle_payment(&self, _event: &PaymentEvent) -> Result<(), ProcessingError> {
        if self.take_failure() {
            return Err(ProcessingError {
                reason: "injected settlement failure".to_string(),
            });
        }
        self.payments.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn settle_refund(&self, _event: &RefundEvent) -> Result<(), ProcessingError> {
        if self.take_failure() {
            return Err(ProcessingError {
                reason: "injected settlement failure".to_string(),
            });
        }
        self.refunds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Sink fake that records deliveries and can fail the first `n`.
#[derive(Default)]
pub(crate) struct RecordingSink {
    sent: Mutex<Vec<(String, String)>>,
    fail_first: AtomicU32,
}

impl RecordingSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_first(failures: u32) -> Self {
        let sink = Self::default();
        sink.fail_first.store(failures, Ordering::SeqCst);
        sink
    }

    pub(crate) fn sent(&self) -> Vec<(String, String)> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, user_id: &str, message: &str) -> Result<(), SinkError> {
        let armed = self
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok();
        if armed {
            return Err(SinkError {
                reason: "injected sink failure".to_string(),
            });
        }
        lock(&self.sent).push((user_id.to_string(), message.to_string()));
        Ok(())
    }
}
