//! Settlement backend seam.

use async_trait::async_trait;
use payrail_sdk::objects::{PaymentEvent, RefundEvent};
use std::time::Duration;
use thiserror::Error;

/// Transient settlement failure; the delivery is retried.
#[derive(Debug, Error)]
#[error("transient processing failure: {reason}")]
pub struct ProcessingError {
    pub reason: String,
}

/// Moves money downstream. Implementations must tolerate being called
/// again for an event they already settled, the idempotency guard only
/// narrows the window.
#[async_trait]
pub trait SettlementProcessor: Send + Sync {
    async fn settle_payment(&self, event: &PaymentEvent) -> Result<(), ProcessingError>;
    async fn settle_refund(&self, event: &RefundEvent) -> Result<(), ProcessingError>;
}

/// Stand-in backend that models settlement latency with a sleep and
/// always succeeds.
pub struct SimulatedSettlement {
    payment_delay: Duration,
    refund_delay: Duration,
}

impl SimulatedSettlement {
    pub fn new(payment_delay: Duration, refund_delay: Duration) -> Self {
        Self {
            payment_delay,
            refund_delay,
        }
    }
}

impl Default for SimulatedSettlement {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_millis(300))
    }
}

#[async_trait]
impl SettlementProcessor for SimulatedSettlement {
    async fn settle_payment(&self, _event: &PaymentEvent) -> Result<(), ProcessingError> {
        tokio::time::sleep(self.payment_delay).await;
        Ok(())
    }

    async fn settle_refund(&self, _event: &RefundEvent) -> Result<(), ProcessingError> {
        tokio::time::sleep(self.refund_delay).await;
        Ok(())
    }
}
