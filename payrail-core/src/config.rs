//! Consumer tuning.

use rust_decimal::Decimal;

/// Worker pool sizes and the review threshold.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub payment_workers: usize,
    pub refund_workers: usize,
    pub notification_workers: usize,
    /// Payments strictly above this amount are flagged for review.
    pub high_value_threshold: Decimal,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            payment_workers: 4,
            refund_workers: 2,
            notification_workers: 2,
            high_value_threshold: Decimal::from(10_000),
        }
    }
}
