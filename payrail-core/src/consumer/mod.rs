//! Consumer side of the pipeline.
//!
//! Each channel gets its own consumer group and worker pool:
//!
//! - payment-transactions: [`PaymentWorker`] pool, settles payments
//! - refund-transactions: [`RefundWorker`] pool, settles refunds
//! - notification-events: [`NotificationDispatcher`] pool, delivers
//!   user notifications
//! - payment-failures: one [`FailureMonitor`], surfaces compensation
//!   events
//! - payment-logs: one [`AuditLogger`], writes the audit trail
//!
//! Workers within a pool share the group and compete for deliveries;
//! the bus keeps one delivery per partition key in flight, so a user's
//! events are processed in order no matter the pool size.

pub mod audit;
pub mod failure;
pub mod notification;
pub mod payment;
pub mod refund;
pub mod settlement;

pub use audit::AuditLogger;
pub use failure::FailureMonitor;
pub use notification::NotificationDispatcher;
pub use payment::PaymentWorker;
pub use refund::RefundWorker;
pub use settlement::{ProcessingError, SettlementProcessor, SimulatedSettlement};

use crate::bus::{Channel, EventBus};
use crate::config::ConsumerConfig;
use crate::idempotency::IdempotencyGuard;
use crate::notify::NotificationRouter;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const PAYMENT_GROUP: &str = "payment-group";
pub const REFUND_GROUP: &str = "refund-group";
pub const FAILURE_GROUP: &str = "failure-group";
pub const LOG_GROUP: &str = "log-group";
pub const NOTIFICATION_GROUP: &str = "notification-group";

/// Wires every worker pool onto the bus.
pub struct Consumer {
    bus: Arc<dyn EventBus>,
    payment_guard: Arc<dyn IdempotencyGuard>,
    refund_guard: Arc<dyn IdempotencyGuard>,
    settlement: Arc<dyn SettlementProcessor>,
    notifications: Arc<NotificationRouter>,
    config: ConsumerConfig,
}

impl Consumer {
    pub fn new(
        bus: Arc<dyn EventBus>,
        payment_guard: Arc<dyn IdempotencyGuard>,
        refund_guard: Arc<dyn IdempotencyGuard>,
        settlement: Arc<dyn SettlementProcessor>,
        notifications: Arc<NotificationRouter>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            bus,
            payment_guard,
            refund_guard,
            settlement,
            notifications,
            config,
        }
    }

    /// Spawns every worker pool. Workers run until `shutdown_rx` flips
    /// to true or the bus closes.
    pub fn spawn(self, shutdown_rx: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        for _ in 0..self.config.payment_workers.max(1) {
            let worker = PaymentWorker::new(
                self.bus.subscribe(Channel::PaymentTransactions, PAYMENT_GROUP),
                Arc::clone(&self.payment_guard),
                Arc::clone(&self.settlement),
                self.config.high_value_threshold,
                shutdown_rx.clone(),
            );
            handles.push(tokio::spawn(worker.run()));
        }

        for _ in 0..self.config.refund_workers.max(1) {
            let worker = RefundWorker::new(
                self.bus.subscribe(Channel::RefundTransactions, REFUND_GROUP),
                Arc::clone(&self.refund_guard),
                Arc::clone(&self.settlement),
                shutdown_rx.clone(),
            );
            handles.push(tokio::spawn(worker.run()));
        }

        for _ in 0..self.config.notification_workers.max(1) {
            let worker = NotificationDispatcher::new(
                self.bus.subscribe(Channel::NotificationEvents, NOTIFICATION_GROUP),
                Arc::clone(&self.notifications),
                shutdown_rx.clone(),
            );
            handles.push(tokio::spawn(worker.run()));
        }

        let monitor = FailureMonitor::new(
            self.bus.subscribe(Channel::PaymentFailures, FAILURE_GROUP),
            shutdown_rx.clone(),
        );
        handles.push(tokio::spawn(monitor.run()));

        let audit = AuditLogger::new(
            self.bus.subscribe(Channel::PaymentLogs, LOG_GROUP),
            shutdown_rx,
        );
        handles.push(tokio::spawn(audit.run()));

        handles
    }
}
