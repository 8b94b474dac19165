//! Event bus boundary.
//!
//! The pipeline treats the broker as an external collaborator with
//! three capabilities:
//!
//! - transactional multi-channel publish (all records commit or none)
//! - best-effort single publish (the compensation path)
//! - group subscriptions with at-least-once, per-key-ordered delivery
//!
//! [`InMemoryBus`] is the in-process realization used by the server and
//! the tests; a broker-backed implementation plugs in behind the same
//! traits.

pub mod memory;

pub use memory::{DEFAULT_MAX_DELIVERY_ATTEMPTS, InMemoryBus};

use crate::events::BusinessEvent;
use async_trait::async_trait;
use thiserror::Error;

/// Logical channels on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Primary channel for accepted payments.
    PaymentTransactions,
    /// Audit copy of every accepted payment.
    PaymentLogs,
    /// Compensation records for payments whose publish failed.
    PaymentFailures,
    /// Primary channel for refunds; doubles as the refund compensation
    /// target.
    RefundTransactions,
    /// Derived user notifications.
    NotificationEvents,
}

impl Channel {
    /// Broker-side channel name.
    pub fn name(&self) -> &'static str {
        match self {
            Channel::PaymentTransactions => "payment-transactions",
            Channel::PaymentLogs => "payment-logs",
            Channel::PaymentFailures => "payment-failures",
            Channel::RefundTransactions => "refund-transactions",
            Channel::NotificationEvents => "notification-events",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One (channel, payload) pair inside a transactional publish.
#[derive(Debug, Clone)]
pub struct ChannelRecord {
    pub channel: Channel,
    pub event: BusinessEvent,
}

impl ChannelRecord {
    pub fn new(channel: Channel, event: BusinessEvent) -> Self {
        Self { channel, event }
    }
}

/// A single delivery handed to a subscriber.
///
/// Must be returned to the subscriber via `ack` or `nack`; until then
/// its partition key yields no further deliveries in the group.
#[derive(Debug)]
pub struct Delivery {
    pub event: BusinessEvent,
    /// Partition key the event was published under.
    pub key: String,
    /// 1-based delivery attempt within the group.
    pub attempt: u32,
}

/// Errors raised by the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A channel refused a record before the transaction committed.
    #[error("publish to '{channel}' rejected: {reason}")]
    Rejected { channel: Channel, reason: String },

    /// The transaction commit failed; no staged record became visible.
    #[error("transaction commit aborted: {reason}")]
    CommitAborted { reason: String },

    /// The transport is closed or unreachable.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// At-least-once, per-key-ordered pub/sub transport with transactional
/// multi-channel publish.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish all records as one atomic unit under one partition key.
    /// Either every record becomes visible to every group, in order, or
    /// none do.
    async fn publish_transactional(
        &self,
        key: &str,
        records: Vec<ChannelRecord>,
    ) -> Result<(), TransportError>;

    /// Publish a single record outside any transaction scope.
    async fn publish(
        &self,
        channel: Channel,
        key: &str,
        event: BusinessEvent,
    ) -> Result<(), TransportError>;

    /// Join `group` on `channel`. Subscribers sharing a group compete
    /// for deliveries; distinct groups each see the full channel.
    fn subscribe(&self, channel: Channel, group: &str) -> Box<dyn Subscriber>;
}

/// A group member's handle onto one channel.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Wait for the next delivery. `None` means the transport closed.
    async fn next(&mut self) -> Option<Delivery>;

    /// The delivery is finished and must not be redelivered.
    async fn ack(&mut self, delivery: Delivery);

    /// Processing failed; the transport redelivers from the head of the
    /// key's queue, or dead-letters once the attempt budget is spent.
    async fn nack(&mut self, delivery: Delivery);
}
