//! In-process [`EventBus`] implementation.
//!
//! Every committed record is appended to a per-channel log, then fanned
//! out to the queues of each consumer group on that channel. A group
//! created after publishing replays the channel log from the start.
//!
//! Delivery semantics per group:
//!
//! - at-least-once: a delivery stays owned by its partition key until
//!   the subscriber acks or nacks it
//! - per-key order: at most one delivery per key is in flight, and a
//!   nacked delivery is requeued at the head of its key's queue
//! - a delivery nacked at its final attempt is moved to the group's
//!   dead letters instead of being requeued
//!
//! Fault injection is one-shot: an armed fault fires on the first
//! publish it applies to and then disarms.

use crate::bus::{Channel, ChannelRecord, Delivery, EventBus, Subscriber, TransportError};
use crate::events::BusinessEvent;
use crate::utils::lock;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tracing::warn;

/// Redelivery budget per delivery before it is dead-lettered.
pub const DEFAULT_MAX_DELIVERY_ATTEMPTS: u32 = 5;

// ---------------------------------------------------------------------------
// Group state
// ---------------------------------------------------------------------------

struct QueuedEvent {
    event: BusinessEvent,
    attempt: u32,
}

/// Queues of one consumer group on one channel.
///
/// Invariant: every key in `ready` has a non-empty queue and is not in
/// flight. `enqueue` and `release` are the only writers of `ready`.
#[derive(Default)]
struct GroupQueues {
    queues: HashMap<String, VecDeque<QueuedEvent>>,
    ready: VecDeque<String>,
    in_flight: HashSet<String>,
    dead: Vec<BusinessEvent>,
    acked: u64,
}

impl GroupQueues {
    fn enqueue(&mut self, key: &str, event: BusinessEvent) {
        let queue = self.queues.entry(key.to_string()).or_default();
        let was_idle = queue.is_empty() && !self.in_flight.contains(key);
        queue.push_back(QueuedEvent { event, attempt: 1 });
        if was_idle {
            self.ready.push_back(key.to_string());
        }
    }

    fn pop_ready(&mut self) -> Option<Delivery> {
        let key = self.ready.pop_front()?;
        let queued = self.queues.get_mut(&key)?.pop_front()?;
        self.in_flight.insert(key.clone());
        Some(Delivery {
            event: queued.event,
            key,
            attempt: queued.attempt,
        })
    }

    /// Returns the key to rotation after its in-flight delivery settled.
    fn release(&mut self, key: &str) {
        self.in_flight.remove(key);
        match self.queues.get(key) {
            Some(queue) if !queue.is_empty() => self.ready.push_back(key.to_string()),
            _ => {
                self.queues.remove(key);
            }
        }
    }

    fn requeue_front(&mut self, key: &str, event: BusinessEvent, attempt: u32) {
        self.queues
            .entry(key.to_string())
            .or_default()
            .push_front(QueuedEvent { event, attempt });
    }
}

struct GroupShared {
    queues: Mutex<GroupQueues>,
    notify: Notify,
}

impl GroupShared {
    fn new() -> Self {
        Self {
            queues: Mutex::new(GroupQueues::default()),
            notify: Notify::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Bus
// ---------------------------------------------------------------------------

#[derive(Default)]
struct BusInner {
    /// Commit log per channel, in publish order.
    log: HashMap<Channel, Vec<(String, BusinessEvent)>>,
    groups: HashMap<(Channel, String), Arc<GroupShared>>,
}

#[derive(Default)]
struct FaultPlan {
    publish: Vec<Channel>,
    commit: u32,
}

impl FaultPlan {
    fn take_publish_fault(&mut self, channel: Channel) -> bool {
        match self.publish.iter().position(|armed| *armed == channel) {
            Some(index) => {
                self.publish.remove(index);
                true
            }
            None => false,
        }
    }

    fn take_commit_fault(&mut self) -> bool {
        if self.commit == 0 {
            return false;
        }
        self.commit -= 1;
        true
    }
}

/// In-memory bus. Cheap to create per test; the server holds one in an
/// [`Arc`] shared by the publisher and every worker.
pub struct InMemoryBus {
    inner: Mutex<BusInner>,
    faults: Mutex<FaultPlan>,
    closed: Arc<AtomicBool>,
    max_attempts: u32,
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::with_max_attempts(DEFAULT_MAX_DELIVERY_ATTEMPTS)
    }

    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            inner: Mutex::new(BusInner::default()),
            faults: Mutex::new(FaultPlan::default()),
            closed: Arc::new(AtomicBool::new(false)),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Reject the next record published to `channel`, once.
    pub fn fail_next_publish(&self, channel: Channel) {
        lock(&self.faults).publish.push(channel);
    }

    /// Abort the next transactional commit, once.
    pub fn fail_next_commit(&self) {
        lock(&self.faults).commit += 1;
    }

    /// Every event committed to `channel`, in publish order.
    pub fn published(&self, channel: Channel) -> Vec<BusinessEvent> {
        lock(&self.inner)
            .log
            .get(&channel)
            .map(|entries| entries.iter().map(|(_, event)| event.clone()).collect())
            .unwrap_or_default()
    }

    /// Dead-lettered events of one group.
    pub fn dead_letters(&self, channel: Channel, group: &str) -> Vec<BusinessEvent> {
        match self.group(channel, group) {
            Some(shared) => lock(&shared.queues).dead.clone(),
            None => Vec::new(),
        }
    }

    /// Number of deliveries the group has acked.
    pub fn acked(&self, channel: Channel, group: &str) -> u64 {
        match self.group(channel, group) {
            Some(shared) => lock(&shared.queues).acked,
            None => 0,
        }
    }

    /// Stop accepting publishes and wake every subscriber. Subscribers
    /// drain what is already queued, then their `next` returns `None`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let groups: Vec<Arc<GroupShared>> =
            lock(&self.inner).groups.values().map(Arc::clone).collect();
        for shared in groups {
            shared.notify.notify_waiters();
        }
    }

    fn group(&self, channel: Channel, group: &str) -> Option<Arc<GroupShared>> {
        lock(&self.inner)
            .groups
            .get(&(channel, group.to_string()))
            .map(Arc::clone)
    }

    /// Appends to the channel logs and fans out to group queues.
    ///
    /// Lock order is `inner` then group queues; subscribers only ever
    /// take group queue locks.
    fn commit(&self, key: &str, records: &[ChannelRecord]) {
        let mut to_wake: Vec<Arc<GroupShared>> = Vec::new();
        let mut inner = lock(&self.inner);
        for record in records {
            inner
                .log
                .entry(record.channel)
                .or_default()
                .push((key.to_string(), record.event.clone()));
        }
        for record in records {
            for ((channel, _), shared) in &inner.groups {
                if *channel == record.channel {
                    lock(&shared.queues).enqueue(key, record.event.clone());
                    to_wake.push(Arc::clone(shared));
                }
            }
        }
        drop(inner);
        for shared in to_wake {
            shared.notify.notify_waiters();
        }
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Unavailable("bus is closed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn publish_transactional(
        &self,
        key: &str,
        records: Vec<ChannelRecord>,
    ) -> Result<(), TransportError> {
        self.ensure_open()?;
        {
            let mut faults = lock(&self.faults);
            for record in &records {
                if faults.take_publish_fault(record.channel) {
                    return Err(TransportError::Rejected {
                        channel: record.channel,
                        reason: "injected publish fault".to_string(),
                    });
                }
            }
            if faults.take_commit_fault() {
                return Err(TransportError::CommitAborted {
                    reason: "injected commit fault".to_string(),
                });
            }
        }
        self.commit(key, &records);
        Ok(())
    }

    async fn publish(
        &self,
        channel: Channel,
        key: &str,
        event: BusinessEvent,
    ) -> Result<(), TransportError> {
        self.ensure_open()?;
        {
            let mut faults = lock(&self.faults);
            if faults.take_publish_fault(channel) {
                return Err(TransportError::Rejected {
                    channel,
                    reason: "injected publish fault".to_string(),
                });
            }
        }
        self.commit(key, &[ChannelRecord::new(channel, event)]);
        Ok(())
    }

    fn subscribe(&self, channel: Channel, group: &str) -> Box<dyn Subscriber> {
        let group_key = (channel, group.to_string());
        let shared = {
            let mut inner = lock(&self.inner);
            match inner.groups.get(&group_key) {
                Some(shared) => Arc::clone(shared),
                None => {
                    let shared = Arc::new(GroupShared::new());
                    // New groups replay the channel from the beginning.
                    {
                        let mut queues = lock(&shared.queues);
                        if let Some(entries) = inner.log.get(&channel) {
                            for (key, event) in entries {
                                queues.enqueue(key, event.clone());
                            }
                        }
                    }
                    inner.groups.insert(group_key, Arc::clone(&shared));
                    shared
                }
            }
        };
        Box::new(GroupSubscriber {
            shared,
            closed: Arc::clone(&self.closed),
            max_attempts: self.max_attempts,
        })
    }
}

// ---------------------------------------------------------------------------
// Subscriber
// ---------------------------------------------------------------------------

struct GroupSubscriber {
    shared: Arc<GroupShared>,
    closed: Arc<AtomicBool>,
    max_attempts: u32,
}

impl GroupSubscriber {
    fn try_pop(&self) -> Option<Delivery> {
        lock(&self.shared.queues).pop_ready()
    }
}

#[async_trait]
impl Subscriber for GroupSubscriber {
    async fn next(&mut self) -> Option<Delivery> {
        let notified = self.shared.notify.notified();
        tokio::pin!(notified);
        loop {
            // Register interest before checking the queues so a wakeup
            // between the check and the await is not lost. A delivery is
            // popped in the same poll that returns it, so cancelling
            // `next` cannot drop one.
            notified.as_mut().enable();
            if let Some(delivery) = self.try_pop() {
                return Some(delivery);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            notified.as_mut().await;
            notified.set(self.shared.notify.notified());
        }
    }

    async fn ack(&mut self, delivery: Delivery) {
        {
            let mut queues = lock(&self.shared.queues);
            queues.acked += 1;
            queues.release(&delivery.key);
        }
        self.shared.notify.notify_waiters();
    }

    async fn nack(&mut self, delivery: Delivery) {
        {
            let mut queues = lock(&self.shared.queues);
            if delivery.attempt >= self.max_attempts {
                warn!(
                    key = %delivery.key,
                    attempt = delivery.attempt,
                    "Delivery attempts exhausted, dead-lettering"
                );
                queues.dead.push(delivery.event);
            } else {
                queues.requeue_front(&delivery.key, delivery.event, delivery.attempt + 1);
            }
            queues.release(&delivery.key);
        }
        self.shared.notify.notify_waiters();
    }
}
