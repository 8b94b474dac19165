//! Duplicate suppression for at-least-once delivery.
//!
//! The bus may hand the same event to a group more than once. Workers
//! claim the event id before doing any work and skip the event when the
//! claim is refused. A claim that never reaches [`mark_success`] stays
//! `InProgress`, which keeps a crashed-mid-work event from running a
//! second time.
//!
//! [`mark_success`]: IdempotencyGuard::mark_success

use crate::utils::lock;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Mutex;
use uuid::Uuid;

/// Lifecycle of a claimed event id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingState {
    InProgress,
    Success,
}

/// Claim registry keyed by event id.
///
/// `claim` returns `true` exactly once per id, no matter how many
/// workers race on it. Calls are short and non-blocking, so the trait
/// stays synchronous.
pub trait IdempotencyGuard: Send + Sync {
    /// Take ownership of `id`. `false` means another worker already
    /// holds or finished it.
    fn claim(&self, id: Uuid) -> bool;

    /// Record that the claimed work for `id` finished.
    fn mark_success(&self, id: Uuid);
}

/// Process-local [`IdempotencyGuard`].
#[derive(Default)]
pub struct InMemoryIdempotencyGuard {
    records: Mutex<HashMap<Uuid, ProcessingState>>,
}

impl InMemoryIdempotencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `id`, if it was ever claimed.
    pub fn state(&self, id: Uuid) -> Option<ProcessingState> {
        lock(&self.records).get(&id).copied()
    }
}

impl IdempotencyGuard for InMemoryIdempotencyGuard {
    fn claim(&self, id: Uuid) -> bool {
        match lock(&self.records).entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(ProcessingState::InProgress);
                true
            }
        }
    }

    fn mark_success(&self, id: Uuid) {
        if let Some(state) = lock(&self.records).get_mut(&id) {
            *state = ProcessingState::Success;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    #[test]
    fn test_concurrent_claims_have_one_winner() {
        let guard = InMemoryIdempotencyGuard::new();
        let id = Uuid::new_v4();
        let barrier = Barrier::new(16);

        let winners = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        guard.claim(id)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or(false))
                .filter(|won| *won)
                .count()
        });

        assert_eq!(winners, 1);
        assert_eq!(guard.state(id), Some(ProcessingState::InProgress));
    }

    #[test]
    fn test_claim_is_refused_after_success() {
        let guard = InMemoryIdempotencyGuard::new();
        let id = Uuid::new_v4();

        assert!(guard.claim(id));
        guard.mark_success(id);
        assert!(!guard.claim(id));
        assert_eq!(guard.state(id), Some(ProcessingState::Success));
    }

    #[test]
    fn test_mark_success_without_claim_is_ignored() {
        let guard = InMemoryIdempotencyGuard::new();
        let id = Uuid::new_v4();

        guard.mark_success(id);
        assert_eq!(guard.state(id), None);
    }
}
