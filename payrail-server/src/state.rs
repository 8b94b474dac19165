//! Application state shared across all request handlers.

use payrail_core::publisher::EventPublisher;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (the publisher holds the
/// event bus behind an Arc).
#[derive(Clone)]
pub struct AppState {
    /// Producer handle that publishes onto the event bus.
    pub publisher: EventPublisher,
}

impl AppState {
    /// Create a new AppState with the given publisher.
    pub fn new(publisher: EventPublisher) -> Self {
        Self { publisher }
    }
}
