//! Event payloads and routing metadata for the payment pipeline.
//!
//! # Event Flow
//!
//! 1. `PaymentRequest` / `RefundRequest` -> `EventPublisher`
//! 2. `EventPublisher` publishes `BusinessEvent`s transactionally to the
//!    bus channels, keyed by user
//! 3. Channel workers claim, settle, and acknowledge deliveries
//! 4. `NotificationDispatcher` fans out to the configured sinks
//!
//! Events are self-contained: they carry the full business payload, so
//! consumers never reach back into producer-side state.

pub mod types;

pub use types::{BusinessEvent, InvalidPayload};
