#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod bus;
pub mod config;
pub mod consumer;
pub mod events;
pub mod idempotency;
pub mod notify;
pub mod publisher;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
