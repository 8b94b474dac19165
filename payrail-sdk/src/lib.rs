//! Wire types for the Payrail payment pipeline.
//!
//! This crate holds the payloads shared by the producer and consumer
//! sides: inbound request bodies, the events carried on the bus
//! channels, and the closed enums they reference. It has no runtime
//! logic of its own.

pub mod objects;
