//! TOML file configuration structures.
//!
//! These structs directly map to the `payrail.toml` file format. Every
//! section and field is optional; a missing entry falls back to the
//! defaults below.

use payrail_core::bus::DEFAULT_MAX_DELIVERY_ATTEMPTS;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub consumer: ConsumerSection,
    #[serde(default)]
    pub processing: ProcessingSection,
    #[serde(default)]
    pub bus: BusSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("valid default address")
}

/// Consumer worker pool configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerSection {
    /// Number of payment settlement workers.
    #[serde(default = "default_payment_workers")]
    pub payment_workers: usize,
    /// Number of refund settlement workers.
    #[serde(default = "default_refund_workers")]
    pub refund_workers: usize,
    /// Number of notification dispatch workers.
    #[serde(default = "default_notification_workers")]
    pub notification_workers: usize,
    /// Payments strictly above this amount are flagged for review.
    #[serde(default = "default_high_value_threshold")]
    pub high_value_threshold: Decimal,
}

impl Default for ConsumerSection {
    fn default() -> Self {
        Self {
            payment_workers: default_payment_workers(),
            refund_workers: default_refund_workers(),
            notification_workers: default_notification_workers(),
            high_value_threshold: default_high_value_threshold(),
        }
    }
}

fn default_payment_workers() -> usize {
    4
}

fn default_refund_workers() -> usize {
    2
}

fn default_notification_workers() -> usize {
    2
}

fn default_high_value_threshold() -> Decimal {
    Decimal::from(10_000)
}

/// Settlement timing configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingSection {
    /// Simulated payment settlement time in milliseconds.
    #[serde(default = "default_payment_delay_ms")]
    pub payment_delay_ms: u64,
    /// Simulated refund settlement time in milliseconds.
    #[serde(default = "default_refund_delay_ms")]
    pub refund_delay_ms: u64,
}

impl Default for ProcessingSection {
    fn default() -> Self {
        Self {
            payment_delay_ms: default_payment_delay_ms(),
            refund_delay_ms: default_refund_delay_ms(),
        }
    }
}

fn default_payment_delay_ms() -> u64 {
    500
}

fn default_refund_delay_ms() -> u64 {
    300
}

/// Event bus configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusSection {
    /// Delivery attempts per event before it is dead-lettered.
    #[serde(default = "default_max_delivery_attempts")]
    pub max_delivery_attempts: u32,
}

impl Default for BusSection {
    fn default() -> Self {
        Self {
            max_delivery_attempts: default_max_delivery_attempts(),
        }
    }
}

fn default_max_delivery_attempts() -> u32 {
    DEFAULT_MAX_DELIVERY_ATTEMPTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[consumer]
payment_workers = 8
refund_workers = 3
notification_workers = 1
high_value_threshold = 50000

[processing]
payment_delay_ms = 10
refund_delay_ms = 5

[bus]
max_delivery_attempts = 3
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.consumer.payment_workers, 8);
        assert_eq!(config.consumer.high_value_threshold, Decimal::from(50_000));
        assert_eq!(config.processing.refund_delay_ms, 5);
        assert_eq!(config.bus.max_delivery_attempts, 3);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.listen.port(), 8080);
        assert_eq!(config.consumer.payment_workers, 4);
        assert_eq!(config.consumer.notification_workers, 2);
        assert_eq!(config.consumer.high_value_threshold, Decimal::from(10_000));
        assert_eq!(config.processing.payment_delay_ms, 500);
        assert_eq!(config.bus.max_delivery_attempts, DEFAULT_MAX_DELIVERY_ATTEMPTS);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let toml_str = r#"
[consumer]
payment_workers = 1
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.consumer.payment_workers, 1);
        assert_eq!(config.consumer.refund_workers, 2);
        assert_eq!(config.consumer.high_value_threshold, Decimal::from(10_000));
    }
}
