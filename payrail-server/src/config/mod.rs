//! Configuration module for payrail-server.
//!
//! Handles loading configuration from a TOML file and CLI arguments,
//! and converts the file format into the runtime types the pipeline
//! is wired with.

pub mod file;

use crate::config::file::{ConsumerSection, FileConfig, ProcessingSection};
use payrail_core::config::ConsumerConfig;
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub server: ServerSettings,
    pub consumer: ConsumerConfig,
    pub processing: ProcessingSettings,
    pub bus: BusSettings,
}

/// Runtime server settings.
pub struct ServerSettings {
    pub listen: SocketAddr,
}

/// Runtime settlement timing settings.
pub struct ProcessingSettings {
    pub payment_delay: Duration,
    pub refund_delay: Duration,
}

/// Runtime event bus settings.
pub struct BusSettings {
    pub max_delivery_attempts: u32,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file (a missing file is materialized with defaults)
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        // Read the config file
        let mut file_config = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => toml::from_str::<FileConfig>(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let defaults = FileConfig::default();
                match self.write_config(&defaults) {
                    Ok(()) => tracing::info!(
                        "Config file {:?} not found, wrote defaults",
                        self.config_path
                    ),
                    Err(e) => tracing::warn!(
                        "Config file {:?} not found and could not be written ({}), using defaults",
                        self.config_path,
                        e
                    ),
                }
                defaults
            }
            Err(e) => return Err(e.into()),
        };

        // Apply CLI overrides
        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        // Validate the configuration
        self.validate(&file_config)?;

        Ok(build_loaded_config(file_config))
    }

    fn write_config(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(config)?;

        // Write atomically: write to temp file, then rename
        let temp_path = self.config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, toml_string)?;
        std::fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        if config.consumer.high_value_threshold <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!(
                "high_value_threshold must be positive, got {}",
                config.consumer.high_value_threshold
            )));
        }
        if config.bus.max_delivery_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "max_delivery_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn build_loaded_config(file_config: FileConfig) -> LoadedConfig {
    LoadedConfig {
        server: ServerSettings {
            listen: file_config.server.listen,
        },
        consumer: convert_consumer(file_config.consumer),
        processing: convert_processing(file_config.processing),
        bus: BusSettings {
            max_delivery_attempts: file_config.bus.max_delivery_attempts,
        },
    }
}

fn convert_consumer(c: ConsumerSection) -> ConsumerConfig {
    ConsumerConfig {
        payment_workers: c.payment_workers,
        refund_workers: c.refund_workers,
        notification_workers: c.notification_workers,
        high_value_threshold: c.high_value_threshold,
    }
}

fn convert_processing(p: ProcessingSection) -> ProcessingSettings {
    ProcessingSettings {
        payment_delay: Duration::from_millis(p.payment_delay_ms),
        refund_delay: Duration::from_millis(p.refund_delay_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwritable_path_still_yields_defaults() {
        let loader = ConfigLoader::new("/nonexistent/payrail.toml", None);
        let loaded = loader.load().unwrap();
        assert_eq!(loaded.server.listen.port(), 8080);
        assert_eq!(loaded.consumer.payment_workers, 4);
        assert_eq!(loaded.processing.payment_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_missing_file_is_materialized_with_defaults() {
        let path = std::env::temp_dir().join(format!("payrail-config-{}.toml", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let loader = ConfigLoader::new(&path, None);
        let loaded = loader.load().unwrap();
        assert_eq!(loaded.consumer.payment_workers, 4);

        let written = std::fs::read_to_string(&path).unwrap();
        let reparsed: FileConfig = toml::from_str(&written).unwrap();
        assert_eq!(reparsed.server.listen.port(), 8080);
        assert_eq!(reparsed.bus.max_delivery_attempts, loaded.bus.max_delivery_attempts);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_listen_override_wins() {
        let listen = "127.0.0.1:9999".parse().unwrap();
        let loader = ConfigLoader::new("/nonexistent/payrail.toml", Some(listen));
        let loaded = loader.load().unwrap();
        assert_eq!(loaded.server.listen, listen);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let loader = ConfigLoader::new("/nonexistent/payrail.toml", None);
        let mut config = FileConfig::default();
        config.bus.max_delivery_attempts = 0;
        let err = loader.validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
