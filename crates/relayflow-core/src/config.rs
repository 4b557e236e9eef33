/*!
 * Configuration management for relayflow.
 *
 * This module provides functionality to load, validate, and access
 * configuration settings for the relayflow crates.
 */
use std::path::Path;
use std::sync::Arc;

use config::{Config as ConfigLib, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Core configuration for relayflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General configuration
    #[serde(default)]
    pub general: GeneralConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Bus bridge configuration
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Firmware provider configuration
    #[serde(default)]
    pub firmware: FirmwareConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Application version
    #[serde(default = "default_app_version")]
    pub app_version: String,

    /// Application environment (development, production, etc.)
    #[serde(default = "default_environment")]
    pub environment: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to log to stdout
    #[serde(default = "default_log_stdout")]
    pub stdout: bool,
}

/// Bus bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Hostname of the bus daemon the bridge connects to
    #[serde(default = "default_bridge_host")]
    pub host: String,

    /// TCP port of the bus daemon
    #[serde(default = "default_bridge_port")]
    pub port: u16,

    /// Timeout for a single bus call, in milliseconds
    #[serde(default = "default_bus_timeout_ms")]
    pub bus_timeout_ms: u64,
}

/// Firmware provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirmwareConfig {
    /// Whether the background manifest refresh runs at all
    #[serde(default = "default_firmware_enabled")]
    pub enabled: bool,

    /// URL of the plain-text latest-versions manifest
    #[serde(default = "default_manifest_url")]
    pub manifest_url: String,

    /// Base URL firmware download links are derived from
    #[serde(default = "default_download_base_url")]
    pub download_base_url: String,

    /// Interval between successful manifest fetches, in seconds
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Interval before retrying a failed fetch, in seconds
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            logging: LoggingConfig::default(),
            bridge: BridgeConfig::default(),
            firmware: FirmwareConfig::default(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            app_version: default_app_version(),
            environment: default_environment(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            stdout: default_log_stdout(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: default_bridge_host(),
            port: default_bridge_port(),
            bus_timeout_ms: default_bus_timeout_ms(),
        }
    }
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            enabled: default_firmware_enabled(),
            manifest_url: default_manifest_url(),
            download_base_url: default_download_base_url(),
            refresh_interval_secs: default_refresh_interval_secs(),
            retry_interval_secs: default_retry_interval_secs(),
        }
    }
}

fn default_app_name() -> String {
    "relayflow".to_string()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_stdout() -> bool {
    true
}

fn default_bridge_host() -> String {
    "localhost".to_string()
}

fn default_bridge_port() -> u16 {
    4223
}

fn default_bus_timeout_ms() -> u64 {
    2500
}

fn default_firmware_enabled() -> bool {
    true
}

fn default_manifest_url() -> String {
    "https://downloads.relayflow.dev/firmwares/latest_versions.txt".to_string()
}

fn default_download_base_url() -> String {
    "https://downloads.relayflow.dev/firmwares".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    3600
}

fn default_retry_interval_secs() -> u64 {
    300
}

/// A builder for creating a configuration
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_file: Option<String>,
    environment_prefix: Option<String>,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the config file path
    pub fn with_config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Set the environment variable prefix for configuration
    pub fn with_environment_prefix<S: AsRef<str>>(mut self, prefix: S) -> Self {
        self.environment_prefix = Some(prefix.as_ref().to_string());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<Config> {
        let mut config_builder = ConfigLib::builder();

        // Start with default values
        let default_config = Config::default();
        config_builder = config_builder.add_source(
            config::Config::try_from(&default_config)
                .map_err(|e| Error::config(format!("Failed to create default config: {}", e)))?,
        );

        // Add configuration from file if specified
        if let Some(config_file) = self.config_file {
            let path = Path::new(&config_file);
            if path.exists() {
                debug!("Loading configuration from {}", config_file);
                config_builder = config_builder.add_source(File::with_name(&config_file));
            } else {
                debug!("Configuration file {} does not exist, using defaults", config_file);
            }
        }

        // Add configuration from environment variables if prefix is specified
        if let Some(prefix) = self.environment_prefix {
            debug!("Loading configuration from environment variables with prefix {}", prefix);
            config_builder = config_builder.add_source(
                Environment::with_prefix(&prefix)
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config_lib = config_builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build configuration: {}", e)))?;

        let config: Config = config_lib
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize configuration: {}", e)))?;

        info!("Configuration loaded successfully");
        Ok(config)
    }
}

/// A thread-safe reference to a configuration
#[derive(Debug, Clone)]
pub struct SharedConfig(Arc<Config>);

impl SharedConfig {
    /// Create a new SharedConfig
    pub fn new(config: Config) -> Self {
        Self(Arc::new(config))
    }

    /// Get a reference to the config
    pub fn get(&self) -> &Config {
        &self.0
    }
}

impl From<Config> for SharedConfig {
    fn from(config: Config) -> Self {
        Self::new(config)
    }
}

impl AsRef<Config> for SharedConfig {
    fn as_ref(&self) -> &Config {
        self.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.app_name, "relayflow");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.bridge.port, 4223);
        assert_eq!(config.firmware.refresh_interval_secs, 3600);
        assert!(config.firmware.enabled);
    }

    #[test]
    fn test_config_builder_defaults() {
        let config = ConfigBuilder::new().build().unwrap();
        assert_eq!(config.general.app_name, "relayflow");
        assert_eq!(config.bridge.host, "localhost");
    }

    #[test]
    fn test_config_builder_with_file() -> Result<()> {
        let dir = tempdir().map_err(|e| Error::other(e.to_string()))?;
        let file_path = dir.path().join("config.toml");

        {
            let mut file = File::create(&file_path).map_err(|e| Error::other(e.to_string()))?;
            file.write_all(
                br#"
                [general]
                app_name = "test-app"
                environment = "testing"

                [bridge]
                host = "bus.local"
                bus_timeout_ms = 500

                [firmware]
                enabled = false
            "#,
            )
            .map_err(|e| Error::other(e.to_string()))?;
        }

        let config = ConfigBuilder::new().with_config_file(file_path).build()?;

        assert_eq!(config.general.app_name, "test-app");
        assert_eq!(config.general.environment, "testing");
        assert_eq!(config.bridge.host, "bus.local");
        assert_eq!(config.bridge.bus_timeout_ms, 500);
        assert!(!config.firmware.enabled);
        // Untouched sections keep their defaults
        assert_eq!(config.bridge.port, 4223);

        Ok(())
    }

    #[test]
    fn test_config_builder_with_env() -> Result<()> {
        env::set_var("RELAYFLOW__GENERAL__APP_NAME", "env-app");
        env::set_var("RELAYFLOW__BRIDGE__PORT", "4280");

        let config = ConfigBuilder::new()
            .with_environment_prefix("relayflow")
            .build()?;

        assert_eq!(config.general.app_name, "env-app");
        assert_eq!(config.bridge.port, 4280);

        env::remove_var("RELAYFLOW__GENERAL__APP_NAME");
        env::remove_var("RELAYFLOW__BRIDGE__PORT");

        Ok(())
    }
}
