/*!
 * Configuration management for miioflow.
 *
 * Settings are layered: built-in defaults, then an optional TOML file, then
 * environment variables (`MIIOFLOW__SECTION__KEY`).
 */
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use config::{Config as ConfigLib, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Default polling interval in seconds
pub const DEFAULT_POLLING_INTERVAL_SECS: u64 = 30;

/// Top-level miioflow configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Deadlines and backoff shared by all device schedulers
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Devices to manage
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (trace, debug, info, warn, error or an EnvFilter directive)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to include the event target in log lines
    #[serde(default = "default_true")]
    pub with_target: bool,
}

/// Deadlines and offline backoff applied to device operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Deadline for establishing a device connection
    #[serde(default = "default_init_timeout_ms")]
    pub init_timeout_ms: u64,

    /// Deadline for a single device operation (property wait, setter call)
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    /// Deadline for an explicit one-shot property fetch
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// How long to stop connecting after a failed connection attempt
    #[serde(default = "default_offline_backoff_ms")]
    pub offline_backoff_ms: u64,
}

/// Configuration of a single device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device id (DID)
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Room the device is placed in
    #[serde(default)]
    pub room: String,

    /// Model tag, e.g. `xiaomi.kettle.v20`
    pub model: String,

    /// Network address of the device
    pub address: String,

    /// Device auth token
    #[serde(default)]
    pub token: String,

    /// Polling settings
    #[serde(default)]
    pub polling: PollingConfig,
}

/// Auto-polling settings of a device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Whether the device is polled periodically
    #[serde(default)]
    pub enabled: bool,

    /// Polling interval in seconds; unset means the default of 30
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: true,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            init_timeout_ms: default_init_timeout_ms(),
            operation_timeout_ms: default_operation_timeout_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            offline_backoff_ms: default_offline_backoff_ms(),
        }
    }
}

impl SchedulerConfig {
    /// Connection deadline
    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    /// Per-operation deadline
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// One-shot fetch deadline
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Offline backoff window
    pub fn offline_backoff(&self) -> Duration {
        Duration::from_millis(self.offline_backoff_ms)
    }
}

impl PollingConfig {
    /// Polling enabled with the given interval
    pub fn every(interval_secs: u64) -> Self {
        Self {
            enabled: true,
            interval_secs: Some(interval_secs),
        }
    }

    /// The effective polling interval
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.unwrap_or(DEFAULT_POLLING_INTERVAL_SECS))
    }

    /// Whether a polling loop should run at all
    pub fn is_active(&self) -> bool {
        self.enabled && !self.interval().is_zero()
    }
}

impl DeviceConfig {
    /// Label used in logs and user-facing messages, `name - room`
    pub fn display_name(&self) -> String {
        match (self.name.is_empty(), self.room.is_empty()) {
            (true, _) => self.id.clone(),
            (false, true) => self.name.clone(),
            (false, false) => format!("{} - {}", self.name, self.room),
        }
    }
}

impl Config {
    /// Check the configuration for values the schedulers cannot work with
    pub fn validate(&self) -> Result<()> {
        let timings = [
            ("init_timeout_ms", self.scheduler.init_timeout_ms),
            ("operation_timeout_ms", self.scheduler.operation_timeout_ms),
            ("fetch_timeout_ms", self.scheduler.fetch_timeout_ms),
        ];
        for (name, value) in timings {
            if value == 0 {
                return Err(Error::config(format!("scheduler.{} must be greater than 0", name)));
            }
        }

        let mut seen = HashSet::new();
        for device in &self.devices {
            if device.id.trim().is_empty() {
                return Err(Error::config("device id must not be empty"));
            }
            if device.address.trim().is_empty() {
                return Err(Error::config(format!("device {} has no address", device.id)));
            }
            if device.model.trim().is_empty() {
                return Err(Error::config(format!("device {} has no model", device.id)));
            }
            if !seen.insert(device.id.as_str()) {
                return Err(Error::config(format!("device {} is configured twice", device.id)));
            }
        }

        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_init_timeout_ms() -> u64 {
    1500
}

fn default_operation_timeout_ms() -> u64 {
    1500
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

fn default_offline_backoff_ms() -> u64 {
    5000
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

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        let mut config_builder = ConfigLib::builder()
            .set_default("scheduler.init_timeout_ms", default_init_timeout_ms() as i64)
            .and_then(|b| {
                b.set_default("scheduler.operation_timeout_ms", default_operation_timeout_ms() as i64)
            })
            .and_then(|b| b.set_default("scheduler.fetch_timeout_ms", default_fetch_timeout_ms() as i64))
            .and_then(|b| {
                b.set_default("scheduler.offline_backoff_ms", default_offline_backoff_ms() as i64)
            })
            .and_then(|b| b.set_default("logging.level", default_log_level()))
            .map_err(|e| Error::config(format!("Failed to set defaults: {}", e)))?;

        if let Some(config_file) = self.config_file {
            let path = Path::new(&config_file);
            if path.exists() {
                debug!("Loading configuration from {}", config_file);
                config_builder = config_builder.add_source(File::with_name(&config_file));
            } else {
                debug!("Configuration file {} does not exist, using defaults", config_file);
            }
        }

        if let Some(prefix) = self.environment_prefix {
            debug!("Loading configuration from environment variables with prefix {}", prefix);
            config_builder = config_builder.add_source(
                Environment::with_prefix(&prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: Config = config_builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build configuration: {}", e)))?
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize configuration: {}", e)))?;

        config.validate()?;

        info!("Configuration loaded with {} device(s)", config.devices.len());
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
