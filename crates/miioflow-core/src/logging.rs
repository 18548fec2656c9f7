/*!
 * Logging functionality for miioflow.
 *
 * Tracing subscriber setup plus the spans used by the device schedulers.
 */
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Initialize the logging system with default configuration
pub fn init() -> Result<()> {
    init_with_config(&LoggingConfig::default())
}

/// Initialize the logging system from the logging section of the config
pub fn init_with_config(config: &LoggingConfig) -> Result<()> {
    init_with_filter(&config.level, config.with_target)
}

/// Initialize the logging system with a specific filter
///
/// `RUST_LOG` takes precedence over `filter` when it is set.
///
/// # Arguments
///
/// * `filter` - The log filter string (e.g., "info", "debug", "miioflow_engine=trace")
/// * `with_target` - Whether to print the event target
pub fn init_with_filter(filter: &str, with_target: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .map_err(|e| Error::logging(format!("Invalid log filter {}: {}", filter, e)))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(with_target))
        .with(filter)
        .try_init()
        .map_err(|e| Error::logging(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}

/// A type alias for a tracing span
pub type Span = tracing::Span;

/// Span covering everything a device scheduler does
pub fn device_span(id: &str, address: &str) -> Span {
    tracing::info_span!("device", id = %id, address = %address)
}

/// Span covering a single queued device operation
///
/// # Arguments
///
/// * `label` - Operation label, e.g. `refresh` or `device.setTargetTemperature`
/// * `operation_id` - Correlation id of the queued operation
pub fn operation_span(label: &str, operation_id: &str) -> Span {
    tracing::debug_span!("operation", label = %label, op = %operation_id)
}
