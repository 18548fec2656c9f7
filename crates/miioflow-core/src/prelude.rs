/*!
 * Prelude module for miioflow Core.
 *
 * Re-exports the types most code in the device and engine crates needs.
 */

// Re-export error types
pub use crate::error::{Error, Result, TimedOut};

// Re-export core types
pub use crate::types::{Id, PropertyMap, PropertySnapshot, Value};

// Re-export event types
pub use crate::event::{recv_lossy, Envelope, EventChannel};

// Re-export config types
pub use crate::config::{
    Config, ConfigBuilder, DeviceConfig, PollingConfig, SchedulerConfig, SharedConfig,
};

// Re-export utility functions
pub use crate::utils::{duration_to_millis, with_deadline};

// Re-export logging helpers
pub use crate::logging::{device_span, operation_span};
pub use tracing::{debug, error, info, trace, warn};

// Re-export core initialization
pub use crate::init;
