/*!
 * miioflow Devices
 *
 * This crate provides the device client contract and the MIoT model
 * definitions (properties, setters and actions) used by the scheduler.
 */

#![warn(missing_docs)]

// Re-export core types
pub use miioflow_core::prelude;

pub mod device;
pub mod devices;
pub mod model;
pub mod protocol;
pub mod registry;

// Re-export the client contract and model types
pub use device::{ConnectionState, DeviceError, DeviceInfo};
pub use model::{Command, CommandRegistry, ModelDefinition, PropertySpec};
pub use protocol::{miot_action, ClientFactory, MiioClient};
pub use registry::ModelRegistry;

/// miioflow devices crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the device system
///
/// Registers the built-in models.
pub fn init() -> Result<(), DeviceError> {
    let models = ModelRegistry::builtin().models();
    tracing::info!(
        "miioflow devices {} initialized with models: {}",
        VERSION,
        models.join(", ")
    );
    Ok(())
}
