/*!
 * miioflow Core
 *
 * This crate provides the shared foundation for the miioflow device
 * scheduler: property values and snapshots, layered configuration, logging
 * setup, typed event channels and deadline helpers.
 */

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod prelude;
pub mod types;
pub mod utils;

/// Re-export of dependencies that are part of the public API
pub mod deps {
    pub use chrono;
    pub use serde;
    pub use serde_json;
    pub use tokio;
    pub use tracing;
    pub use uuid;
}

/// miioflow core crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library initialization
///
/// Installs the default tracing subscriber. Applications that load a
/// [`config::Config`] should call [`logging::init_with_config`] instead.
pub fn init() -> Result<(), error::Error> {
    logging::init()?;
    tracing::info!("miioflow core {} initialized", VERSION);
    Ok(())
}
