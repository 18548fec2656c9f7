/*!
 * miioflow Engine
 *
 * This crate provides the per-device operation scheduler: a single-flight
 * queue per device connection, deadline-bounded device calls, offline
 * backoff, periodic polling with change detection, and command dispatch.
 */

#![warn(missing_docs)]

// Re-export core types
pub use miioflow_core::prelude;

// Re-export types from miioflow_core for convenience
pub use miioflow_core::types::{Id, PropertyMap, PropertySnapshot, Value};

pub mod backoff;
pub mod change;
pub mod command;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod hub;
pub mod poll;
pub mod queue;
pub mod scheduler;
pub mod session;

// Re-export main types for convenience
pub use backoff::OfflineBackoff;
pub use change::{detect, Change};
pub use command::{BatchCommand, BatchFailure};
pub use dispatcher::CommandDispatcher;
pub use error::{Error, Result};
pub use events::DeviceEvent;
pub use hub::DeviceHub;
pub use poll::PollLoop;
pub use queue::{OperationQueue, PendingOperation, QueueError};
pub use scheduler::{DeviceScheduler, PropertyNaming};
pub use session::{DeviceSession, SessionTimings};

/// miioflow engine crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the engine
pub fn init() -> Result<()> {
    tracing::info!("miioflow engine {} initialized", VERSION);
    Ok(())
}
