/*!
 * Events published by a device scheduler.
 */
use miioflow_core::types::{PropertySnapshot, Value};

use crate::command::BatchCommand;

/// Notifications raised at the edge of a device scheduler
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// First successful poll of the device
    Init {
        /// The first snapshot
        snapshot: PropertySnapshot,
    },
    /// A poll found at least one changed property
    Changed {
        /// The full new snapshot
        snapshot: PropertySnapshot,
        /// Keys whose values differ from the previous snapshot
        keys: Vec<String>,
    },
    /// A poll failed (skips during offline backoff are not reported)
    PollError {
        /// Error message, including the device address
        message: String,
    },
    /// A single command was delivered
    CommandSent {
        /// Command name
        name: String,
        /// Argument as given
        value: Value,
    },
    /// A single command failed
    CommandFailed {
        /// Error message
        message: String,
        /// Command name
        name: String,
    },
    /// A batch entry failed, or the whole batch failed before its first entry
    BatchCommandFailed {
        /// Error message
        message: String,
        /// The failed entry; `None` when the whole batch failed
        key: Option<String>,
        /// The batch the failure belongs to
        batch: BatchCommand,
    },
}

impl DeviceEvent {
    /// Short name of the event kind, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            DeviceEvent::Init { .. } => "init",
            DeviceEvent::Changed { .. } => "changed",
            DeviceEvent::PollError { .. } => "poll-error",
            DeviceEvent::CommandSent { .. } => "command-sent",
            DeviceEvent::CommandFailed { .. } => "command-failed",
            DeviceEvent::BatchCommandFailed { .. } => "batch-command-failed",
        }
    }

    /// Whether the event reports a failure
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            DeviceEvent::PollError { .. }
                | DeviceEvent::CommandFailed { .. }
                | DeviceEvent::BatchCommandFailed { .. }
        )
    }
}
