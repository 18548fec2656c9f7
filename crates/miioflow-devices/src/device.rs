/*!
 * Core device abstractions.
 *
 * This module defines the error type, identity and connection state shared
 * by every device client and model definition.
 */
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use miioflow_core::{config::DeviceConfig, error::Error as CoreError, types::Id};

/// Error type for device operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    /// The device is not connected
    #[error("Device not connected")]
    NotConnected,

    /// The client or the device reported a protocol failure
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The device answered an action with a non-success code
    #[error("Could not perform operation {action} (code {})", display_code(.code))]
    ActionRejected {
        /// Name of the rejected action
        action: String,
        /// Result code returned by the device, if any
        code: Option<i64>,
    },

    /// The command name is not known for the device model
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// The command argument failed validation
    #[error("{message}")]
    InvalidArgument {
        /// Command the argument was meant for
        command: String,
        /// Validation message
        message: String,
    },

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

fn display_code(code: &Option<i64>) -> String {
    code.map(|c| c.to_string()).unwrap_or_else(|| "missing".to_string())
}

impl DeviceError {
    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        DeviceError::Protocol(msg.into())
    }

    /// Create a new invalid argument error
    pub fn invalid_argument<C: Into<String>, S: Into<String>>(command: C, message: S) -> Self {
        DeviceError::InvalidArgument {
            command: command.into(),
            message: message.into(),
        }
    }
}

impl From<CoreError> for DeviceError {
    fn from(err: CoreError) -> Self {
        DeviceError::Other(err.to_string())
    }
}

/// Result type for device operations
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Identity of a single device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// The device ID (DID)
    pub id: Id,
    /// The model tag, e.g. `careli.fryer.maf07`
    pub model: String,
    /// Network address
    pub address: String,
    /// Auth token
    pub token: String,
    /// Display name
    pub name: String,
}

impl DeviceInfo {
    /// Create device info from its configuration entry
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self {
            id: Id::from_string(&config.id),
            model: config.model.clone(),
            address: config.address.clone(),
            token: config.token.clone(),
            name: config.display_name(),
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} @ {})", self.id, self.model, self.address)
    }
}

/// Connection state of a device session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No connection is held
    #[default]
    Disconnected,
    /// A connection attempt is in flight
    Connecting,
    /// The connection is established
    Ready,
    /// The connection is being released
    Disconnecting,
}

impl ConnectionState {
    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Ready => "ready",
            ConnectionState::Disconnecting => "disconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
