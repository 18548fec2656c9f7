/*!
 * Error types for the miioflow engine crate.
 */
use thiserror::Error;

use miioflow_core::error::{Error as CoreError, TimedOut};
use miioflow_devices::DeviceError;

use crate::queue::QueueError;

/// Error type for miioflow engine operations
#[derive(Error, Debug)]
pub enum Error {
    /// The connection handshake did not finish within the init deadline
    #[error("Mihome Exception. IP: {address} -> {label} timed out after {after_ms}ms")]
    ConnectTimeout {
        /// Device address
        address: String,
        /// Operation label
        label: String,
        /// Deadline in milliseconds
        after_ms: u64,
    },

    /// A property wait or setter call did not finish within the operation deadline
    #[error("Mihome Exception. IP: {address} -> {label} timed out after {after_ms}ms")]
    OperationTimeout {
        /// Device address
        address: String,
        /// Operation label
        label: String,
        /// Deadline in milliseconds
        after_ms: u64,
    },

    /// The client reported a protocol failure
    #[error("Mihome Exception. IP: {address} -> {label}: {message}")]
    Protocol {
        /// Device address
        address: String,
        /// Operation label
        label: String,
        /// Failure reported by the client
        message: String,
    },

    /// The device answered an action with a non-success code
    #[error("Mihome Exception. IP: {address} -> Could not perform operation {action} (code {})", code_text(.code))]
    ActionRejected {
        /// Device address
        address: String,
        /// Action name
        action: String,
        /// Result code, if the device sent one
        code: Option<i64>,
    },

    /// The command name is not registered for the device model
    #[error("Unknown command: {name} (device {address})")]
    UnknownCommand {
        /// Device address
        address: String,
        /// Command name
        name: String,
    },

    /// A command argument or payload failed validation
    #[error("{}", argument_text(.address, .command, .message))]
    InvalidArgument {
        /// Device address, when a device was involved
        address: Option<String>,
        /// Command the argument was meant for
        command: String,
        /// Validation message
        message: String,
    },

    /// Connection suppressed because the device recently failed to connect
    #[error("Device {address} is offline, next attempt in {remaining_ms}ms")]
    Offline {
        /// Device address
        address: String,
        /// Time left in the backoff window
        remaining_ms: u64,
    },

    /// The queue worker is gone
    #[error("Operation queue for {address} closed before {label} completed")]
    QueueClosed {
        /// Device address
        address: String,
        /// Operation label
        label: String,
    },

    /// A queued operation as a whole exceeded its deadline
    #[error("{label} on {address} timed out after {after_ms}ms")]
    Deadline {
        /// Device address
        address: String,
        /// Operation label
        label: String,
        /// Deadline in milliseconds
        after_ms: u64,
    },

    /// A queued operation panicked
    #[error("{label} on {address} panicked")]
    Panicked {
        /// Device address
        address: String,
        /// Operation label
        label: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for miioflow engine operations
pub type Result<T> = std::result::Result<T, Error>;

fn code_text(code: &Option<i64>) -> String {
    code.map(|c| c.to_string()).unwrap_or_else(|| "missing".to_string())
}

fn argument_text(address: &Option<String>, command: &str, message: &str) -> String {
    match address {
        Some(address) => format!("Mihome Exception. IP: {} -> {}: {}", address, command, message),
        None => message.to_string(),
    }
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: AsRef<str>>(msg: S) -> Self {
        Error::Config(msg.as_ref().to_string())
    }

    /// Attribute a client error to a device and operation
    ///
    /// # Arguments
    ///
    /// * `address` - Device address
    /// * `label` - Operation label, e.g. `device.setTargetTime`
    /// * `err` - The client error
    pub fn device<A: Into<String>, L: Into<String>>(address: A, label: L, err: DeviceError) -> Self {
        let address = address.into();
        match err {
            DeviceError::ActionRejected { action, code } => Error::ActionRejected {
                address,
                action,
                code,
            },
            DeviceError::UnknownCommand(name) => Error::UnknownCommand { address, name },
            DeviceError::InvalidArgument { command, message } => Error::InvalidArgument {
                address: Some(address),
                command,
                message,
            },
            DeviceError::Protocol(message) | DeviceError::Other(message) => Error::Protocol {
                address,
                label: label.into(),
                message,
            },
            DeviceError::NotConnected => Error::Protocol {
                address,
                label: label.into(),
                message: DeviceError::NotConnected.to_string(),
            },
        }
    }

    /// A connect attempt exceeded the init deadline
    pub fn connect_timeout<A: Into<String>>(address: A, timed_out: TimedOut) -> Self {
        Error::ConnectTimeout {
            address: address.into(),
            after_ms: timed_out.after_ms(),
            label: timed_out.label,
        }
    }

    /// A device call exceeded the operation deadline
    pub fn operation_timeout<A: Into<String>>(address: A, timed_out: TimedOut) -> Self {
        Error::OperationTimeout {
            address: address.into(),
            after_ms: timed_out.after_ms(),
            label: timed_out.label,
        }
    }

    /// Whether the failure is a connection skipped during backoff
    pub fn is_offline(&self) -> bool {
        matches!(self, Error::Offline { .. })
    }

    /// Whether the failure is any kind of deadline expiry
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::ConnectTimeout { .. } | Error::OperationTimeout { .. } | Error::Deadline { .. }
        )
    }
}

impl From<QueueError> for Error {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Closed { owner, label } => Error::QueueClosed {
                address: owner,
                label,
            },
            QueueError::Deadline { owner, timed_out } => Error::Deadline {
                address: owner,
                after_ms: timed_out.after_ms(),
                label: timed_out.label,
            },
            QueueError::Panicked { owner, label } => Error::Panicked {
                address: owner,
                label,
            },
        }
    }
}
