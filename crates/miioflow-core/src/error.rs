/*!
 * Error types for the miioflow core crate.
 */
use std::time::Duration;

use thiserror::Error;

/// A deadline elapsed before the guarded work finished
///
/// Produced by [`crate::utils::with_deadline`]. The label names the
/// operation that was being waited on (e.g. `device.init`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{label} timed out after {}ms", .after.as_millis())]
pub struct TimedOut {
    /// Label of the operation that timed out
    pub label: String,
    /// The deadline that was exceeded
    pub after: Duration,
}

impl TimedOut {
    /// Create a new timeout error
    pub fn new<S: Into<String>>(label: S, after: Duration) -> Self {
        Self {
            label: label.into(),
            after,
        }
    }

    /// The exceeded deadline in whole milliseconds
    pub fn after_ms(&self) -> u64 {
        u64::try_from(self.after.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Error type for miioflow core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Logging setup error
    #[error("Logging error: {0}")]
    Logging(String),

    /// Event channel error
    #[error("Event error: {0}")]
    Event(String),

    /// Deadline exceeded
    #[error(transparent)]
    Timeout(#[from] TimedOut),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for miioflow core operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new configuration error
    pub fn config<S: AsRef<str>>(msg: S) -> Self {
        Error::Config(msg.as_ref().to_string())
    }

    /// Create a new logging error
    pub fn logging<S: AsRef<str>>(msg: S) -> Self {
        Error::Logging(msg.as_ref().to_string())
    }

    /// Create a new event error
    pub fn event<S: AsRef<str>>(msg: S) -> Self {
        Error::Event(msg.as_ref().to_string())
    }

    /// Create a new other error
    pub fn other<S: AsRef<str>>(msg: S) -> Self {
        Error::Other(msg.as_ref().to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_out_message() {
        let err = TimedOut::new("device.init", Duration::from_millis(1500));
        assert_eq!(err.to_string(), "device.init timed out after 1500ms");
        assert_eq!(err.after_ms(), 1500);

        let core: Error = err.into();
        assert!(matches!(core, Error::Timeout(_)));
        assert_eq!(core.to_string(), "device.init timed out after 1500ms");
    }

    #[test]
    fn test_constructors() {
        assert!(matches!(Error::config("bad"), Error::Config(m) if m == "bad"));
        assert!(matches!(Error::event("x"), Error::Event(_)));
    }
}
