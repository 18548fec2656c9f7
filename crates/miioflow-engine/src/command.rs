/*!
 * Batch commands.
 *
 * A batch is an ordered list of `(command, argument)` pairs run in one
 * queue slot. Each pair succeeds or fails on its own.
 */
use std::fmt;

use miioflow_core::types::Value;

use crate::error::{Error, Result};

/// Message returned when a batch payload is not a JSON object
pub const BATCH_PAYLOAD_HINT: &str =
    "custom JSON command expects an object like {\"KeepWarmTemperature\": 65}";

/// Ordered sequence of commands and their arguments
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchCommand {
    entries: Vec<(String, Value)>,
}

impl BatchCommand {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command, builder style
    pub fn with<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.push(key, value);
        self
    }

    /// Append a command
    pub fn push<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.entries.push((key.into(), value.into()));
    }

    /// Parse a batch from a JSON object, keeping key order and trimming keys
    pub fn from_json(payload: &serde_json::Value) -> Result<Self> {
        let object = payload.as_object().ok_or_else(|| Error::InvalidArgument {
            address: None,
            command: "batch".to_string(),
            message: BATCH_PAYLOAD_HINT.to_string(),
        })?;

        Ok(object
            .iter()
            .map(|(key, value)| (key.trim().to_string(), Value::from(value.clone())))
            .collect())
    }

    /// Render the batch as a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(key, value)| (key.clone(), value.clone().into()))
                .collect(),
        )
    }

    /// Iterate over the commands in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Command names in order
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }

    /// Number of commands
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Value)> for BatchCommand {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for BatchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// One failed entry of a batch
#[derive(Debug)]
pub struct BatchFailure {
    /// Command name
    pub key: String,
    /// Argument that was passed
    pub value: Value,
    /// Why it failed
    pub error: Error,
}

impl BatchFailure {
    /// Message in the form `Command failed: Key(value) -> reason`
    pub fn message(&self) -> String {
        format!("Command failed: {}({}) -> {}", self.key, self.value, self.error)
    }
}
