/*!
 * Model definitions and the command registry.
 *
 * A [`ModelDefinition`] describes what a device model reports and which
 * named commands it accepts. Command names are resolved only through the
 * model's [`CommandRegistry`]; there is no dynamic method lookup.
 */
use std::collections::HashMap;

use tracing::debug;

use miioflow_core::types::{PropertyMap, Value};

use crate::device::{DeviceError, Result};
use crate::protocol::{miot_action, MiioClient};

/// Validates and normalizes a setter argument
///
/// Returns the value to write, or a human-readable validation message.
pub type Coerce = fn(&Value) -> std::result::Result<Value, String>;

/// A named operation a model supports
#[derive(Debug, Clone)]
pub enum Command {
    /// Write one property after coercing the argument
    SetProperty {
        /// Property key written by the setter
        key: String,
        /// Argument validation
        coerce: Coerce,
    },
    /// Invoke a MIoT action; the argument is ignored
    Action {
        /// Service id
        siid: u32,
        /// Action id
        aiid: u32,
    },
}

impl Command {
    /// Validate the argument without touching the device
    ///
    /// # Arguments
    ///
    /// * `name` - The command name, used in errors
    /// * `value` - The raw argument
    pub fn prepare(&self, name: &str, value: &Value) -> Result<Value> {
        match self {
            Command::SetProperty { coerce, .. } => {
                coerce(value).map_err(|message| DeviceError::invalid_argument(name, message))
            }
            Command::Action { .. } => Ok(Value::Null),
        }
    }

    /// Run the command against a client with an already prepared argument
    pub async fn execute(
        &self,
        client: &dyn MiioClient,
        did: &str,
        name: &str,
        prepared: Value,
    ) -> Result<()> {
        match self {
            Command::SetProperty { key, .. } => {
                debug!("Setting {} = {} on {}", key, prepared, did);
                client.set_property(key, prepared).await
            }
            Command::Action { siid, aiid } => {
                miot_action(client, did, name, *siid, *aiid).await.map(|_| ())
            }
        }
    }
}

/// Maps command names to commands for one model
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Command>,
}

impl CommandRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command under a name, replacing any previous entry
    pub fn register<S: Into<String>>(&mut self, name: S, command: Command) {
        self.commands.insert(name.into(), command);
    }

    /// Resolve a command by name
    pub fn resolve(&self, name: &str) -> Result<&Command> {
        self.commands
            .get(name)
            .ok_or_else(|| DeviceError::UnknownCommand(name.to_string()))
    }

    /// Whether a command with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// All command names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no commands are registered
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// A monitored property and its human-readable name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySpec {
    /// Raw property key, e.g. `air-fryer:status`
    pub key: String,
    /// Friendly name, e.g. `Status`
    pub friendly: String,
}

/// Everything the scheduler needs to know about a device model
#[derive(Debug, Clone)]
pub struct ModelDefinition {
    /// Model tag
    pub model: String,
    /// Human-readable model name
    pub name: String,
    /// MIoT spec type; set for models that need a handshake
    pub miot_spec_type: Option<String>,
    /// Monitored properties
    pub properties: Vec<PropertySpec>,
    /// Accepted commands
    pub commands: CommandRegistry,
}

impl ModelDefinition {
    /// Start a definition for a model tag
    pub fn new<M: Into<String>, N: Into<String>>(model: M, name: N) -> Self {
        Self {
            model: model.into(),
            name: name.into(),
            miot_spec_type: None,
            properties: Vec::new(),
            commands: CommandRegistry::new(),
        }
    }

    /// Mark the model as MIoT-typed
    pub fn with_miot_spec<S: Into<String>>(mut self, spec_type: S) -> Self {
        self.miot_spec_type = Some(spec_type.into());
        self
    }

    /// Add a monitored property
    pub fn with_property<K: Into<String>, F: Into<String>>(mut self, key: K, friendly: F) -> Self {
        self.properties.push(PropertySpec {
            key: key.into(),
            friendly: friendly.into(),
        });
        self
    }

    /// Add a property setter command
    pub fn with_setter<N: Into<String>, K: Into<String>>(
        mut self,
        name: N,
        key: K,
        coerce: Coerce,
    ) -> Self {
        self.commands.register(
            name,
            Command::SetProperty {
                key: key.into(),
                coerce,
            },
        );
        self
    }

    /// Add a MIoT action command
    pub fn with_action<N: Into<String>>(mut self, name: N, siid: u32, aiid: u32) -> Self {
        self.commands.register(name, Command::Action { siid, aiid });
        self
    }

    /// Whether this model speaks MIoT
    pub fn is_miot(&self) -> bool {
        self.miot_spec_type.is_some()
    }

    /// Friendly name of a property key, or the key itself when unknown
    pub fn friendly_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.properties
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.friendly.as_str())
            .unwrap_or(key)
    }

    /// Re-key a property map by friendly names
    pub fn friendly_properties(&self, properties: &PropertyMap) -> PropertyMap {
        properties
            .iter()
            .map(|(key, value)| (self.friendly_name(key).to_string(), value.clone()))
            .collect()
    }
}

/// Accept a number within `min..=max`, passing it through unchanged
pub fn number_in_range(value: &Value, min: f64, max: f64) -> Option<Value> {
    value
        .as_float()
        .filter(|v| *v >= min && *v <= max)
        .map(|_| value.clone())
}

/// Normalized lowercase text of a string argument
pub fn keyword(value: &Value) -> Option<String> {
    value.as_str().map(|s| s.trim().to_lowercase())
}
