/*!
 * Core data types for miioflow.
 *
 * Property values, device identifiers and property snapshots shared by the
 * device and engine crates.
 */
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a configured device (the MiIO device id / DID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    /// Create an ID from a string
    pub fn from_string<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_string())
    }

    /// Create a random ID, used to correlate queued operations in logs
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the string representation of the ID
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A property or command value as reported by, or sent to, a device
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Integer(i64),
    /// Floating-point value
    Float(f64),
    /// String value
    String(String),
    /// Array of values
    Array(Vec<Value>),
    /// Map of string keys to values
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if the value is numeric (integer or float)
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// Try to get a boolean value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get an integer value; floats with no fractional part are accepted
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    /// Try to get a float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json: serde_json::Value = self.clone().into();
        write!(f, "{}", json)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Integer(i) => serde_json::Value::from(i),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

/// Raw property map as delivered by a device client, keyed by property key
pub type PropertyMap = BTreeMap<String, Value>;

/// The complete set of last-known property values of a device
///
/// A snapshot is replaced as a whole after every successful poll and is
/// never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySnapshot {
    properties: PropertyMap,
    captured_at: DateTime<Utc>,
}

impl PropertySnapshot {
    /// Create a snapshot captured now
    pub fn new(properties: PropertyMap) -> Self {
        Self::captured_at(properties, Utc::now())
    }

    /// Create a snapshot with an explicit capture time
    pub fn captured_at(properties: PropertyMap, captured_at: DateTime<Utc>) -> Self {
        Self {
            properties,
            captured_at,
        }
    }

    /// Property values keyed by property key
    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Look up a single property
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// When the snapshot was captured
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Number of properties in the snapshot
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the snapshot holds no properties
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Consume the snapshot, returning the property map
    pub fn into_properties(self) -> PropertyMap {
        self.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_creation() {
        let id = Id::from_string("393554461");
        assert_eq!(id.as_str(), "393554461");
        assert_eq!(format!("{}", id), "393554461");

        let random = Id::random();
        assert_ne!(random, Id::random());
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Integer(42).as_float(), Some(42.0));
        assert_eq!(Value::Float(3.0).as_integer(), Some(3));
        assert_eq!(Value::Float(3.5).as_integer(), None);
        assert_eq!(Value::from("on").as_str(), Some("on"));
        assert_eq!(Value::Bool(true).as_integer(), None);
        assert!(Value::default().is_null());
    }

    #[test]
    fn test_json_conversion() {
        let json = json!({"status": 1, "temp": 25.5, "name": "fryer", "list": [true, null]});
        let value = Value::from(json.clone());

        let Value::Object(map) = &value else {
            panic!("expected object");
        };
        assert_eq!(map["status"], Value::Integer(1));
        assert_eq!(map["temp"], Value::Float(25.5));
        assert_eq!(map["list"], Value::Array(vec![Value::Bool(true), Value::Null]));

        let back: serde_json::Value = value.into();
        assert_eq!(back, json);
    }

    #[test]
    fn test_value_display_is_json() {
        assert_eq!(Value::from("bad").to_string(), "\"bad\"");
        assert_eq!(Value::Integer(65).to_string(), "65");
    }

    #[test]
    fn test_snapshot_accessors() {
        let mut props = PropertyMap::new();
        props.insert("status".to_string(), Value::Integer(0));
        let snapshot = PropertySnapshot::new(props);

        assert_eq!(snapshot.get("status"), Some(&Value::Integer(0)));
        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot.is_empty());
        assert!(snapshot.get("temp").is_none());
    }
}
