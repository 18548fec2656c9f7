/*!
 * Xiaomi Kettle v20 (`xiaomi.kettle.v20`).
 */
use std::fmt;

use miioflow_core::types::Value;

use crate::model::{number_in_range, ModelDefinition};

/// Model tag
pub const MODEL: &str = "xiaomi.kettle.v20";

/// MIoT spec type
pub const MIOT_SPEC_TYPE: &str = "urn:miot-spec-v2:device:kettle:0000A059:xiaomi-v20:1";

/// Status property (siid 2, piid 1)
pub const STATUS: &str = "kettle:status";
/// Error property (siid 2, piid 2)
pub const ERROR: &str = "kettle:error";
/// Target temperature property (siid 2, piid 4)
pub const TARGET_TEMPERATURE: &str = "kettle:target-temperature";
/// Current temperature property (siid 2, piid 5)
pub const TEMPERATURE: &str = "kettle:temperature";

/// Kettle status values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KettleStatus {
    /// Idle
    Idle,
    /// Heating
    Heating,
    /// Boiling
    Boiling,
    /// Cooling
    Cooling,
    /// Keep warm
    KeepWarm,
}

impl KettleStatus {
    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            KettleStatus::Idle => "idle",
            KettleStatus::Heating => "heating",
            KettleStatus::Boiling => "boiling",
            KettleStatus::Cooling => "cooling",
            KettleStatus::KeepWarm => "keep-warm",
        }
    }

    /// Parse the status code reported by the device
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(KettleStatus::Idle),
            1 => Some(KettleStatus::Heating),
            2 => Some(KettleStatus::Boiling),
            3 => Some(KettleStatus::Cooling),
            4 => Some(KettleStatus::KeepWarm),
            _ => None,
        }
    }
}

impl fmt::Display for KettleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn target_temperature(value: &Value) -> Result<Value, String> {
    number_in_range(value, 40.0, 90.0).ok_or_else(|| {
        format!(
            "Invalid target temperature: {}. Should be between 40 and 90",
            value
        )
    })
}

/// Build the model definition
pub fn definition() -> ModelDefinition {
    ModelDefinition::new(MODEL, "Xiaomi Kettle v20")
        .with_miot_spec(MIOT_SPEC_TYPE)
        .with_property(STATUS, "Status")
        .with_property(ERROR, "Error")
        .with_property(TARGET_TEMPERATURE, "Target Temperature")
        .with_property(TEMPERATURE, "Temperature")
        .with_setter("TargetTemperature", TARGET_TEMPERATURE, target_temperature)
}
