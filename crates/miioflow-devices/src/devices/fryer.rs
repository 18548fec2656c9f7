/*!
 * Careli Air Fryer (`careli.fryer.maf07`).
 *
 * Setters validate their argument before anything is sent; actions are
 * MIoT actions on the air-fryer (siid 2) and custom (siid 3) services.
 */
use miioflow_core::types::Value;

use crate::model::{keyword, number_in_range, ModelDefinition};

/// Model tag
pub const MODEL: &str = "careli.fryer.maf07";

/// MIoT spec type
pub const MIOT_SPEC_TYPE: &str = "urn:miot-spec-v2:device:air-fryer:0000A0A4:careli-maf07:1";

const MONITORED: [(&str, &str); 11] = [
    ("air-fryer:status", "Status"),
    ("air-fryer:fault", "Fault"),
    ("air-fryer:target-time", "Target Time"),
    ("air-fryer:target-temperature", "Target Temperature"),
    ("air-fryer:left-time", "Left Time"),
    ("custom:recipe-id", "Recipe Id"),
    ("custom:appoint-time", "Appoint Time"),
    ("custom:appoint-time-left", "Appoint Time Left"),
    ("custom:food-quanty", "Food Quantity"),
    ("custom:preheat-switch", "Preheat Switch"),
    ("custom:turn-pot", "Turn Pot"),
];

/// Food quantity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoodQuantity {
    /// Not set
    Null,
    /// Single portion
    Single,
    /// Double portion
    Double,
    /// Half load
    Half,
    /// Full load
    Full,
}

impl FoodQuantity {
    /// Device code
    pub fn code(&self) -> i64 {
        match self {
            FoodQuantity::Null => 0,
            FoodQuantity::Single => 1,
            FoodQuantity::Double => 2,
            FoodQuantity::Half => 3,
            FoodQuantity::Full => 4,
        }
    }

    /// Parse from string
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "null" => Some(FoodQuantity::Null),
            "single" => Some(FoodQuantity::Single),
            "double" => Some(FoodQuantity::Double),
            "half" => Some(FoodQuantity::Half),
            "full" => Some(FoodQuantity::Full),
            _ => None,
        }
    }
}

/// Preheat switch setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreheatSwitch {
    /// Not set
    Null,
    /// Preheat off
    Off,
    /// Preheat on
    On,
}

impl PreheatSwitch {
    /// Device code
    pub fn code(&self) -> i64 {
        match self {
            PreheatSwitch::Null => 0,
            PreheatSwitch::Off => 1,
            PreheatSwitch::On => 2,
        }
    }

    /// Interpret a setter argument
    pub fn from_value(value: &Value) -> Option<Self> {
        if let Some(on) = value.as_bool() {
            return Some(if on { PreheatSwitch::On } else { PreheatSwitch::Off });
        }
        if let Some(word) = keyword(value) {
            return match word.as_str() {
                "on" | "true" => Some(PreheatSwitch::On),
                "off" | "false" => Some(PreheatSwitch::Off),
                "null" => Some(PreheatSwitch::Null),
                _ => None,
            };
        }
        match value.as_integer() {
            Some(0) => Some(PreheatSwitch::Null),
            Some(1) => Some(PreheatSwitch::Off),
            Some(2) => Some(PreheatSwitch::On),
            _ => None,
        }
    }
}

/// Turn-pot reminder setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPot {
    /// Do not turn the pot
    NotTurn,
    /// Reminder switched off
    SwitchOff,
    /// Turn the pot
    Turn,
}

impl TurnPot {
    /// Device code
    pub fn code(&self) -> i64 {
        match self {
            TurnPot::NotTurn => 0,
            TurnPot::SwitchOff => 1,
            TurnPot::Turn => 2,
        }
    }

    /// Interpret a setter argument
    pub fn from_value(value: &Value) -> Option<Self> {
        if let Some(on) = value.as_bool() {
            return Some(if on { TurnPot::Turn } else { TurnPot::NotTurn });
        }
        if let Some(word) = keyword(value) {
            return match word.as_str() {
                "on" | "true" | "turn" => Some(TurnPot::Turn),
                "off" | "false" | "noturn" | "no" => Some(TurnPot::NotTurn),
                _ => None,
            };
        }
        match value.as_integer() {
            Some(0) => Some(TurnPot::NotTurn),
            Some(1) => Some(TurnPot::SwitchOff),
            Some(2) => Some(TurnPot::Turn),
            _ => None,
        }
    }
}

fn minutes(value: &Value, min: f64, what: &str) -> Result<Value, String> {
    number_in_range(value, min, 1440.0).ok_or_else(|| {
        format!(
            "Invalid {}: {}. Should be between {} and 1440 (minutes)",
            what, value, min
        )
    })
}

fn degrees(value: &Value, what: &str) -> Result<Value, String> {
    number_in_range(value, 40.0, 200.0)
        .ok_or_else(|| format!("Invalid {}: {}. Should be between 40 and 200", what, value))
}

fn target_time(value: &Value) -> Result<Value, String> {
    minutes(value, 1.0, "target time")
}

fn target_temperature(value: &Value) -> Result<Value, String> {
    degrees(value, "target temperature")
}

fn work_time(value: &Value) -> Result<Value, String> {
    minutes(value, 1.0, "work time")
}

fn work_temp(value: &Value) -> Result<Value, String> {
    degrees(value, "work temperature")
}

fn appoint_time(value: &Value) -> Result<Value, String> {
    minutes(value, 0.0, "appoint time")
}

fn appoint_time_left(value: &Value) -> Result<Value, String> {
    minutes(value, 0.0, "appoint time left")
}

fn recipe_id(value: &Value) -> Result<Value, String> {
    match value {
        Value::Null => Err("Invalid recipe id: value is required".to_string()),
        Value::String(s) => Ok(Value::String(s.clone())),
        other => Ok(Value::String(other.to_string())),
    }
}

fn food_quantity(value: &Value) -> Result<Value, String> {
    let by_keyword = keyword(value)
        .and_then(|word| FoodQuantity::from_keyword(&word))
        .map(|q| Value::Integer(q.code()));

    by_keyword
        .or_else(|| number_in_range(value, 0.0, 4.0))
        .ok_or_else(|| {
            format!(
                "Invalid food quanty: {}. Allowed values: 0-4 or one of null, single, double, half, full",
                value
            )
        })
}

fn preheat_switch(value: &Value) -> Result<Value, String> {
    PreheatSwitch::from_value(value)
        .map(|s| Value::Integer(s.code()))
        .ok_or_else(|| {
            format!(
                "Invalid preheat switch: {}. Allowed values: 0 (Null), 1 (Off), 2 (On)",
                value
            )
        })
}

fn turn_pot(value: &Value) -> Result<Value, String> {
    TurnPot::from_value(value)
        .map(|t| Value::Integer(t.code()))
        .ok_or_else(|| format!("Invalid turn pot: {}. Allowed values: 0, 1, 2", value))
}

/// Build the model definition
pub fn definition() -> ModelDefinition {
    let model = MONITORED
        .iter()
        .fold(
            ModelDefinition::new(MODEL, "Careli Air Fryer (maf07)").with_miot_spec(MIOT_SPEC_TYPE),
            |model, (key, friendly)| model.with_property(*key, *friendly),
        );

    model
        .with_setter("TargetTime", "air-fryer:target-time", target_time)
        .with_setter("TargetTemperature", "air-fryer:target-temperature", target_temperature)
        .with_setter("WorkTime", "custom:work-time", work_time)
        .with_setter("WorkTemp", "custom:work-temp", work_temp)
        .with_setter("RecipeId", "custom:recipe-id", recipe_id)
        .with_setter("AppointTime", "custom:appoint-time", appoint_time)
        .with_setter("AppointTimeLeft", "custom:appoint-time-left", appoint_time_left)
        .with_setter("FoodQuanty", "custom:food-quanty", food_quantity)
        .with_setter("PreheatSwitch", "custom:preheat-switch", preheat_switch)
        .with_setter("TurnPot", "custom:turn-pot", turn_pot)
        .with_action("StartCook", 2, 1)
        .with_action("CancelCooking", 2, 2)
        .with_action("Pause", 2, 3)
        .with_action("StartCustomCook", 3, 1)
        .with_action("ResumeCooking", 3, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Command;

    fn prepare(name: &str, value: Value) -> Result<Value, String> {
        definition()
            .commands
            .resolve(name)
            .unwrap()
            .prepare(name, &value)
            .map_err(|e| e.to_string())
    }

    #[test]
    fn test_definition() {
        let model = definition();
        assert_eq!(model.properties.len(), 11);
        assert_eq!(model.commands.len(), 15);
        assert_eq!(model.friendly_name("custom:turn-pot"), "Turn Pot");
        assert!(matches!(
            model.commands.resolve("StartCustomCook"),
            Ok(Command::Action { siid: 3, aiid: 1 })
        ));
    }

    #[test]
    fn test_time_and_temperature_ranges() {
        assert_eq!(prepare("TargetTime", Value::Integer(1440)), Ok(Value::Integer(1440)));
        assert_eq!(
            prepare("TargetTime", Value::Integer(0)),
            Err("Invalid target time: 0. Should be between 1 and 1440 (minutes)".to_string())
        );
        assert!(prepare("AppointTime", Value::Integer(0)).is_ok());
        assert!(prepare("AppointTimeLeft", Value::Integer(1441)).is_err());
        assert!(prepare("WorkTemp", Value::Float(180.0)).is_ok());
        assert!(prepare("TargetTemperature", Value::Integer(39)).is_err());
        assert!(prepare("WorkTime", Value::from("10")).is_err());
    }

    #[test]
    fn test_recipe_id() {
        assert_eq!(prepare("RecipeId", Value::Integer(12)), Ok(Value::from("12")));
        assert_eq!(prepare("RecipeId", Value::from("fries")), Ok(Value::from("fries")));
        assert_eq!(
            prepare("RecipeId", Value::Null),
            Err("Invalid recipe id: value is required".to_string())
        );
    }

    #[test]
    fn test_food_quantity() {
        assert_eq!(prepare("FoodQuanty", Value::from(" Half ")), Ok(Value::Integer(3)));
        assert_eq!(prepare("FoodQuanty", Value::from("null")), Ok(Value::Integer(0)));
        assert_eq!(prepare("FoodQuanty", Value::Integer(4)), Ok(Value::Integer(4)));
        assert!(prepare("FoodQuanty", Value::Integer(5)).is_err());
        assert!(prepare("FoodQuanty", Value::from("triple")).is_err());
    }

    #[test]
    fn test_preheat_switch() {
        assert_eq!(prepare("PreheatSwitch", Value::Bool(true)), Ok(Value::Integer(2)));
        assert_eq!(prepare("PreheatSwitch", Value::Bool(false)), Ok(Value::Integer(1)));
        assert_eq!(prepare("PreheatSwitch", Value::from("OFF")), Ok(Value::Integer(1)));
        assert_eq!(prepare("PreheatSwitch", Value::from("null")), Ok(Value::Integer(0)));
        assert_eq!(prepare("PreheatSwitch", Value::Integer(2)), Ok(Value::Integer(2)));
        assert!(prepare("PreheatSwitch", Value::Integer(3)).is_err());
        assert!(prepare("PreheatSwitch", Value::from("maybe")).is_err());
    }

    #[test]
    fn test_turn_pot() {
        assert_eq!(prepare("TurnPot", Value::Bool(true)), Ok(Value::Integer(2)));
        assert_eq!(prepare("TurnPot", Value::Bool(false)), Ok(Value::Integer(0)));
        assert_eq!(prepare("TurnPot", Value::from("noturn")), Ok(Value::Integer(0)));
        assert_eq!(prepare("TurnPot", Value::from("turn")), Ok(Value::Integer(2)));
        assert_eq!(prepare("TurnPot", Value::Integer(1)), Ok(Value::Integer(1)));
        assert_eq!(
            prepare("TurnPot", Value::Integer(7)),
            Err("Invalid turn pot: 7. Allowed values: 0, 1, 2".to_string())
        );
    }

    #[test]
    fn test_actions_ignore_argument() {
        assert_eq!(prepare("StartCook", Value::from("now")), Ok(Value::Null));
    }
}
