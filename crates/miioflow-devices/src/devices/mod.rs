/*!
 * Built-in model definitions.
 *
 * This module contains the device models miioflow knows out of the box.
 */

pub mod fryer;
pub mod kettle;

// Re-export setting types for convenience
pub use fryer::{FoodQuantity, PreheatSwitch, TurnPot};
pub use kettle::KettleStatus;

use crate::model::ModelDefinition;

/// Definitions of every built-in model
pub fn builtin_definitions() -> Vec<ModelDefinition> {
    vec![kettle::definition(), fryer::definition()]
}
