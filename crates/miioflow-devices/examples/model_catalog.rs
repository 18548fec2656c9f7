use miioflow_core::types::Value;
use miioflow_devices::{Command, ModelRegistry};

use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize the logger
    miioflow_core::logging::init_with_filter("info", false)?;
    miioflow_devices::init()?;

    let registry = ModelRegistry::builtin();
    for tag in registry.models() {
        let model = registry.get(&tag)?;
        info!("{} ({})", model.name, model.model);

        for property in &model.properties {
            info!("  property {:<32} {}", property.key, property.friendly);
        }

        for name in model.commands.names() {
            match model.commands.resolve(name)? {
                Command::SetProperty { key, .. } => info!("  setter   {:<32} -> {}", name, key),
                Command::Action { siid, aiid } => {
                    info!("  action   {:<32} siid {} aiid {}", name, siid, aiid)
                }
            }
        }
    }

    // Validate a few arguments without touching any device
    let fryer = registry.get("careli.fryer.maf07")?;
    for (name, value) in [
        ("PreheatSwitch", Value::from("on")),
        ("FoodQuanty", Value::from("double")),
        ("TargetTemperature", Value::Integer(250)),
    ] {
        match fryer.commands.resolve(name)?.prepare(name, &value) {
            Ok(prepared) => info!("{}({}) -> {}", name, value, prepared),
            Err(e) => info!("{}({}) rejected: {}", name, value, e),
        }
    }

    Ok(())
}
