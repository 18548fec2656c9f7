use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use miioflow_core::config::{DeviceConfig, PollingConfig, SchedulerConfig};
use miioflow_core::event::recv_lossy;
use miioflow_core::types::{PropertyMap, Value};
use miioflow_devices::device::Result as DeviceResult;
use miioflow_devices::devices::kettle;
use miioflow_devices::{DeviceError, MiioClient, ModelRegistry};
use miioflow_engine::{BatchCommand, DeviceEvent, DeviceScheduler, PropertyNaming};

// Simulated kettle that heats up by 5 degrees per poll
#[derive(Debug)]
struct SimulatedKettle {
    temperature: AtomicI64,
    target: AtomicI64,
    properties: broadcast::Sender<PropertyMap>,
}

impl SimulatedKettle {
    fn new() -> Self {
        let (properties, _) = broadcast::channel(8);
        Self {
            temperature: AtomicI64::new(20),
            target: AtomicI64::new(60),
            properties,
        }
    }

    fn snapshot(&self) -> PropertyMap {
        let temperature = self.temperature.fetch_add(5, Ordering::SeqCst);
        let target = self.target.load(Ordering::SeqCst);
        let status = if temperature < target { 1 } else { 2 };

        let mut properties = PropertyMap::new();
        properties.insert(kettle::STATUS.to_string(), Value::Integer(status));
        properties.insert(kettle::ERROR.to_string(), Value::Integer(0));
        properties.insert(kettle::TEMPERATURE.to_string(), Value::Integer(temperature));
        properties.insert(kettle::TARGET_TEMPERATURE.to_string(), Value::Integer(target));
        properties
    }
}

#[async_trait]
impl MiioClient for SimulatedKettle {
    fn requires_handshake(&self) -> bool {
        true
    }

    async fn connect(&self) -> DeviceResult<()> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = self.properties.send(self.snapshot());
        Ok(())
    }

    fn disconnect(&self) -> DeviceResult<()> {
        Ok(())
    }

    fn subscribe_properties(&self) -> broadcast::Receiver<PropertyMap> {
        self.properties.subscribe()
    }

    async fn set_property(&self, key: &str, value: Value) -> DeviceResult<()> {
        if key != kettle::TARGET_TEMPERATURE {
            return Err(DeviceError::protocol(format!("read-only property {}", key)));
        }
        let target = value
            .as_integer()
            .ok_or_else(|| DeviceError::protocol("target temperature must be an integer"))?;
        self.target.store(target, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, method: &str, _params: serde_json::Value) -> DeviceResult<serde_json::Value> {
        Err(DeviceError::protocol(format!("unsupported call {}", method)))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize the logger
    tracing_subscriber::fmt::init();

    let device = DeviceConfig {
        id: "kettle-1".to_string(),
        name: "Kettle".to_string(),
        room: "Kitchen".to_string(),
        model: kettle::MODEL.to_string(),
        address: "192.168.1.50".to_string(),
        token: "00112233445566778899aabbccddeeff".to_string(),
        polling: PollingConfig::every(1),
    };
    println!("Polling {}", device.display_name());

    let model = ModelRegistry::builtin().get(kettle::MODEL)?;
    let scheduler = DeviceScheduler::new(
        &device,
        &SchedulerConfig::default(),
        Arc::new(SimulatedKettle::new()),
        model,
    );

    let mut events = scheduler.subscribe();
    let printer = tokio::spawn(async move {
        while let Some(envelope) = recv_lossy(&mut events).await {
            match envelope.payload {
                DeviceEvent::Init { snapshot } => println!("Initial properties: {:?}", snapshot.properties()),
                DeviceEvent::Changed { keys, snapshot } => {
                    for key in keys {
                        if let Some(value) = snapshot.get(&key) {
                            println!("{} changed to {}", key, value);
                        }
                    }
                }
                other => println!("[{}] {:?}", other.kind(), other),
            }
        }
    });

    scheduler.start().await;
    tokio::time::sleep(Duration::from_secs(3)).await;

    println!("Raising the target temperature...");
    scheduler.run_single("TargetTemperature", Value::Integer(85)).await?;

    // One valid entry, one out of range
    let failures = scheduler
        .run_batch(
            BatchCommand::new()
                .with("TargetTemperature", 90)
                .with("TargetTemperature", 120),
        )
        .await?;
    for failure in &failures {
        println!("{}", failure.message());
    }

    let friendly = scheduler.fetch(PropertyNaming::Friendly).await?;
    println!("Current state: {:?}", friendly);

    tokio::time::sleep(Duration::from_secs(2)).await;
    scheduler.shutdown().await;
    printer.await?;

    println!("Example completed successfully!");
    Ok(())
}
