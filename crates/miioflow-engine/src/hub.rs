/*!
 * Multi-device hub.
 *
 * Builds one independent [`DeviceScheduler`] per configured device. The
 * hub holds no locks shared across devices; it only owns the schedulers.
 */
use std::collections::BTreeMap;

use futures::future::join_all;
use tracing::info;

use miioflow_core::config::Config;
use miioflow_core::types::Id;
use miioflow_devices::{ClientFactory, DeviceInfo, ModelRegistry};

use crate::error::{Error, Result};
use crate::scheduler::DeviceScheduler;

/// Owner of every device scheduler
#[derive(Debug, Default)]
pub struct DeviceHub {
    schedulers: BTreeMap<Id, DeviceScheduler>,
}

impl DeviceHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self::default()
    }

    /// Build schedulers for every configured device
    ///
    /// The configuration is validated first. An unknown model tag is a
    /// configuration error.
    ///
    /// # Arguments
    ///
    /// * `config` - The full configuration
    /// * `factory` - Creates a client per device
    /// * `models` - Model registry used to resolve model tags
    pub fn from_config(
        config: &Config,
        factory: &dyn ClientFactory,
        models: &ModelRegistry,
    ) -> Result<Self> {
        config.validate()?;

        let mut hub = Self::new();
        for device in &config.devices {
            let model = models.get(&device.model).map_err(|_| {
                Error::config(format!(
                    "Unknown model {} for device {}",
                    device.model, device.id
                ))
            })?;

            let info = DeviceInfo::from_config(device);
            let client = factory
                .create(&info)
                .map_err(|e| Error::device(&info.address, "client", e))?;

            hub.insert(DeviceScheduler::new(device, &config.scheduler, client, model))?;
        }

        info!("Device hub built with {} devices", hub.len());
        Ok(hub)
    }

    /// Add a scheduler; ids must be unique
    pub fn insert(&mut self, scheduler: DeviceScheduler) -> Result<()> {
        let id = scheduler.id().clone();
        if self.schedulers.contains_key(&id) {
            return Err(Error::config(format!("Device {} already registered", id)));
        }
        self.schedulers.insert(id, scheduler);
        Ok(())
    }

    /// Look up a scheduler by device id
    pub fn get(&self, id: &Id) -> Option<&DeviceScheduler> {
        self.schedulers.get(id)
    }

    /// Device ids, sorted
    pub fn ids(&self) -> Vec<Id> {
        self.schedulers.keys().cloned().collect()
    }

    /// Number of devices
    pub fn len(&self) -> usize {
        self.schedulers.len()
    }

    /// Whether the hub has no devices
    pub fn is_empty(&self) -> bool {
        self.schedulers.is_empty()
    }

    /// Start every scheduler
    pub async fn start_all(&self) {
        join_all(self.schedulers.values().map(|scheduler| scheduler.start())).await;
    }

    /// Shut every scheduler down
    pub async fn shutdown(self) {
        join_all(self.schedulers.into_values().map(|scheduler| scheduler.shutdown())).await;
        info!("Device hub shut down");
    }
}
