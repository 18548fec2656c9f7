/*!
 * Model registry for miioflow.
 *
 * Maps model tags to their [`ModelDefinition`]s. The built-in models are
 * registered exactly once, the first time [`ModelRegistry::builtin`] is used.
 */
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use tracing::debug;

use crate::device::DeviceError;
use crate::devices::builtin_definitions;
use crate::model::ModelDefinition;

/// Registry of known device models
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: RwLock<HashMap<String, Arc<ModelDefinition>>>,
}

impl ModelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in models
    pub fn with_builtins() -> Result<Self, DeviceError> {
        let registry = Self::new();
        for definition in builtin_definitions() {
            registry.register(definition)?;
        }
        Ok(registry)
    }

    /// The process-wide registry of built-in models
    pub fn builtin() -> &'static ModelRegistry {
        static BUILTIN: OnceLock<ModelRegistry> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            let mut models = HashMap::new();
            for definition in builtin_definitions() {
                models.insert(definition.model.clone(), Arc::new(definition));
            }
            debug!("Registered {} built-in models", models.len());
            ModelRegistry {
                models: RwLock::new(models),
            }
        })
    }

    /// Register a model definition
    pub fn register(&self, definition: ModelDefinition) -> Result<(), DeviceError> {
        let mut models = self.models.write().map_err(|_| {
            DeviceError::Other("Failed to acquire write lock on model registry".to_string())
        })?;

        if models.contains_key(&definition.model) {
            return Err(DeviceError::Other(format!(
                "Model {} already registered",
                definition.model
            )));
        }

        debug!("Registered model {}", definition.model);
        models.insert(definition.model.clone(), Arc::new(definition));
        Ok(())
    }

    /// Look up a model by tag
    pub fn get(&self, model: &str) -> Result<Arc<ModelDefinition>, DeviceError> {
        let models = self.models.read().map_err(|_| {
            DeviceError::Other("Failed to acquire read lock on model registry".to_string())
        })?;

        models
            .get(model)
            .cloned()
            .ok_or_else(|| DeviceError::Other(format!("Unknown model: {}", model)))
    }

    /// Whether a model tag is registered
    pub fn contains(&self, model: &str) -> bool {
        self.models
            .read()
            .map(|models| models.contains_key(model))
            .unwrap_or(false)
    }

    /// All registered model tags, sorted
    pub fn models(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .models
            .read()
            .map(|models| models.keys().cloned().collect())
            .unwrap_or_default();
        tags.sort();
        tags
    }
}
