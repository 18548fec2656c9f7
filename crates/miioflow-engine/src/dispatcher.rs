/*!
 * Command dispatch.
 *
 * Commands are resolved through the model's command registry before
 * anything is queued, so an unknown name never touches the connection.
 * Outcomes are published as events once the queued work has finished.
 */
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, warn};

use miioflow_core::event::EventChannel;
use miioflow_core::types::Value;
use miioflow_devices::ModelDefinition;

use crate::command::{BatchCommand, BatchFailure};
use crate::error::{Error, Result};
use crate::events::DeviceEvent;
use crate::queue::OperationQueue;
use crate::session::{setter_label, DeviceSession};

/// Queue label of a batch
pub const BATCH_LABEL: &str = "batch";

/// Submits single and batch commands for one device
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    queue: OperationQueue<DeviceSession>,
    model: Arc<ModelDefinition>,
    events: EventChannel<DeviceEvent>,
}

impl CommandDispatcher {
    /// Create a dispatcher for a device queue
    pub fn new(
        queue: OperationQueue<DeviceSession>,
        model: Arc<ModelDefinition>,
        events: EventChannel<DeviceEvent>,
    ) -> Self {
        Self {
            queue,
            model,
            events,
        }
    }

    /// Run one named command
    ///
    /// Publishes `CommandSent` on success and `CommandFailed` on failure.
    pub async fn run_single(&self, name: &str, value: Value) -> Result<()> {
        let result = match self.model.commands.resolve(name) {
            Ok(command) => {
                let command = command.clone();
                let command_name = name.to_string();
                let argument = value.clone();
                self.queue
                    .submit(setter_label(name), None, move |session: &mut DeviceSession| {
                        async move { session.invoke(&command_name, &command, &argument).await }.boxed()
                    })
                    .await
            }
            Err(e) => Err(Error::device(self.queue.owner(), setter_label(name), e)),
        };

        match &result {
            Ok(()) => {
                debug!("Command {}({}) sent to {}", name, value, self.queue.owner());
                self.events.publish(DeviceEvent::CommandSent {
                    name: name.to_string(),
                    value,
                });
            }
            Err(e) => {
                warn!("Command {} failed: {}", name, e);
                self.events.publish(DeviceEvent::CommandFailed {
                    message: e.to_string(),
                    name: name.to_string(),
                });
            }
        }

        result
    }

    /// Run a batch in a single queue slot
    ///
    /// Each failed entry publishes one `BatchCommandFailed` naming its key.
    /// A failure before the first entry (e.g. the device is unreachable)
    /// publishes a single `BatchCommandFailed` without a key and is returned
    /// as an error.
    pub async fn run_batch(&self, batch: BatchCommand) -> Result<Vec<BatchFailure>> {
        let model = self.model.clone();
        let queued = batch.clone();
        let result = self
            .queue
            .submit(BATCH_LABEL, None, move |session: &mut DeviceSession| {
                async move { session.invoke_batch(&model.commands, &queued).await }.boxed()
            })
            .await;

        match &result {
            Ok(failures) => {
                for failure in failures {
                    self.events.publish(DeviceEvent::BatchCommandFailed {
                        message: failure.message(),
                        key: Some(failure.key.clone()),
                        batch: batch.clone(),
                    });
                }
            }
            Err(e) => {
                warn!("Batch {} failed: {}", batch, e);
                self.events.publish(DeviceEvent::BatchCommandFailed {
                    message: e.to_string(),
                    key: None,
                    batch,
                });
            }
        }

        result
    }

    /// Parse a JSON object payload and run it as a batch
    pub async fn run_batch_json(&self, payload: &serde_json::Value) -> Result<Vec<BatchFailure>> {
        let batch = BatchCommand::from_json(payload).map_err(|e| {
            warn!("Rejected batch payload for {}: {}", self.queue.owner(), e);
            e
        })?;
        self.run_batch(batch).await
    }
}
