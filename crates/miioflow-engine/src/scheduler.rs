/*!
 * Per-device scheduler.
 *
 * A [`DeviceScheduler`] ties together the pieces that serve one device: the
 * operation queue owning the session, the poll loop, the command dispatcher
 * and the event channel. Devices never share any of these.
 */
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

use miioflow_core::config::{DeviceConfig, PollingConfig, SchedulerConfig};
use miioflow_core::event::{Envelope, EventChannel};
use miioflow_core::logging::{device_span, Span};
use miioflow_core::types::{Id, PropertyMap, PropertySnapshot, Value};
use miioflow_devices::{ConnectionState, DeviceInfo, MiioClient, ModelDefinition};

use crate::command::{BatchCommand, BatchFailure};
use crate::dispatcher::CommandDispatcher;
use crate::error::{Error, Result};
use crate::events::DeviceEvent;
use crate::poll::{poll_once, refresh_and_detect, PollLoop};
use crate::queue::OperationQueue;
use crate::session::{DeviceSession, SessionTimings};

/// How property keys are reported by [`DeviceScheduler::fetch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropertyNaming {
    /// Raw property keys, e.g. `air-fryer:status`
    #[default]
    Raw,
    /// Friendly names from the model definition, falling back to the raw key
    Friendly,
}

#[derive(Debug)]
struct PollingState {
    config: PollingConfig,
    active: Option<PollLoop>,
    started: bool,
}

/// Scheduler for a single device
#[derive(Debug)]
pub struct DeviceScheduler {
    info: DeviceInfo,
    model: Arc<ModelDefinition>,
    queue: OperationQueue<DeviceSession>,
    worker: JoinHandle<()>,
    dispatcher: CommandDispatcher,
    events: EventChannel<DeviceEvent>,
    connection: watch::Receiver<ConnectionState>,
    polling: Mutex<PollingState>,
    fetch_timeout: Duration,
    span: Span,
}

impl DeviceScheduler {
    /// Create the scheduler and its queue worker; no device I/O happens yet
    ///
    /// # Arguments
    ///
    /// * `device` - Device configuration
    /// * `config` - Deadlines and backoff
    /// * `client` - Client for the device connection
    /// * `model` - Model definition of the device
    pub fn new(
        device: &DeviceConfig,
        config: &SchedulerConfig,
        client: Arc<dyn MiioClient>,
        model: Arc<ModelDefinition>,
    ) -> Self {
        let info = DeviceInfo::from_config(device);
        let span = device_span(info.id.as_str(), &info.address);

        let session = DeviceSession::new(info.clone(), client, SessionTimings::from(config));
        let connection = session.watch_state();
        let (queue, worker) = {
            let _entered = span.enter();
            OperationQueue::spawn(info.address.clone(), session)
        };

        let events = EventChannel::new(info.id.clone());
        let dispatcher = CommandDispatcher::new(queue.clone(), model.clone(), events.clone());

        debug!("Created scheduler for {}", info);
        Self {
            info,
            model,
            queue,
            worker,
            dispatcher,
            events,
            connection,
            polling: Mutex::new(PollingState {
                config: device.polling.clone(),
                active: None,
                started: false,
            }),
            fetch_timeout: config.fetch_timeout(),
            span,
        }
    }

    /// Device id
    pub fn id(&self) -> &Id {
        &self.info.id
    }

    /// Device identity
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Model definition
    pub fn model(&self) -> &Arc<ModelDefinition> {
        &self.model
    }

    /// Current connection state
    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope<DeviceEvent>> {
        self.events.subscribe()
    }

    /// Queue the initial refresh and start polling if enabled
    ///
    /// The initial refresh always runs; its outcome is published as `Init`
    /// or `PollError`. Calling this again has no effect.
    pub async fn start(&self) {
        let mut polling = self.polling.lock().await;
        if polling.started {
            debug!("Scheduler for {} already started", self.info.address);
            return;
        }
        polling.started = true;
        info!("Starting scheduler for {}", self.info);

        // Queued ahead of anything submitted after this call
        let initial = poll_once(&self.queue, &self.events);
        tokio::spawn(initial.instrument(self.span.clone()));

        if polling.active.is_none() {
            polling.active = self.spawn_poll_loop(&polling.config);
        }
    }

    fn spawn_poll_loop(&self, config: &PollingConfig) -> Option<PollLoop> {
        if !config.is_active() {
            debug!("Polling disabled for {}", self.info.address);
            return None;
        }
        Some(PollLoop::spawn(
            config.interval(),
            self.queue.clone(),
            self.events.clone(),
            self.span.clone(),
        ))
    }

    /// Replace the polling settings
    ///
    /// The current loop is torn down and, if the new settings are active, a
    /// fresh one is started.
    pub async fn set_polling(&self, config: PollingConfig) {
        let mut polling = self.polling.lock().await;
        if let Some(current) = polling.active.take() {
            current.stop().await;
        }
        polling.active = self.spawn_poll_loop(&config);
        polling.config = config;
    }

    /// Current polling settings
    pub async fn polling(&self) -> PollingConfig {
        self.polling.lock().await.config.clone()
    }

    /// Whether a poll loop is running
    pub async fn is_polling(&self) -> bool {
        self.polling.lock().await.active.is_some()
    }

    /// Run one named command
    pub async fn run_single(&self, name: &str, value: Value) -> Result<()> {
        self.dispatcher.run_single(name, value).await
    }

    /// Run a batch of commands in one queue slot
    pub async fn run_batch(&self, batch: BatchCommand) -> Result<Vec<BatchFailure>> {
        self.dispatcher.run_batch(batch).await
    }

    /// Parse a JSON object payload and run it as a batch
    pub async fn run_batch_json(&self, payload: &serde_json::Value) -> Result<Vec<BatchFailure>> {
        self.dispatcher.run_batch_json(payload).await
    }

    /// Fetch the device properties now
    ///
    /// The refresh goes through the queue, bounded by the fetch deadline, and
    /// feeds change detection like a regular poll.
    pub async fn fetch(&self, naming: PropertyNaming) -> Result<PropertyMap> {
        let snapshot = refresh_and_detect(&self.queue, Some(self.fetch_timeout), &self.events)
            .instrument(self.span.clone())
            .await?;

        Ok(match naming {
            PropertyNaming::Raw => snapshot.into_properties(),
            PropertyNaming::Friendly => self.model.friendly_properties(snapshot.properties()),
        })
    }

    /// Last snapshot from a successful poll, read in queue order
    pub async fn last_snapshot(&self) -> Result<Option<PropertySnapshot>> {
        self.queue
            .submit("snapshot", None, |session: &mut DeviceSession| {
                async move { Ok::<_, Error>(session.snapshot().cloned()) }.boxed()
            })
            .await
    }

    /// Stop polling, let queued operations finish, and release the device
    pub async fn shutdown(self) {
        let Self {
            info,
            queue,
            worker,
            dispatcher,
            polling,
            ..
        } = self;

        if let Some(current) = polling.into_inner().active {
            current.stop().await;
        }

        drop(dispatcher);
        drop(queue);
        if let Err(e) = worker.await {
            warn!("Queue worker for {} ended abnormally: {}", info.address, e);
        }
        info!("Scheduler for {} shut down", info);
    }
}
