/*!
 * Device session.
 *
 * A [`DeviceSession`] owns the connection lifecycle of one device and its
 * last-known property snapshot. It is owned by the device's queue worker,
 * so every method runs with exclusive access.
 *
 * Each public operation opens a release scope: when the scope ends the
 * client's `disconnect` runs, whether the operation succeeded, failed,
 * timed out or was dropped mid-flight.
 */
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tracing::{debug, trace, warn};

use miioflow_core::config::SchedulerConfig;
use miioflow_core::types::{PropertyMap, PropertySnapshot, Value};
use miioflow_core::utils::{duration_to_millis, with_deadline};
use miioflow_devices::{Command, CommandRegistry, ConnectionState, DeviceError, DeviceInfo, MiioClient};

use crate::backoff::OfflineBackoff;
use crate::command::{BatchCommand, BatchFailure};
use crate::error::{Error, Result};

/// Label of the connection handshake
pub const INIT_LABEL: &str = "device.init";

/// Label of the property wait
pub const PROPERTIES_LABEL: &str = "device.properties";

/// Label used for a setter or action
pub fn setter_label(name: &str) -> String {
    format!("device.set{}", name)
}

/// Deadlines a session applies to individual device calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    /// Bound on the connection handshake
    pub init_timeout: Duration,
    /// Bound on a property wait or setter call
    pub operation_timeout: Duration,
    /// Backoff window after a failed connection
    pub offline_backoff: Duration,
}

impl From<&SchedulerConfig> for SessionTimings {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            init_timeout: config.init_timeout(),
            operation_timeout: config.operation_timeout(),
            offline_backoff: config.offline_backoff(),
        }
    }
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

/// Releases the connection when dropped
struct ReleaseGuard {
    client: Arc<dyn MiioClient>,
    state: Arc<watch::Sender<ConnectionState>>,
    address: String,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        release(self.client.as_ref(), &self.state, &self.address);
    }
}

fn release(client: &dyn MiioClient, state: &watch::Sender<ConnectionState>, address: &str) {
    state.send_replace(ConnectionState::Disconnecting);
    if let Err(e) = client.disconnect() {
        debug!("Ignoring disconnect failure for {}: {}", address, e);
    }
    state.send_replace(ConnectionState::Disconnected);
}

/// Connection lifecycle and last snapshot of one device
#[derive(Debug)]
pub struct DeviceSession {
    info: DeviceInfo,
    client: Arc<dyn MiioClient>,
    state: Arc<watch::Sender<ConnectionState>>,
    backoff: OfflineBackoff,
    snapshot: Option<PropertySnapshot>,
    timings: SessionTimings,
}

impl DeviceSession {
    /// Create a disconnected session
    pub fn new(info: DeviceInfo, client: Arc<dyn MiioClient>, timings: SessionTimings) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            info,
            client,
            state: Arc::new(state),
            backoff: OfflineBackoff::new(timings.offline_backoff),
            snapshot: None,
            timings,
        }
    }

    /// Device identity
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Device address
    pub fn address(&self) -> &str {
        &self.info.address
    }

    /// Current connection state
    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch connection state changes
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Last snapshot from a successful poll
    pub fn snapshot(&self) -> Option<&PropertySnapshot> {
        self.snapshot.as_ref()
    }

    /// Backoff state
    pub fn backoff(&self) -> &OfflineBackoff {
        &self.backoff
    }

    fn release_scope(&self) -> ReleaseGuard {
        ReleaseGuard {
            client: self.client.clone(),
            state: self.state.clone(),
            address: self.info.address.clone(),
        }
    }

    /// Connect to the device
    ///
    /// Returns [`Error::Offline`] without any I/O while the backoff window is
    /// open. A failed or timed-out attempt opens the window; a successful
    /// one clears it.
    pub async fn connect(&mut self) -> Result<()> {
        if let Some(remaining) = self.backoff.remaining() {
            debug!(
                "Skipping connection to {}, offline for another {:?}",
                self.info.address, remaining
            );
            return Err(Error::Offline {
                address: self.info.address.clone(),
                remaining_ms: duration_to_millis(remaining),
            });
        }

        self.state.send_replace(ConnectionState::Connecting);
        let outcome = with_deadline(self.timings.init_timeout, INIT_LABEL, self.client.connect()).await;

        let error = match outcome {
            Ok(Ok(())) => {
                self.backoff.record_success();
                self.state.send_replace(ConnectionState::Ready);
                trace!("Connected to {}", self.info.address);
                return Ok(());
            }
            Ok(Err(e)) => Error::device(&self.info.address, INIT_LABEL, e),
            Err(timed_out) => Error::connect_timeout(&self.info.address, timed_out),
        };

        self.backoff.record_failure();
        self.disconnect();
        warn!(
            "Connection to {} failed, backing off for {:?}: {}",
            self.info.address,
            self.backoff.window(),
            error
        );
        Err(error)
    }

    /// Release the connection; idempotent, client errors are swallowed
    pub fn disconnect(&self) {
        release(self.client.as_ref(), &self.state, &self.info.address);
    }

    /// Poll the device and replace the snapshot on success
    ///
    /// The previous snapshot is left untouched on any failure.
    pub async fn refresh_properties(&mut self) -> Result<PropertySnapshot> {
        let _release = self.release_scope();
        let mut properties = self.client.subscribe_properties();
        self.connect().await?;

        let map = with_deadline(
            self.timings.operation_timeout,
            PROPERTIES_LABEL,
            next_properties(&mut properties),
        )
        .await
        .map_err(|t| Error::operation_timeout(&self.info.address, t))?
        .map_err(|e| Error::device(&self.info.address, PROPERTIES_LABEL, e))?;

        let snapshot = PropertySnapshot::new(map);
        debug!("Received {} properties from {}", snapshot.len(), self.info.address);
        self.snapshot = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Invoke one named command
    ///
    /// The argument is validated before any I/O. The handshake only runs
    /// for clients that require it.
    pub async fn invoke(&mut self, name: &str, command: &Command, value: &Value) -> Result<()> {
        let prepared = command
            .prepare(name, value)
            .map_err(|e| Error::device(&self.info.address, setter_label(name), e))?;

        let _release = self.release_scope();
        if self.client.requires_handshake() {
            self.connect().await?;
        }
        self.execute(name, command, prepared).await
    }

    /// Invoke every entry of a batch within one connection scope
    ///
    /// A connection failure fails the whole batch. Afterwards each entry is
    /// resolved and invoked on its own; failures are collected and the
    /// remaining entries still run.
    pub async fn invoke_batch(
        &mut self,
        commands: &CommandRegistry,
        batch: &BatchCommand,
    ) -> Result<Vec<BatchFailure>> {
        let _release = self.release_scope();
        if self.client.requires_handshake() {
            self.connect().await?;
        }

        let mut failures = Vec::new();
        for (key, value) in batch.iter() {
            let outcome = match commands.resolve(key) {
                Ok(command) => match command.prepare(key, value) {
                    Ok(prepared) => self.execute(key, command, prepared).await,
                    Err(e) => Err(Error::device(&self.info.address, setter_label(key), e)),
                },
                Err(e) => Err(Error::device(&self.info.address, setter_label(key), e)),
            };

            if let Err(error) = outcome {
                let failure = BatchFailure {
                    key: key.to_string(),
                    value: value.clone(),
                    error,
                };
                warn!("{}", failure.message());
                failures.push(failure);
            }
        }

        Ok(failures)
    }

    async fn execute(&self, name: &str, command: &Command, prepared: Value) -> Result<()> {
        let label = setter_label(name);
        let did = self.info.id.to_string();

        with_deadline(
            self.timings.operation_timeout,
            &label,
            command.execute(self.client.as_ref(), &did, name, prepared),
        )
        .await
        .map_err(|t| Error::operation_timeout(&self.info.address, t))?
        .map_err(|e| Error::device(&self.info.address, &label, e))
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        debug!("Closing session for {}", self.info.address);
        self.disconnect();
    }
}

async fn next_properties(
    properties: &mut broadcast::Receiver<PropertyMap>,
) -> std::result::Result<PropertyMap, DeviceError> {
    loop {
        match properties.recv().await {
            Ok(map) => return Ok(map),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                trace!("Property stream lagged by {}", missed);
            }
            Err(broadcast::error::RecvError::Closed) => {
                return Err(DeviceError::protocol("property stream closed"));
            }
        }
    }
}
