/*!
 * Device client contract for miioflow.
 *
 * The wire protocol itself lives outside this workspace. Schedulers talk to
 * a device only through [`MiioClient`], and obtain clients from a
 * [`ClientFactory`].
 */
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::debug;

use miioflow_core::types::{PropertyMap, Value};

use crate::device::{DeviceError, DeviceInfo, Result};

/// Client for a single MiIO/MIoT device connection
#[async_trait]
pub trait MiioClient: Send + Sync + Debug {
    /// Whether a handshake (`connect`) is needed before property writes
    ///
    /// True for MIoT-typed models.
    fn requires_handshake(&self) -> bool;

    /// Perform the handshake and start delivering properties
    async fn connect(&self) -> Result<()>;

    /// Release the connection; best effort and idempotent
    fn disconnect(&self) -> Result<()>;

    /// Subscribe to raw property maps delivered by the client
    ///
    /// Subscribe before calling [`MiioClient::connect`] so the first
    /// delivery is not missed.
    fn subscribe_properties(&self) -> broadcast::Receiver<PropertyMap>;

    /// Write a single property
    async fn set_property(&self, key: &str, value: Value) -> Result<()>;

    /// Send a raw protocol call and return the decoded result
    async fn send(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value>;
}

/// Creates device clients for configured devices
pub trait ClientFactory: Send + Sync + Debug {
    /// Create a client for the given device
    fn create(&self, info: &DeviceInfo) -> Result<Arc<dyn MiioClient>>;
}

/// Invoke a MIoT action and check the device accepted it
///
/// Sends `action` with `[{"did", "siid", "aiid", "in": []}]`. The first
/// element of the reply must carry `code == 0`, anything else (including a
/// missing reply) is [`DeviceError::ActionRejected`].
///
/// # Arguments
///
/// * `client` - The connected client
/// * `did` - Device id
/// * `action` - Action name, used in the error
/// * `siid` - Service id
/// * `aiid` - Action id
pub async fn miot_action(
    client: &dyn MiioClient,
    did: &str,
    action: &str,
    siid: u32,
    aiid: u32,
) -> Result<serde_json::Value> {
    let params = json!([{ "did": did, "siid": siid, "aiid": aiid, "in": [] }]);
    debug!("Invoking action {} ({}/{}) on {}", action, siid, aiid, did);

    let reply = client.send("action", params).await?;
    let first = reply.get(0).cloned().unwrap_or(serde_json::Value::Null);
    let code = first.get("code").and_then(serde_json::Value::as_i64);

    match code {
        Some(0) => Ok(first),
        code => Err(DeviceError::ActionRejected {
            action: action.to_string(),
            code,
        }),
    }
}
