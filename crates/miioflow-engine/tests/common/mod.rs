/*!
 * Scripted device client shared by the engine integration tests.
 */
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::broadcast;

use miioflow_core::config::{DeviceConfig, PollingConfig, SchedulerConfig};
use miioflow_core::types::{PropertyMap, Value};
use miioflow_devices::device::Result as DeviceResult;
use miioflow_devices::{ClientFactory, DeviceError, DeviceInfo, MiioClient};

/// How the next `connect` call behaves
#[derive(Debug, Clone)]
pub enum Connect {
    Succeed,
    Fail(String),
    Hang,
}

/// Counters and call logs recorded by [`MockClient`]
#[derive(Debug, Default)]
struct Calls {
    connect_attempts: AtomicUsize,
    disconnects: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    set_calls: Mutex<Vec<(String, Value)>>,
    sent: Mutex<Vec<(String, serde_json::Value)>>,
}

/// In-memory stand-in for a MiIO device
#[derive(Debug)]
pub struct MockClient {
    handshake: bool,
    connect_script: Mutex<VecDeque<Connect>>,
    connect_default: Connect,
    snapshots: Mutex<VecDeque<PropertyMap>>,
    last_snapshot: Mutex<PropertyMap>,
    properties: broadcast::Sender<PropertyMap>,
    set_failures: HashMap<String, String>,
    hanging_keys: Vec<String>,
    action_reply: serde_json::Value,
    call_delay: Duration,
    calls: Calls,
}

impl MockClient {
    pub fn new() -> Self {
        let (properties, _) = broadcast::channel(16);
        Self {
            handshake: true,
            connect_script: Mutex::new(VecDeque::new()),
            connect_default: Connect::Succeed,
            snapshots: Mutex::new(VecDeque::new()),
            last_snapshot: Mutex::new(PropertyMap::new()),
            properties,
            set_failures: HashMap::new(),
            hanging_keys: Vec::new(),
            action_reply: json!([{ "code": 0 }]),
            call_delay: Duration::ZERO,
            calls: Calls::default(),
        }
    }

    pub fn without_handshake(mut self) -> Self {
        self.handshake = false;
        self
    }

    /// Snapshots delivered on successive connects; the last one repeats
    pub fn with_snapshots(self, snapshots: Vec<PropertyMap>) -> Self {
        *self.snapshots.lock().unwrap() = snapshots.into();
        self
    }

    /// Behaviour of successive connects, then `fallback` once exhausted
    pub fn with_connects(mut self, script: Vec<Connect>, fallback: Connect) -> Self {
        *self.connect_script.lock().unwrap() = script.into();
        self.connect_default = fallback;
        self
    }

    pub fn failing_connect(self) -> Self {
        self.with_connects(Vec::new(), Connect::Fail("socket timeout".to_string()))
    }

    pub fn with_set_failure(mut self, key: &str, message: &str) -> Self {
        self.set_failures.insert(key.to_string(), message.to_string());
        self
    }

    pub fn with_hanging_set(mut self, key: &str) -> Self {
        self.hanging_keys.push(key.to_string());
        self
    }

    pub fn with_action_reply(mut self, reply: serde_json::Value) -> Self {
        self.action_reply = reply;
        self
    }

    /// Every device call sleeps this long
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = delay;
        self
    }

    pub fn connect_attempts(&self) -> usize {
        self.calls.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.calls.disconnects.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.calls.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> Vec<(String, Value)> {
        self.calls.set_calls.lock().unwrap().clone()
    }

    pub fn set_keys(&self) -> Vec<String> {
        self.set_calls().into_iter().map(|(key, _)| key).collect()
    }

    pub fn sent(&self) -> Vec<(String, serde_json::Value)> {
        self.calls.sent.lock().unwrap().clone()
    }

    /// Count a call as in flight until the returned guard drops
    fn enter(&self) -> InFlight<'_> {
        let now = self.calls.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.max_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(&self.calls)
    }

    async fn pause(&self) {
        if !self.call_delay.is_zero() {
            tokio::time::sleep(self.call_delay).await;
        }
    }

    fn next_connect(&self) -> Connect {
        self.connect_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.connect_default.clone())
    }

    fn next_snapshot(&self) -> PropertyMap {
        let mut last = self.last_snapshot.lock().unwrap();
        if let Some(next) = self.snapshots.lock().unwrap().pop_front() {
            *last = next;
        }
        last.clone()
    }
}

struct InFlight<'a>(&'a Calls);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MiioClient for MockClient {
    fn requires_handshake(&self) -> bool {
        self.handshake
    }

    async fn connect(&self) -> DeviceResult<()> {
        let _in_flight = self.enter();
        self.calls.connect_attempts.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        match self.next_connect() {
            Connect::Succeed => {
                let _ = self.properties.send(self.next_snapshot());
                Ok(())
            }
            Connect::Fail(message) => Err(DeviceError::protocol(message)),
            Connect::Hang => std::future::pending().await,
        }
    }

    fn disconnect(&self) -> DeviceResult<()> {
        self.calls.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn subscribe_properties(&self) -> broadcast::Receiver<PropertyMap> {
        self.properties.subscribe()
    }

    async fn set_property(&self, key: &str, value: Value) -> DeviceResult<()> {
        let _in_flight = self.enter();
        self.pause().await;

        if self.hanging_keys.iter().any(|k| k == key) {
            return std::future::pending().await;
        }
        if let Some(message) = self.set_failures.get(key) {
            return Err(DeviceError::protocol(message.clone()));
        }
        self.calls.set_calls.lock().unwrap().push((key.to_string(), value));
        Ok(())
    }

    async fn send(&self, method: &str, params: serde_json::Value) -> DeviceResult<serde_json::Value> {
        let _in_flight = self.enter();
        self.pause().await;
        self.calls.sent.lock().unwrap().push((method.to_string(), params));
        Ok(self.action_reply.clone())
    }
}

/// Factory handing out pre-built mock clients by device id
#[derive(Debug, Default)]
pub struct MockFactory {
    clients: Mutex<HashMap<String, Arc<MockClient>>>,
}

impl MockFactory {
    pub fn with_client(self, id: &str, client: Arc<MockClient>) -> Self {
        self.clients.lock().unwrap().insert(id.to_string(), client);
        self
    }
}

impl ClientFactory for MockFactory {
    fn create(&self, info: &DeviceInfo) -> DeviceResult<Arc<dyn MiioClient>> {
        let client = self
            .clients
            .lock()
            .unwrap()
            .get(info.id.as_str())
            .cloned()
            .ok_or_else(|| DeviceError::Other(format!("no client for {}", info.id)))?;
        Ok(client)
    }
}

pub fn device_config(id: &str, model: &str, polling: PollingConfig) -> DeviceConfig {
    DeviceConfig {
        id: id.to_string(),
        name: "Kitchen device".to_string(),
        room: "Kitchen".to_string(),
        model: model.to_string(),
        address: "192.168.1.50".to_string(),
        token: "ffffffffffffffffffffffffffffffff".to_string(),
        polling,
    }
}

/// Defaults: 1500 ms device deadlines, 5000 ms backoff, 10 s fetch
pub fn scheduler_config() -> SchedulerConfig {
    SchedulerConfig::default()
}

pub fn properties(entries: &[(&str, Value)]) -> PropertyMap {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}
