/*!
 * Event fan-out for miioflow.
 *
 * A typed broadcast channel used at component edges to publish
 * notifications (poll results, command outcomes) to any number of
 * subscribers. Publishing never blocks and never fails because nobody is
 * listening.
 */
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{trace, warn};

use crate::types::Id;

/// Maximum number of events that can be buffered per subscriber
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// An event together with its source and publication time
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    /// Source of the event (the device id)
    pub source: Id,
    /// When the event was published
    pub timestamp: DateTime<Utc>,
    /// The event itself
    pub payload: T,
}

/// Broadcast channel for one event type
#[derive(Debug, Clone)]
pub struct EventChannel<T: Clone> {
    source: Id,
    sender: broadcast::Sender<Envelope<T>>,
}

impl<T: Clone + Debug + Send + 'static> EventChannel<T> {
    /// Create a channel publishing on behalf of `source`
    pub fn new(source: Id) -> Self {
        Self::with_capacity(source, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a channel with a specific per-subscriber buffer
    pub fn with_capacity(source: Id, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { source, sender }
    }

    /// The source id stamped on every event
    pub fn source(&self) -> &Id {
        &self.source
    }

    /// Publish an event, returning how many subscribers received it
    pub fn publish(&self, payload: T) -> usize {
        let envelope = Envelope {
            source: self.source.clone(),
            timestamp: Utc::now(),
            payload,
        };

        match self.sender.send(envelope) {
            Ok(n) => {
                trace!("Published event from {} to {} receivers", self.source, n);
                n
            }
            Err(broadcast::error::SendError(envelope)) => {
                trace!("No receivers for event from {}: {:?}", self.source, envelope.payload);
                0
            }
        }
    }

    /// Subscribe to events published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope<T>> {
        self.sender.subscribe()
    }

    /// Number of live subscribers
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receive the next event, skipping over any the subscriber was too slow for
///
/// Returns `None` once the channel is closed.
pub async fn recv_lossy<T: Clone>(rx: &mut broadcast::Receiver<Envelope<T>>) -> Option<Envelope<T>> {
    loop {
        match rx.recv().await {
            Ok(envelope) => return Some(envelope),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!("Event subscriber lagged, {} events dropped", missed);
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}
