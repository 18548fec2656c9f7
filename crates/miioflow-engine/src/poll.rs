/*!
 * Periodic property polling.
 *
 * A [`PollLoop`] submits a refresh to the device queue on every tick and
 * waits for its result before the next tick. Failed polls are reported and
 * the loop keeps going; polls skipped during offline backoff are silent.
 */
use std::future::Future;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn, Instrument};

use miioflow_core::event::EventChannel;
use miioflow_core::logging::Span;
use miioflow_core::types::PropertySnapshot;

use crate::change::{detect, Change};
use crate::error::{Error, Result};
use crate::events::DeviceEvent;
use crate::queue::OperationQueue;
use crate::session::DeviceSession;

/// Queue label of a property refresh
pub const REFRESH_LABEL: &str = "refresh";

/// Refresh properties through the queue and publish Init/Changed
///
/// The refresh is queued when this is called; the returned future only
/// waits for it. Detection and publishing happen inside the queued job,
/// right after the snapshot is replaced, so dropping the returned future
/// never loses an event.
///
/// # Arguments
///
/// * `queue` - The device queue
/// * `deadline` - Optional bound on the whole refresh
/// * `events` - Where Init and Changed are published
pub fn refresh_and_detect(
    queue: &OperationQueue<DeviceSession>,
    deadline: Option<Duration>,
    events: &EventChannel<DeviceEvent>,
) -> impl Future<Output = Result<PropertySnapshot>> + Send + 'static {
    let events = events.clone();
    queue.submit(REFRESH_LABEL, deadline, move |session: &mut DeviceSession| {
        async move {
            let previous = session.snapshot().cloned();
            let current = session.refresh_properties().await?;
            publish_change(&events, session.address(), previous.as_ref(), &current);
            Ok::<_, Error>(current)
        }
        .boxed()
    })
}

fn publish_change(
    events: &EventChannel<DeviceEvent>,
    address: &str,
    previous: Option<&PropertySnapshot>,
    current: &PropertySnapshot,
) {
    match detect(previous, current) {
        Change::Baseline => {
            events.publish(DeviceEvent::Init {
                snapshot: current.clone(),
            });
        }
        Change::Changed(keys) => {
            debug!("Properties changed on {}: {}", address, keys.join(", "));
            events.publish(DeviceEvent::Changed {
                snapshot: current.clone(),
                keys,
            });
        }
        Change::Unchanged => trace!("No property changes on {}", address),
    }
}

/// Run one poll cycle, turning failures into events
///
/// Resolves to the new snapshot, or `None` when the poll failed or was
/// skipped during offline backoff.
pub fn poll_once(
    queue: &OperationQueue<DeviceSession>,
    events: &EventChannel<DeviceEvent>,
) -> impl Future<Output = Option<PropertySnapshot>> + Send + 'static {
    let refresh = refresh_and_detect(queue, None, events);
    let events = events.clone();

    async move {
        match refresh.await {
            Ok(snapshot) => Some(snapshot),
            Err(e) if e.is_offline() => {
                debug!("Poll skipped: {}", e);
                None
            }
            Err(e) => {
                warn!("Poll failed: {}", e);
                events.publish(DeviceEvent::PollError {
                    message: e.to_string(),
                });
                None
            }
        }
    }
}

/// Handle to a running poll loop
#[derive(Debug)]
pub struct PollLoop {
    period: Duration,
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PollLoop {
    /// Start polling every `period`; the first poll happens after one period
    pub fn spawn(
        period: Duration,
        queue: OperationQueue<DeviceSession>,
        events: EventChannel<DeviceEvent>,
        span: Span,
    ) -> Self {
        let (stop, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run(period, queue, events, stop_rx).instrument(span));
        Self {
            period,
            stop,
            handle,
        }
    }

    /// The polling period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Whether the loop task has ended
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the loop and wait for it to exit
    ///
    /// A refresh already submitted still runs in the queue; its result is
    /// discarded.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.handle.await {
            warn!("Poll loop ended abnormally: {}", e);
        }
    }
}

async fn run(
    period: Duration,
    queue: OperationQueue<DeviceSession>,
    events: EventChannel<DeviceEvent>,
    mut stop: watch::Receiver<bool>,
) {
    info!("Polling {} every {:?}", queue.owner(), period);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = poll_once(&queue, &events) => {}
        }
    }

    debug!("Polling of {} stopped", queue.owner());
}
