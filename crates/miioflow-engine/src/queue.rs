/*!
 * Single-flight operation queue.
 *
 * An [`OperationQueue`] is a handle to one worker task that owns a piece of
 * state (a device session) and runs submitted operations against it strictly
 * one at a time, in submission order. Operation N+1 starts only after
 * operation N has finished, whether it succeeded, failed, timed out or
 * panicked.
 */
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, trace, Instrument};

use miioflow_core::error::TimedOut;
use miioflow_core::logging::operation_span;
use miioflow_core::types::Id;
use miioflow_core::utils::with_deadline;

type Job<S> = Box<dyn for<'a> FnOnce(&'a mut S) -> BoxFuture<'a, ()> + Send>;

/// Failures produced by the queue itself rather than by the operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The worker is gone and the operation will never run
    #[error("queue for {owner} closed before {label} completed")]
    Closed {
        /// Queue owner (device address)
        owner: String,
        /// Operation label
        label: String,
    },

    /// The operation exceeded its whole-operation deadline
    #[error("{timed_out} on {owner}")]
    Deadline {
        /// Queue owner (device address)
        owner: String,
        /// The expired deadline
        timed_out: TimedOut,
    },

    /// The operation panicked or was abandoned before producing a result
    #[error("{label} on {owner} panicked")]
    Panicked {
        /// Queue owner (device address)
        owner: String,
        /// Operation label
        label: String,
    },
}

/// A deferred unit of work, consumed exactly once by the worker
pub struct PendingOperation<S> {
    id: Id,
    label: String,
    deadline: Option<Duration>,
    job: Job<S>,
}

impl<S> PendingOperation<S> {
    /// Correlation id used in logs
    pub fn id(&self) -> &Id {
        &self.id
    }

    /// Human-readable label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whole-operation deadline, if any
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }
}

impl<S> std::fmt::Debug for PendingOperation<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingOperation")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("deadline", &self.deadline)
            .finish()
    }
}

/// Handle to a single-consumer operation queue
///
/// Cloning the handle shares the same worker. The worker stops, and drops
/// its state, once every handle is gone and the remaining operations have
/// run.
pub struct OperationQueue<S> {
    owner: String,
    sender: mpsc::UnboundedSender<PendingOperation<S>>,
}

impl<S> Clone for OperationQueue<S> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner.clone(),
            sender: self.sender.clone(),
        }
    }
}

impl<S> std::fmt::Debug for OperationQueue<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationQueue")
            .field("owner", &self.owner)
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

fn constrain<S, F>(job: F) -> F
where
    F: for<'a> FnOnce(&'a mut S) -> BoxFuture<'a, ()>,
{
    job
}

impl<S: Send + 'static> OperationQueue<S> {
    /// Start a worker that owns `state`
    ///
    /// The worker runs inside the caller's current span.
    ///
    /// # Arguments
    ///
    /// * `owner` - Name used in logs and errors (the device address)
    /// * `state` - The state every operation gets exclusive access to
    pub fn spawn<O: Into<String>>(owner: O, state: S) -> (Self, JoinHandle<()>) {
        let owner = owner.into();
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_worker(owner.clone(), state, receiver).in_current_span());
        (Self { owner, sender }, handle)
    }

    /// Name of the queue owner
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Whether the worker has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Submit an operation
    ///
    /// The queue position is fixed when this is called, not when the
    /// returned future is first polled. Dropping the returned future does
    /// not cancel the operation; it still runs and its result is discarded.
    ///
    /// # Arguments
    ///
    /// * `label` - Human-readable label for logs and errors
    /// * `deadline` - Optional bound on the whole operation; on expiry the
    ///   work is dropped and [`QueueError::Deadline`] is returned
    /// * `work` - The operation, given exclusive access to the state
    pub fn submit<T, E, F, L>(
        &self,
        label: L,
        deadline: Option<Duration>,
        work: F,
    ) -> impl Future<Output = Result<T, E>> + Send + 'static
    where
        L: Into<String>,
        T: Send + 'static,
        E: From<QueueError> + Send + 'static,
        F: for<'a> FnOnce(&'a mut S) -> BoxFuture<'a, Result<T, E>> + Send + 'static,
    {
        let label = label.into();
        let (resp_tx, resp_rx) = oneshot::channel();

        let owner = self.owner.clone();
        let job_label = label.clone();
        let job = constrain(move |state: &mut S| {
            async move {
                let output = match deadline {
                    Some(deadline) => match with_deadline(deadline, &job_label, work(state)).await {
                        Ok(output) => output,
                        Err(timed_out) => Err(E::from(QueueError::Deadline { owner, timed_out })),
                    },
                    None => work(state).await,
                };
                if resp_tx.send(output).is_err() {
                    trace!("Submitter of {} went away before the result", job_label);
                }
            }
            .boxed()
        });

        let operation = PendingOperation {
            id: Id::random(),
            label: label.clone(),
            deadline,
            job: Box::new(job),
        };
        let accepted = self.sender.send(operation).is_ok();
        let owner = self.owner.clone();

        async move {
            if !accepted {
                return Err(E::from(QueueError::Closed { owner, label }));
            }
            match resp_rx.await {
                Ok(output) => output,
                Err(_) => Err(E::from(QueueError::Panicked { owner, label })),
            }
        }
    }
}

async fn run_worker<S>(
    owner: String,
    mut state: S,
    mut receiver: mpsc::UnboundedReceiver<PendingOperation<S>>,
) {
    debug!("Operation queue for {} started", owner);

    while let Some(operation) = receiver.recv().await {
        let PendingOperation { id, label, job, .. } = operation;
        let span = operation_span(&label, id.as_str());
        let started = Instant::now();

        let outcome = AssertUnwindSafe(job(&mut state))
            .catch_unwind()
            .instrument(span)
            .await;

        match outcome {
            Ok(()) => trace!("{} on {} finished in {:?}", label, owner, started.elapsed()),
            Err(panic) => error!(
                "{} on {} panicked: {}",
                label,
                owner,
                panic_message(panic.as_ref())
            ),
        }
    }

    debug!("Operation queue for {} stopped", owner);
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
