/*!
 * Utility functions and helpers for miioflow.
 */
use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;
use tracing::debug;

use crate::error::TimedOut;

/// Race a future against a deadline
///
/// If the deadline fires first the future is dropped, which cancels any I/O
/// it was awaiting, and a [`TimedOut`] carrying `label` is returned. The
/// future's own output (including its own errors) is passed through untouched.
///
/// # Arguments
///
/// * `deadline` - How long to wait
/// * `label` - Name of the guarded operation, used in the error message
/// * `future` - The work to guard
pub async fn with_deadline<F, T>(deadline: Duration, label: &str, future: F) -> Result<T, TimedOut>
where
    F: Future<Output = T>,
{
    match timeout(deadline, future).await {
        Ok(output) => Ok(output),
        Err(_) => {
            debug!("{} timed out after {:?}", label, deadline);
            Err(TimedOut::new(label, deadline))
        }
    }
}

/// Convert a Duration to whole milliseconds, saturating
pub fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
