/*!
 * Offline backoff.
 *
 * After a failed connection attempt no further attempt is made until the
 * backoff window has elapsed. A successful connection clears the window.
 */
use std::time::Duration;

use tokio::time::Instant;

/// Default backoff window
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(5000);

/// Tracks "do not connect until" for one device
#[derive(Debug, Clone)]
pub struct OfflineBackoff {
    window: Duration,
    until: Option<Instant>,
}

impl Default for OfflineBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl OfflineBackoff {
    /// Create a backoff with the given window
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            until: None,
        }
    }

    /// The configured window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Time left before the next attempt is allowed, if still backing off
    ///
    /// An expired window is cleared here, so `until` is always either unset
    /// or in the future after this returns.
    pub fn remaining(&mut self) -> Option<Duration> {
        let until = self.until?;
        let now = Instant::now();
        if now < until {
            Some(until - now)
        } else {
            self.until = None;
            None
        }
    }

    /// Whether a connection attempt must be skipped right now
    pub fn should_skip(&mut self) -> bool {
        self.remaining().is_some()
    }

    /// A connection attempt failed
    pub fn record_failure(&mut self) {
        self.until = Some(Instant::now() + self.window);
    }

    /// A connection attempt succeeded
    pub fn record_success(&mut self) {
        self.until = None;
    }

    /// End of the current window, if any
    pub fn until(&self) -> Option<Instant> {
        self.until
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_failure_opens_window() {
        let mut backoff = OfflineBackoff::default();
        assert!(!backoff.should_skip());

        backoff.record_failure();
        assert!(backoff.should_skip());
        assert_eq!(backoff.remaining(), Some(Duration::from_millis(5000)));

        advance(Duration::from_millis(4999)).await;
        assert_eq!(backoff.remaining(), Some(Duration::from_millis(1)));

        advance(Duration::from_millis(1)).await;
        assert!(!backoff.should_skip());
        assert!(backoff.until().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_clears_window() {
        let mut backoff = OfflineBackoff::new(Duration::from_secs(1));
        backoff.record_failure();
        backoff.record_success();
        assert!(!backoff.should_skip());
        assert_eq!(backoff.window(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_failure_extends_window() {
        let mut backoff = OfflineBackoff::new(Duration::from_secs(5));
        backoff.record_failure();
        advance(Duration::from_secs(3)).await;
        backoff.record_failure();
        advance(Duration::from_secs(3)).await;
        assert_eq!(backoff.remaining(), Some(Duration::from_secs(2)));
    }
}
