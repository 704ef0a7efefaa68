use std::time::Duration;
use tokio::time::Instant;

/// Flags a location subscription that has gone quiet.
///
/// Any fix or error counts as a sign of life. Once `window` passes without
/// one the subscription is considered dead and should be re-established.
#[derive(Debug, Clone)]
pub struct StallWatchdog {
    window: Duration,
    last_activity: Instant,
}

impl StallWatchdog {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_activity: Instant::now(),
        }
    }

    /// Record activity now.
    pub fn feed(&mut self) {
        self.feed_at(Instant::now());
    }

    pub fn feed_at(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// When the subscription will be considered stalled.
    pub fn deadline(&self) -> Instant {
        self.last_activity + self.window
    }

    pub fn is_stalled(&self, now: Instant) -> bool {
        now >= self.deadline()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
