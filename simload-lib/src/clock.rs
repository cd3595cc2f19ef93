use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
/// Monotonic clock shared by all instances and monitors of a run.
///
/// Built on [`tokio::time::Instant`], so it follows a paused tokio clock.
pub struct SimClock {
    start: Instant,
}

impl SimClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Time elapsed since the run started.
    pub fn now(&self) -> Duration {
        self.start.elapsed()
    }

    /// Run-relative timestamp of `instant`, saturating at the run start.
    pub fn offset(&self, instant: Instant) -> Duration {
        instant.saturating_duration_since(self.start)
    }

    pub fn started_at(&self) -> Instant {
        self.start
    }
}
