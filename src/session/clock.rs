// src/session/clock.rs — Active-time accounting that excludes paused spans

use std::time::Duration;
use tokio::time::Instant;

/// Sum of running intervals. Uses tokio's clock so paused-time tests are exact.
#[derive(Debug, Clone, Default)]
pub struct ActiveClock {
    accumulated: Duration,
    running_since: Option<Instant>,
}

impl ActiveClock {
    pub fn started() -> Self {
        let mut clock = Self::default();
        clock.resume();
        clock
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    /// Start a new interval. No-op if already running.
    pub fn resume(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    /// Close the current interval. No-op if already stopped.
    pub fn pause(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self.running_since {
            Some(since) => self.accumulated + since.elapsed(),
            None => self.accumulated,
        }
    }
}
