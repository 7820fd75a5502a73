//! Minimum spacing between repeated actions

use std::time::{Duration, Instant};

/// Lets an action through at most once per `min_interval`.
///
/// Calls that arrive too early are refused; they aren't queued.
#[derive(Debug, Clone)]
pub struct Throttle {
    min_interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    /// New throttle that hasn't let anything through yet
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// Whether the action may run at `now`. Records the attempt if it may.
    pub fn permit(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.min_interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
