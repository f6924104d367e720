use std::time::Duration;
use tokio::time::Instant;

/// Rate limiter for one flush target
///
/// Callers report each new value with [`Throttle::on_event`]; when it returns
/// `true` they flush right away, otherwise they wait for [`Throttle::deadline`]
/// (typically as a `tokio::select!` branch). [`Throttle::fired`] records a
/// flush and clears the pending state.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_fire: Option<Instant>,
    deadline: Option<Instant>,
    pending: bool,
}

impl Throttle {
    /// The first event fires immediately
    pub fn immediate(interval: Duration) -> Self {
        Self {
            interval,
            last_fire: None,
            deadline: None,
            pending: false,
        }
    }

    /// Behaves as if it last fired at `at`
    pub fn started_at(interval: Duration, at: Instant) -> Self {
        Self {
            last_fire: Some(at),
            ..Self::immediate(interval)
        }
    }

    /// Note a new value. `true` means flush now.
    pub fn on_event(&mut self, now: Instant) -> bool {
        self.pending = true;
        match self.last_fire {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                if self.deadline.is_none() {
                    self.deadline = Some(last + self.interval);
                }
                false
            }
            _ => true,
        }
    }

    pub fn fired(&mut self, now: Instant) {
        self.last_fire = Some(now);
        self.deadline = None;
        self.pending = false;
    }

    /// When the scheduled flush is due, if one is scheduled
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// A value arrived that has not been flushed yet
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
