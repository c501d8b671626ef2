use std::time::{Duration, Instant};

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);

/// Minimum spacing between two fires, measured from the previous fire.
#[derive(Debug, Clone)]
pub struct NotificationThrottle {
    last_fired: Option<Instant>,
    cooldown: Duration,
}

impl Default for NotificationThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl NotificationThrottle {
    pub fn new(cooldown: Duration) -> Self {
        Self { last_fired: None, cooldown }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn last_fired(&self) -> Option<Instant> {
        self.last_fired
    }

    /// Records a fire at `now` when the cooldown has elapsed. Returns whether
    /// the caller may fire.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        let ready = match self.last_fired {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.cooldown,
        };
        if ready {
            self.last_fired = Some(now);
        }
        ready
    }
}
