use serde::{Deserialize, Serialize};

/// A millisecond countdown advanced by simulation time, never wall-clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    pub remaining_ms: f32,
}

impl Countdown {
    pub fn new(duration_ms: f32) -> Self {
        Self {
            remaining_ms: duration_ms.max(0.0),
        }
    }

    pub fn expired() -> Self {
        Self { remaining_ms: 0.0 }
    }

    /// Advance by `delta_ms`. Returns true on the tick the countdown reaches zero.
    pub fn tick(&mut self, delta_ms: f32) -> bool {
        if self.remaining_ms <= 0.0 {
            return false;
        }
        self.remaining_ms = (self.remaining_ms - delta_ms).max(0.0);
        self.remaining_ms <= 0.0
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_ms <= 0.0
    }

    pub fn is_running(&self) -> bool {
        !self.is_expired()
    }
}

/// Cooldown keyed on an explicit timestamp, for "at most once every N ms" rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cooldown {
    pub duration_ms: f64,
    pub last_fired_ms: Option<f64>,
}

impl Cooldown {
    pub fn new(duration_ms: f64) -> Self {
        Self {
            duration_ms,
            last_fired_ms: None,
        }
    }

    pub fn ready(&self, now_ms: f64) -> bool {
        match self.last_fired_ms {
            Some(last) => now_ms - last >= self.duration_ms,
            None => true,
        }
    }

    pub fn fire(&mut self, now_ms: f64) {
        self.last_fired_ms = Some(now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_reports_expiry_once() {
        let mut c = Countdown::new(100.0);
        assert!(!c.tick(60.0));
        assert!(c.tick(60.0));
        assert!(c.is_expired());
        assert!(!c.tick(60.0));
    }

    #[test]
    fn cooldown_boundary_is_inclusive() {
        let mut cd = Cooldown::new(1500.0);
        assert!(cd.ready(0.0));
        cd.fire(0.0);
        assert!(!cd.ready(1000.0));
        assert!(cd.ready(1500.0));
    }
}
