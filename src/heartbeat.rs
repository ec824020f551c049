// src/heartbeat.rs

/// Last hour-of-day a heartbeat was logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbeatState {
    last_hour: Option<u32>,
}

impl HeartbeatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `heartbeat` unless one was already logged for `hour`.
    /// Returns whether a line was emitted.
    pub fn tick(&mut self, hour: u32) -> bool {
        if self.last_hour == Some(hour) {
            return false;
        }
        self.last_hour = Some(hour);
        tracing::info!(hour, "heartbeat");
        true
    }

    pub fn last_hour(&self) -> Option<u32> {
        self.last_hour
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn once_per_hour() {
        let mut hb = HeartbeatState::new();
        assert!(hb.tick(9));
        assert!(!hb.tick(9));
        assert!(hb.tick(10));
        assert_eq!(hb.last_hour(), Some(10));
    }

    #[test]
    fn same_hour_next_day_after_other_hours_emits_again() {
        let mut hb = HeartbeatState::new();
        assert!(hb.tick(23));
        assert!(hb.tick(0));
        assert!(hb.tick(23));
    }
}
