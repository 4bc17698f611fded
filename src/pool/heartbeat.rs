//! Liveness notices for long-running suites
//!
//! The first notice comes after a fixed delay; every following gap is one
//! step longer than the previous one (15s, 35s, 60s, 90s, ... with the
//! defaults). Notices never stop a suite.

use std::time::Duration;

use crate::common::config::HeartbeatConfig;

/// Schedule shared by all workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatSchedule {
    first: Duration,
    step: Duration,
}

impl HeartbeatSchedule {
    pub fn new(first: Duration, step: Duration) -> Self {
        Self { first, step }
    }

    /// No notices at all
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        !self.first.is_zero()
    }

    /// Start a heartbeat for one suite
    pub fn start(&self) -> Heartbeat {
        Heartbeat {
            next: self.first,
            gap: self.first,
            step: self.step,
        }
    }
}

impl From<&HeartbeatConfig> for HeartbeatSchedule {
    fn from(config: &HeartbeatConfig) -> Self {
        Self::new(config.first(), config.step())
    }
}

/// Position of one suite within the schedule
#[derive(Debug, Clone)]
pub struct Heartbeat {
    next: Duration,
    gap: Duration,
    step: Duration,
}

impl Heartbeat {
    /// Elapsed time at which the next notice is due
    pub fn next_due(&self) -> Duration {
        self.next
    }

    /// Move past the notice that just fired
    pub fn advance(&mut self) {
        self.gap += self.step;
        self.next += self.gap;
    }
}
