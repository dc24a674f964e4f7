use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::WARNING_VISIBLE_SECS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ViolationOutcome {
    /// Monitor not armed; nothing counted.
    Ignored,
    Recorded { count: u32 },
    /// Count reached the threshold. Returned once per arming.
    Exceeded { count: u32 },
}

/// Counts focus/visibility losses while armed.
#[derive(Debug, Clone)]
pub struct ViolationMonitor {
    armed: bool,
    max_violations: u32,
    count: u32,
    exceeded: bool,
    warning_window: Duration,
    warning_until: Option<Instant>,
}

impl Default for ViolationMonitor {
    fn default() -> Self {
        Self::new(Duration::from_secs(WARNING_VISIBLE_SECS))
    }
}

impl ViolationMonitor {
    pub fn new(warning_window: Duration) -> Self {
        Self {
            armed: false,
            max_violations: u32::MAX,
            count: 0,
            exceeded: false,
            warning_window,
            warning_until: None,
        }
    }

    pub fn arm(&mut self, max_violations: u32) {
        self.armed = true;
        self.max_violations = max_violations.max(1);
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn max_violations(&self) -> u32 {
        self.max_violations
    }

    pub fn record_violation(&mut self, now: Instant) -> ViolationOutcome {
        if !self.armed {
            return ViolationOutcome::Ignored;
        }

        self.count += 1;
        // Latest violation owns the warning window.
        self.warning_until = Some(now + self.warning_window);

        if self.count >= self.max_violations && !self.exceeded {
            self.exceeded = true;
            ViolationOutcome::Exceeded { count: self.count }
        } else {
            ViolationOutcome::Recorded { count: self.count }
        }
    }

    pub fn warning_visible(&self, now: Instant) -> bool {
        self.warning_until.is_some_and(|until| now < until)
    }
}
