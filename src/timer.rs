use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Not running (never started, cancelled, or already expired).
    Idle,
    Running { remaining: u64 },
    /// Reached zero on this tick. Reported once.
    Expired,
}

/// Whole-second countdown. Pure; driven by `SessionTimer` or tests.
#[derive(Debug, Clone, Default)]
pub struct CountdownClock {
    remaining: u64,
    running: bool,
    expired: bool,
}

impl CountdownClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, duration_secs: u64) {
        self.remaining = duration_secs;
        self.running = true;
        self.expired = false;
    }

    pub fn tick(&mut self) -> Tick {
        if !self.running {
            return Tick::Idle;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
            self.expired = true;
            Tick::Expired
        } else {
            Tick::Running {
                remaining: self.remaining,
            }
        }
    }

    pub fn cancel(&mut self) {
        self.running = false;
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn has_expired(&self) -> bool {
        self.expired
    }
}

/// Background task invoking `on_tick` once per period until it breaks or is cancelled.
pub struct SessionTimer {
    handle: Option<JoinHandle<()>>,
}

impl SessionTimer {
    pub fn spawn<F, Fut>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if on_tick().await.is_break() {
                    debug!("Session timer finished");
                    break;
                }
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Safe to call repeatedly; no tick fires after this returns.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Session timer cancelled");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
