use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::InterviewError;

/// An open capture stream.
pub trait MediaStream: Send {
    fn stop_tracks(&mut self);
}

/// Source of capture streams. Errors are `InterviewError::Permission`.
pub trait MediaDevice: Send + Sync {
    fn open(&self) -> Result<Box<dyn MediaStream>, InterviewError>;
}

/// Holds a stream and stops its tracks exactly once, on release or drop.
pub struct CameraGuard {
    stream: Option<Box<dyn MediaStream>>,
}

impl CameraGuard {
    pub fn acquire(device: &dyn MediaDevice) -> Result<Self, InterviewError> {
        let stream = device.open()?;
        Ok(Self {
            stream: Some(stream),
        })
    }

    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop_tracks();
        }
    }

    pub fn is_live(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for CameraGuard {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CameraStatus {
    Off,
    Live,
    Blocked { reason: String },
}

/// Camera preview bound to proctoring being active.
pub struct Camera {
    device: Arc<dyn MediaDevice>,
    guard: Option<CameraGuard>,
    status: CameraStatus,
}

impl Camera {
    pub fn new(device: Arc<dyn MediaDevice>) -> Self {
        Self {
            device,
            guard: None,
            status: CameraStatus::Off,
        }
    }

    pub fn activate(&mut self) -> &CameraStatus {
        if self.guard.is_some() {
            return &self.status;
        }
        match CameraGuard::acquire(self.device.as_ref()) {
            Ok(guard) => {
                self.guard = Some(guard);
                self.status = CameraStatus::Live;
            }
            Err(e) => {
                warn!("Camera unavailable: {}", e);
                self.status = CameraStatus::Blocked {
                    reason: e.to_string(),
                };
            }
        }
        &self.status
    }

    /// Safe to call any number of times.
    pub fn deactivate(&mut self) {
        if let Some(mut guard) = self.guard.take() {
            guard.release();
            debug!("Camera released");
        }
        self.status = CameraStatus::Off;
    }

    /// Client-side capture failed after activation.
    pub fn mark_blocked(&mut self, reason: impl Into<String>) {
        if let Some(mut guard) = self.guard.take() {
            guard.release();
        }
        self.status = CameraStatus::Blocked {
            reason: reason.into(),
        };
    }

    pub fn status(&self) -> &CameraStatus {
        &self.status
    }

    pub fn is_live(&self) -> bool {
        self.guard.as_ref().is_some_and(CameraGuard::is_live)
    }
}

/// Capture runs in the browser; the server only tracks whether it should.
#[derive(Default)]
pub struct ClientCamera;

struct ClientStream;

impl MediaStream for ClientStream {
    fn stop_tracks(&mut self) {
        debug!("Client capture stop requested");
    }
}

impl MediaDevice for ClientCamera {
    fn open(&self) -> Result<Box<dyn MediaStream>, InterviewError> {
        Ok(Box::new(ClientStream))
    }
}
