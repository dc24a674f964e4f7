use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{
    InterviewConfig, MAX_ANSWER_CHARS, MAX_VIOLATIONS, SESSION_DURATION_SECS, WARNING_VISIBLE_SECS,
};
use crate::error::InterviewError;
use crate::gateway::GatewayRequest;
use crate::proctor::{
    Camera, CameraStatus, MediaDevice, ProctorSignal, ViolationMonitor, ViolationOutcome,
};
use crate::timer::{CountdownClock, Tick};
use crate::track::Track;
use crate::transcript::{Transcript, Turn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Malpractice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    TimeExpired,
    UserEnded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SessionStatus {
    NotStarted,
    Active,
    Terminated(TerminationReason),
    Completed(CompletionReason),
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Terminated(_) | SessionStatus::Completed(_)
        )
    }

    /// Display label, also stored on attempt records.
    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::NotStarted => "Not Started",
            SessionStatus::Active => "Active",
            SessionStatus::Terminated(TerminationReason::Malpractice) => "Terminated: Malpractice",
            SessionStatus::Completed(_) => "Completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub duration_secs: u64,
    pub max_violations: u32,
    pub warning_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            duration_secs: SESSION_DURATION_SECS,
            max_violations: MAX_VIOLATIONS,
            warning_secs: WARNING_VISIBLE_SECS,
        }
    }
}

impl From<&InterviewConfig> for SessionSettings {
    fn from(config: &InterviewConfig) -> Self {
        Self {
            duration_secs: config.session_duration_secs,
            max_violations: config.max_violations,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    Replied,
    /// Gateway failed; the candidate turn stays recorded.
    Failed(String),
    /// The session left Active while the call was in flight.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalOutcome {
    Ignored,
    Violation(ViolationOutcome),
    MonitoringUnavailable,
}

/// Read-only view returned by the session API.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub track: Track,
    pub track_label: &'static str,
    pub status: SessionStatus,
    pub status_label: &'static str,
    pub transcript: Vec<Turn>,
    pub answers: usize,
    pub accepting_input: bool,
    pub pending: bool,
    pub last_error: Option<String>,
    pub violation_count: u32,
    pub max_violations: u32,
    pub warning_visible: bool,
    /// Focus monitoring is armed; the client should report signals.
    pub proctoring: bool,
    pub countdown_running: bool,
    pub remaining_secs: u64,
    pub camera: CameraStatus,
    pub notices: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

pub fn greeting(track: Track) -> String {
    format!(
        "Hello! I'm your AI Interviewer. I see you're applying for the **{}** role. \n\nLet's start. Tell me a little about yourself and your experience with this tech stack.",
        track.id().to_uppercase()
    )
}

/// One interview attempt: `NotStarted -> Active -> Terminated | Completed`.
pub struct InterviewSession {
    id: Uuid,
    track: Track,
    settings: SessionSettings,
    status: SessionStatus,
    transcript: Transcript,
    monitor: ViolationMonitor,
    clock: CountdownClock,
    camera: Camera,
    pending: bool,
    last_error: Option<String>,
    notices: Vec<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl InterviewSession {
    pub fn new(track: Track, settings: SessionSettings, device: Arc<dyn MediaDevice>) -> Self {
        Self {
            id: Uuid::new_v4(),
            track,
            settings,
            status: SessionStatus::NotStarted,
            transcript: Transcript::new(),
            monitor: ViolationMonitor::new(Duration::from_secs(settings.warning_secs)),
            clock: CountdownClock::new(),
            camera: Camera::new(device),
            pending: false,
            last_error: None,
            notices: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn track(&self) -> Track {
        self.track
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn violation_count(&self) -> u32 {
        self.monitor.count()
    }

    pub fn remaining_secs(&self) -> u64 {
        self.clock.remaining()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn camera_status(&self) -> &CameraStatus {
        self.camera.status()
    }

    /// Single gate for user input.
    pub fn can_accept_input(&self) -> bool {
        self.status == SessionStatus::Active && !self.pending
    }

    /// Candidate consented to proctoring.
    pub fn start(&mut self) -> Result<(), InterviewError> {
        if self.status != SessionStatus::NotStarted {
            return Err(InterviewError::InvalidTransition(format!(
                "Session cannot start from state '{}'",
                self.status.label()
            )));
        }

        self.status = SessionStatus::Active;
        self.started_at = Some(Utc::now());
        self.monitor.arm(self.settings.max_violations);
        self.clock.start(self.settings.duration_secs);
        self.camera.activate();
        self.transcript.push(Turn::interviewer(greeting(self.track)))?;

        info!(
            "Session {} started ({}, {}s, {} violations allowed)",
            self.id, self.track, self.settings.duration_secs, self.settings.max_violations
        );
        Ok(())
    }

    /// Record the answer and build the gateway request for it.
    pub fn begin_answer(&mut self, text: &str) -> Result<GatewayRequest, InterviewError> {
        if self.status != SessionStatus::Active {
            return Err(InterviewError::InvalidTransition(format!(
                "Session is not accepting answers ({})",
                self.status.label()
            )));
        }
        if self.pending {
            return Err(InterviewError::SubmissionPending);
        }
        if text.trim().is_empty() {
            return Err(InterviewError::InvalidRequest(
                "Answer must not be empty".to_string(),
            ));
        }
        if text.len() > MAX_ANSWER_CHARS {
            return Err(InterviewError::InvalidRequest(format!(
                "Answer too long ({} chars, max {})",
                text.len(),
                MAX_ANSWER_CHARS
            )));
        }

        self.transcript.push(Turn::candidate(text))?;
        self.pending = true;
        self.last_error = None;

        Ok(GatewayRequest::chat(
            self.transcript.to_messages(),
            self.track.id(),
        ))
    }

    pub fn finish_answer(&mut self, result: Result<String, InterviewError>) -> AnswerOutcome {
        self.pending = false;

        if self.status != SessionStatus::Active {
            debug!("Session {} dropped reply after leaving Active", self.id);
            return AnswerOutcome::Discarded;
        }

        match result {
            Ok(reply) => match self.transcript.push(Turn::interviewer(reply)) {
                Ok(()) => AnswerOutcome::Replied,
                Err(_) => AnswerOutcome::Discarded,
            },
            Err(e) => {
                let message = e.to_string();
                self.last_error = Some(message.clone());
                AnswerOutcome::Failed(message)
            }
        }
    }

    pub fn record_signal(&mut self, signal: ProctorSignal, detail: Option<&str>) -> SignalOutcome {
        self.record_signal_at(signal, detail, Instant::now())
    }

    pub fn record_signal_at(
        &mut self,
        signal: ProctorSignal,
        detail: Option<&str>,
        now: Instant,
    ) -> SignalOutcome {
        if signal == ProctorSignal::ListenerError {
            let notice = format!(
                "Focus monitoring unavailable: {}",
                detail.unwrap_or("listener registration failed")
            );
            warn!("Session {}: {}", self.id, notice);
            self.notices.push(notice);
            return SignalOutcome::MonitoringUnavailable;
        }
        if !signal.is_violation() || self.status != SessionStatus::Active {
            return SignalOutcome::Ignored;
        }

        let outcome = self.monitor.record_violation(now);
        match outcome {
            ViolationOutcome::Exceeded { count } => {
                warn!(
                    "Session {} terminated after {} violations",
                    self.id, count
                );
                self.finish(SessionStatus::Terminated(TerminationReason::Malpractice));
            }
            ViolationOutcome::Recorded { count } => {
                info!(
                    "Session {} violation {}/{} ({:?})",
                    self.id,
                    count,
                    self.monitor.max_violations(),
                    signal
                );
            }
            ViolationOutcome::Ignored => {}
        }
        SignalOutcome::Violation(outcome)
    }

    /// One-second tick from the session timer.
    pub fn tick(&mut self) -> Tick {
        if self.status != SessionStatus::Active {
            return Tick::Idle;
        }
        let tick = self.clock.tick();
        if tick == Tick::Expired {
            info!("Session {} time expired", self.id);
            self.finish(SessionStatus::Completed(CompletionReason::TimeExpired));
        }
        tick
    }

    /// Candidate ends the interview. A no-op once terminal.
    pub fn end_by_user(&mut self) -> Result<SessionStatus, InterviewError> {
        match self.status {
            SessionStatus::Active => {
                info!("Session {} ended by candidate", self.id);
                self.finish(SessionStatus::Completed(CompletionReason::UserEnded));
                Ok(self.status)
            }
            status if status.is_terminal() => Ok(status),
            _ => Err(InterviewError::InvalidTransition(
                "Interview has not started".to_string(),
            )),
        }
    }

    /// Client reported that camera capture is denied or unavailable.
    pub fn camera_blocked(&mut self, reason: &str) {
        if self.status == SessionStatus::Active {
            self.camera.mark_blocked(reason);
        }
    }

    /// Leaving the session view. An Active session ends as if the candidate
    /// ended it, so input is never accepted without proctoring. Idempotent.
    pub fn teardown(&mut self) {
        if self.status == SessionStatus::Active {
            info!("Session {} left while active", self.id);
            self.finish(SessionStatus::Completed(CompletionReason::UserEnded));
        } else {
            self.release();
        }
    }

    /// Disarm monitoring, stop the clock and release the camera.
    fn release(&mut self) {
        self.monitor.disarm();
        self.clock.cancel();
        self.camera.deactivate();
    }

    fn finish(&mut self, status: SessionStatus) {
        self.status = status;
        self.ended_at = Some(Utc::now());
        self.transcript.freeze();
        self.release();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_at(Instant::now())
    }

    pub fn snapshot_at(&self, now: Instant) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            track: self.track,
            track_label: self.track.label(),
            status: self.status,
            status_label: self.status.label(),
            transcript: self.transcript.turns().to_vec(),
            answers: self.transcript.answers(),
            accepting_input: self.can_accept_input(),
            pending: self.pending,
            last_error: self.last_error.clone(),
            violation_count: self.monitor.count(),
            max_violations: self.settings.max_violations,
            warning_visible: self.status == SessionStatus::Active
                && self.monitor.warning_visible(now),
            proctoring: self.monitor.is_armed(),
            countdown_running: self.clock.is_running(),
            remaining_secs: self.clock.remaining(),
            camera: self.camera.status().clone(),
            notices: self.notices.clone(),
            created_at: self.created_at,
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }
}
