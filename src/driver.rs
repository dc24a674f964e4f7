use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::TIMER_TICK_MILLIS;
use crate::error::InterviewError;
use crate::gateway::InterviewGateway;
use crate::log_capture::{EventLog, LogLevel, LogSource};
use crate::proctor::{ProctorSignal, ViolationOutcome};
use crate::report::{Report, ReportGenerator};
use crate::session::{AnswerOutcome, InterviewSession, SessionSnapshot, SignalOutcome};
use crate::timer::{SessionTimer, Tick};

/// A session plus the async machinery around it: timer task, snapshot
/// channel, cached report. Every mutation serializes on `session`.
pub struct LiveSession {
    id: Uuid,
    session: Mutex<InterviewSession>,
    timer: std::sync::Mutex<Option<SessionTimer>>,
    report: Mutex<Option<Report>>,
    updates: watch::Sender<SessionSnapshot>,
    logs: EventLog,
    tick_period: Duration,
}

impl LiveSession {
    pub fn new(session: InterviewSession, logs: EventLog) -> Arc<Self> {
        Self::with_tick_period(session, logs, Duration::from_millis(TIMER_TICK_MILLIS))
    }

    pub fn with_tick_period(
        session: InterviewSession,
        logs: EventLog,
        tick_period: Duration,
    ) -> Arc<Self> {
        let (updates, _) = watch::channel(session.snapshot());
        Arc::new(Self {
            id: session.id(),
            session: Mutex::new(session),
            timer: std::sync::Mutex::new(None),
            report: Mutex::new(None),
            updates,
            logs,
            tick_period,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    fn publish(&self, session: &InterviewSession) -> SessionSnapshot {
        let snapshot = session.snapshot();
        self.updates.send_replace(snapshot.clone());
        snapshot
    }

    fn cancel_timer(&self) {
        if let Ok(mut slot) = self.timer.lock() {
            if let Some(mut timer) = slot.take() {
                timer.cancel();
            }
        }
    }

    pub fn timer_running(&self) -> bool {
        self.timer
            .lock()
            .map(|slot| slot.as_ref().is_some_and(SessionTimer::is_running))
            .unwrap_or(false)
    }

    async fn log(&self, source: LogSource, level: LogLevel, message: impl Into<String>) {
        self.logs.emit_for(self.id, source, level, message).await;
    }

    /// Consent given: activate proctoring and start the countdown.
    pub async fn start(self: &Arc<Self>) -> Result<SessionSnapshot, InterviewError> {
        let (snapshot, track) = {
            let mut session = self.session.lock().await;
            session.start()?;

            let weak = Arc::downgrade(self);
            let timer = SessionTimer::spawn(self.tick_period, move || {
                let weak = weak.clone();
                async move {
                    match weak.upgrade() {
                        Some(live) => live.on_tick().await,
                        None => ControlFlow::Break(()),
                    }
                }
            });
            if let Ok(mut slot) = self.timer.lock() {
                *slot = Some(timer);
            }

            (self.publish(&session), session.track())
        };

        self.log(
            LogSource::Session,
            LogLevel::Info,
            format!("Interview started ({} track)", track),
        )
        .await;
        Ok(snapshot)
    }

    async fn on_tick(&self) -> ControlFlow<()> {
        let tick = {
            let mut session = self.session.lock().await;
            let tick = session.tick();
            self.publish(&session);
            tick
        };

        match tick {
            Tick::Running { .. } => ControlFlow::Continue(()),
            Tick::Expired => {
                self.log(
                    LogSource::Timer,
                    LogLevel::Warn,
                    "Time expired, interview completed",
                )
                .await;
                ControlFlow::Break(())
            }
            Tick::Idle => ControlFlow::Break(()),
        }
    }

    /// Record an answer and wait for the interviewer's reply. The session
    /// lock is released during the gateway call; the pending flag keeps a
    /// second submission out.
    pub async fn submit_answer(
        &self,
        gateway: &dyn InterviewGateway,
        text: &str,
    ) -> Result<SessionSnapshot, InterviewError> {
        let request = {
            let mut session = self.session.lock().await;
            let request = session.begin_answer(text)?;
            self.publish(&session);
            request
        };

        let result = gateway.reply(request).await;
        let fatal = result
            .as_ref()
            .err()
            .filter(|e| !e.is_recoverable())
            .cloned();

        let (outcome, snapshot) = {
            let mut session = self.session.lock().await;
            let outcome = session.finish_answer(result);
            (outcome, self.publish(&session))
        };

        match outcome {
            AnswerOutcome::Replied => {}
            AnswerOutcome::Discarded => {
                info!("Session {} reply discarded after session ended", self.id);
            }
            AnswerOutcome::Failed(message) => {
                warn!("Session {} gateway call failed: {}", self.id, message);
                self.log(LogSource::Gateway, LogLevel::Error, message).await;
                if let Some(e) = fatal {
                    return Err(e);
                }
            }
        }
        Ok(snapshot)
    }

    pub async fn record_signal(
        &self,
        signal: ProctorSignal,
        detail: Option<&str>,
    ) -> SessionSnapshot {
        let (outcome, snapshot) = {
            let mut session = self.session.lock().await;
            let outcome = session.record_signal(signal, detail);
            (outcome, self.publish(&session))
        };

        match outcome {
            SignalOutcome::Violation(ViolationOutcome::Exceeded { count }) => {
                self.cancel_timer();
                self.log(
                    LogSource::Proctor,
                    LogLevel::Error,
                    format!("Session terminated: malpractice ({} violations)", count),
                )
                .await;
            }
            SignalOutcome::Violation(ViolationOutcome::Recorded { count }) => {
                self.log(
                    LogSource::Proctor,
                    LogLevel::Warn,
                    format!(
                        "Focus lost ({:?}), violation {}/{}",
                        signal, count, snapshot.max_violations
                    ),
                )
                .await;
            }
            SignalOutcome::MonitoringUnavailable => {
                self.log(
                    LogSource::Proctor,
                    LogLevel::Warn,
                    "Focus monitoring unavailable on client",
                )
                .await;
            }
            SignalOutcome::Violation(ViolationOutcome::Ignored) | SignalOutcome::Ignored => {}
        }
        snapshot
    }

    pub async fn camera_report(&self, granted: bool, detail: Option<&str>) -> SessionSnapshot {
        let snapshot = {
            let mut session = self.session.lock().await;
            if !granted {
                session.camera_blocked(detail.unwrap_or("Camera permission denied"));
            }
            self.publish(&session)
        };
        if !granted {
            self.log(
                LogSource::Proctor,
                LogLevel::Warn,
                "Camera blocked; focus monitoring continues",
            )
            .await;
        }
        snapshot
    }

    pub async fn end(&self) -> Result<SessionSnapshot, InterviewError> {
        let snapshot = {
            let mut session = self.session.lock().await;
            session.end_by_user()?;
            self.publish(&session)
        };
        self.cancel_timer();
        self.log(
            LogSource::Session,
            LogLevel::Info,
            format!("Interview ended ({})", snapshot.status_label),
        )
        .await;
        Ok(snapshot)
    }

    /// Leaving the session view. Idempotent.
    pub async fn teardown(&self) {
        {
            let mut session = self.session.lock().await;
            session.teardown();
            self.publish(&session);
        }
        self.cancel_timer();
    }

    /// Generate the report once; later calls return the same report.
    pub async fn generate_report(
        &self,
        generator: &ReportGenerator,
    ) -> Result<Report, InterviewError> {
        let mut cached = self.report.lock().await;
        if let Some(report) = cached.as_ref() {
            return Ok(report.clone());
        }

        let (transcript, track, status) = {
            let session = self.session.lock().await;
            (
                session.transcript().clone(),
                session.track(),
                session.status(),
            )
        };

        match generator.generate(&transcript, track, status).await {
            Ok(report) => {
                self.log(
                    LogSource::Report,
                    LogLevel::Info,
                    format!("Report generated (overall {}/10)", report.overall_score),
                )
                .await;
                *cached = Some(report.clone());
                Ok(report)
            }
            Err(e) => {
                self.log(LogSource::Report, LogLevel::Error, e.to_string())
                    .await;
                Err(e)
            }
        }
    }

    pub async fn cached_report(&self) -> Option<Report> {
        self.report.lock().await.clone()
    }
}

/// Live sessions, in memory only.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<LiveSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, live: Arc<LiveSession>) {
        self.sessions.write().await.insert(live.id(), live);
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<LiveSession>, InterviewError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| InterviewError::SessionNotFound(id.to_string()))
    }

    /// Remove and tear down.
    pub async fn remove(&self, id: Uuid) -> Result<(), InterviewError> {
        let live = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| InterviewError::SessionNotFound(id.to_string()))?;
        live.teardown().await;
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn teardown_all(&self) {
        let drained: Vec<Arc<LiveSession>> = self
            .sessions
            .write()
            .await
            .drain()
            .map(|(_, live)| live)
            .collect();
        for live in drained {
            live.teardown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayRequest;
    use crate::history::AttemptStore;
    use crate::proctor::ClientCamera;
    use crate::session::{CompletionReason, SessionSettings, SessionStatus, TerminationReason};
    use crate::track::Track;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SAMPLE_REPORT: &str = r#"{"overallScore":7,"skillBreakdown":[],"strengths":["clarity"],"weaknesses":[],"improvementPlan":"more depth"}"#;

    struct ScriptedGateway {
        replies: std::sync::Mutex<VecDeque<Result<String, InterviewError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedGateway {
        fn new(replies: Vec<Result<String, InterviewError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: std::sync::Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl InterviewGateway for ScriptedGateway {
        async fn reply(&self, _request: GatewayRequest) -> Result<String, InterviewError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("Next question.".to_string()))
        }
    }

    fn live_session(settings: SessionSettings) -> Arc<LiveSession> {
        let session = InterviewSession::new(Track::Backend, settings, Arc::new(ClientCamera));
        LiveSession::new(session, EventLog::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_expiry_completes_session() {
        let live = live_session(SessionSettings {
            duration_secs: 3,
            ..SessionSettings::default()
        });
        live.start().await.unwrap();

        tokio::time::sleep(Duration::from_secs(4)).await;

        let snapshot = live.snapshot().await;
        assert_eq!(
            snapshot.status,
            SessionStatus::Completed(CompletionReason::TimeExpired)
        );
        assert_eq!(snapshot.remaining_secs, 0);
        assert!(!snapshot.accepting_input);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_counts_down_while_active() {
        let live = live_session(SessionSettings::default());
        live.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(live.snapshot().await.remaining_secs, 1798);
        assert!(live.timer_running());
    }

    #[tokio::test]
    async fn test_violations_terminate_and_cancel_timer() {
        let live = live_session(SessionSettings::default());
        live.start().await.unwrap();

        for _ in 0..3 {
            live.record_signal(ProctorSignal::WindowBlur, None).await;
        }

        let snapshot = live.snapshot().await;
        assert_eq!(
            snapshot.status,
            SessionStatus::Terminated(TerminationReason::Malpractice)
        );
        assert!(!live.timer_running());

        let gateway = ScriptedGateway::new(vec![]);
        let err = live
            .submit_answer(gateway.as_ref(), "still here")
            .await
            .unwrap_err();
        assert!(matches!(err, InterviewError::InvalidTransition(_)));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_answer_appends_reply() {
        let live = live_session(SessionSettings::default());
        live.start().await.unwrap();
        let gateway = ScriptedGateway::new(vec![Ok("Why Rust?".to_string())]);

        let snapshot = live
            .submit_answer(gateway.as_ref(), "I build services in Rust")
            .await
            .unwrap();

        assert_eq!(snapshot.transcript.len(), 3);
        assert_eq!(snapshot.transcript[2].text, "Why Rust?");
        assert!(snapshot.accepting_input);
        assert!(snapshot.last_error.is_none());
    }

    #[tokio::test]
    async fn test_gateway_failure_keeps_answer() {
        let live = live_session(SessionSettings::default());
        live.start().await.unwrap();
        let gateway = ScriptedGateway::new(vec![Err(InterviewError::Gateway(
            "API Error: 503".to_string(),
        ))]);

        let snapshot = live
            .submit_answer(gateway.as_ref(), "my answer")
            .await
            .unwrap();

        assert_eq!(snapshot.transcript.len(), 2);
        assert!(snapshot.accepting_input);
        assert!(snapshot.last_error.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_missing_credentials_surface_as_configuration_error() {
        let live = live_session(SessionSettings::default());
        live.start().await.unwrap();
        let gateway = ScriptedGateway::new(vec![Err(InterviewError::Configuration(
            "Missing API Key".to_string(),
        ))]);

        let err = live
            .submit_answer(gateway.as_ref(), "hello")
            .await
            .unwrap_err();
        match err {
            InterviewError::Configuration(message) => assert_eq!(message, "Missing API Key"),
            other => panic!("expected Configuration, got {:?}", other),
        }
        assert!(live.snapshot().await.last_error.is_some());
    }

    #[tokio::test]
    async fn test_report_is_generated_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(AttemptStore::new(dir.path()));
        let gateway = ScriptedGateway::new(vec![Ok(SAMPLE_REPORT.to_string())]);
        let generator = ReportGenerator::new(gateway.clone(), store.clone());

        let live = live_session(SessionSettings::default());
        live.start().await.unwrap();
        live.end().await.unwrap();

        let first = live.generate_report(&generator).await.unwrap();
        let second = live.generate_report(&generator).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.list().len(), 1);
        assert_eq!(live.cached_report().await, Some(first));
    }

    #[tokio::test]
    async fn test_report_before_end_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = ScriptedGateway::new(vec![]);
        let generator =
            ReportGenerator::new(gateway.clone(), Arc::new(AttemptStore::new(dir.path())));

        let live = live_session(SessionSettings::default());
        live.start().await.unwrap();

        let err = live.generate_report(&generator).await.unwrap_err();
        assert!(matches!(err, InterviewError::InvalidTransition(_)));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let live = live_session(SessionSettings::default());
        let mut rx = live.subscribe();
        assert_eq!(rx.borrow().status, SessionStatus::NotStarted);

        live.start().await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn test_teardown_while_active_closes_input() {
        let live = live_session(SessionSettings::default());
        live.start().await.unwrap();
        live.teardown().await;

        for _ in 0..5 {
            live.record_signal(ProctorSignal::WindowBlur, None).await;
        }
        let gateway = ScriptedGateway::new(vec![]);
        let err = live
            .submit_answer(gateway.as_ref(), "answer after leaving")
            .await
            .unwrap_err();

        assert!(matches!(err, InterviewError::InvalidTransition(_)));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
        let snapshot = live.snapshot().await;
        assert_eq!(
            snapshot.status,
            SessionStatus::Completed(CompletionReason::UserEnded)
        );
        assert!(!snapshot.accepting_input);
        assert_eq!(snapshot.violation_count, 0);
        assert_eq!(snapshot.transcript.len(), 1);
        assert!(!live.timer_running());
    }

    struct SlowGateway {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl InterviewGateway for SlowGateway {
        async fn reply(&self, _request: GatewayRequest) -> Result<String, InterviewError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok("Tell me about ownership.".to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_submissions_allow_one_in_flight() {
        let live = live_session(SessionSettings::default());
        live.start().await.unwrap();
        let slow = SlowGateway {
            calls: AtomicUsize::new(0),
        };

        let (first, second) = tokio::join!(
            live.submit_answer(&slow, "first answer"),
            live.submit_answer(&slow, "second answer"),
        );

        let pending = [&first, &second]
            .into_iter()
            .filter(|r| matches!(r, Err(InterviewError::SubmissionPending)))
            .count();
        assert_eq!(pending, 1);
        assert!(first.is_ok() || second.is_ok());
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);

        let snapshot = live.snapshot().await;
        assert_eq!(snapshot.transcript.len(), 3);
        assert!(snapshot.accepting_input);
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent() {
        let live = live_session(SessionSettings::default());
        live.start().await.unwrap();

        live.teardown().await;
        live.teardown().await;

        assert!(!live.timer_running());
        assert_eq!(live.snapshot().await.camera, crate::proctor::CameraStatus::Off);
    }

    #[tokio::test]
    async fn test_registry_remove() {
        let registry = SessionRegistry::new();
        let live = live_session(SessionSettings::default());
        let id = live.id();
        registry.insert(live).await;

        assert_eq!(registry.len().await, 1);
        assert!(registry.get(id).await.is_ok());

        registry.remove(id).await.unwrap();
        assert!(registry.is_empty().await);
        assert!(matches!(
            registry.get(id).await,
            Err(InterviewError::SessionNotFound(_))
        ));
        assert!(registry.remove(id).await.is_err());
    }
}
