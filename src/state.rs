use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use crate::config::InterviewConfig;
use crate::driver::{LiveSession, SessionRegistry};
use crate::error::InterviewError;
use crate::gateway::{GroqBackend, HttpGateway, LocalGateway, SharedGateway};
use crate::history::AttemptStore;
use crate::log_capture::EventLog;
use crate::proctor::{ClientCamera, MediaDevice};
use crate::report::ReportGenerator;
use crate::session::{InterviewSession, SessionSettings};
use crate::track::Track;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: InterviewConfig,
    pub sessions: SessionRegistry,
    /// Serves `/api/interview`; always in-process.
    pub endpoint: Arc<LocalGateway>,
    /// Used by sessions and reports; remote when `--gateway-url` is set.
    pub gateway: SharedGateway,
    pub reports: ReportGenerator,
    pub store: Arc<AttemptStore>,
    pub logs: EventLog,
    pub camera: Arc<dyn MediaDevice>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: InterviewConfig) -> Result<Self, InterviewError> {
        let backend = Arc::new(GroqBackend::new(config.completions_url()));
        let endpoint = Arc::new(LocalGateway::new(
            backend,
            config.model.clone(),
            config.api_key.clone(),
        ));

        let gateway: SharedGateway = match config.gateway_url.as_deref() {
            Some(url) => {
                let remote = HttpGateway::new(url)?;
                info!("Session traffic goes to remote gateway {}", remote.endpoint());
                Arc::new(remote)
            }
            None => endpoint.clone() as SharedGateway,
        };

        Ok(Self::from_parts(config, endpoint, gateway))
    }

    pub fn from_parts(
        config: InterviewConfig,
        endpoint: Arc<LocalGateway>,
        gateway: SharedGateway,
    ) -> Self {
        let store = Arc::new(AttemptStore::new(&config.data_dir));
        let reports = ReportGenerator::new(gateway.clone(), store.clone());

        Self {
            config,
            sessions: SessionRegistry::new(),
            endpoint,
            gateway,
            reports,
            store,
            logs: EventLog::new(),
            camera: Arc::new(ClientCamera),
            started_at: Utc::now(),
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings::from(&self.config)
    }

    /// Create a NotStarted session and register it.
    pub async fn open_session(&self, track: Track) -> Arc<LiveSession> {
        let session = InterviewSession::new(track, self.session_settings(), self.camera.clone());
        let live = LiveSession::new(session, self.logs.clone());
        self.sessions.insert(live.clone()).await;
        live
    }
}
