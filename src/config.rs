use clap::Parser;
use std::path::PathBuf;

/// Proctored Interview: LLM-backed mock interviews with focus-loss proctoring.
#[derive(Parser, Debug, Clone)]
#[command(name = "proctored-interview")]
pub struct CliArgs {
    /// HTTP port for the gateway and session API
    #[arg(long = "port", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Interface to bind
    #[arg(long = "host", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Directory holding the persisted attempt history
    #[arg(long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(short = 'l', long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Completion model id
    #[arg(long = "model", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of the OpenAI-compatible completion API
    #[arg(long = "api-base", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Send session traffic to a remote /api/interview endpoint instead of
    /// calling the model in-process
    #[arg(long = "gateway-url")]
    pub gateway_url: Option<String>,

    /// Interview length in seconds
    #[arg(long = "session-duration-secs", default_value_t = SESSION_DURATION_SECS)]
    pub session_duration_secs: u64,

    /// Focus-loss violations that terminate a session
    #[arg(long = "max-violations", default_value_t = MAX_VIOLATIONS)]
    pub max_violations: u32,
}

#[derive(Debug, Clone)]
pub struct InterviewConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub log_file: Option<PathBuf>,
    pub model: String,
    pub api_base: String,
    pub api_key: Option<String>,
    pub gateway_url: Option<String>,
    pub session_duration_secs: u64,
    pub max_violations: u32,
}

// Server constants
pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const API_KEY_ENV: &str = "GROQ_API_KEY";
pub const DATA_DIR_NAME: &str = "proctored-interview";

// Completion backend constants
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const GATEWAY_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_ROLE_CONTEXT: &str = "General Software Engineer";
pub const EMPTY_REPLY_FALLBACK: &str = "Consider this a pass. Let's move on.";

// Sampling: (temperature, max_tokens)
pub const CHAT_TEMPERATURE: f32 = 0.7;
pub const CHAT_MAX_TOKENS: u32 = 1024;
pub const REPORT_TEMPERATURE: f32 = 0.2;
pub const REPORT_MAX_TOKENS: u32 = 2048;

// Session constants
pub const SESSION_DURATION_SECS: u64 = 1800; // 30 minutes
pub const MAX_VIOLATIONS: u32 = 3;
pub const WARNING_VISIBLE_SECS: u64 = 3;
pub const TIMER_TICK_MILLIS: u64 = 1000;
pub const MAX_ANSWER_CHARS: usize = 20_000;

// Report constants
pub const MAX_SCORE: f64 = 10.0;

// Persistence constants
pub const HISTORY_STORAGE_KEY: &str = "interview_history";

// Log constants
pub const LOG_BUFFER_SIZE: usize = 500;

impl InterviewConfig {
    pub fn from_args(args: CliArgs) -> Self {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty());

        let data_dir = args.data_dir.unwrap_or_else(default_data_dir);

        InterviewConfig {
            host: args.host,
            port: args.port,
            data_dir,
            log_file: args.log_file,
            model: args.model,
            api_base: args.api_base,
            api_key,
            gateway_url: args.gateway_url,
            session_duration_secs: args.session_duration_secs,
            max_violations: args.max_violations,
        }
    }

    /// Address the HTTP server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether completion credentials are available.
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    /// Endpoint of the OpenAI-compatible chat completions API.
    pub fn completions_url(&self) -> String {
        if self.api_base.ends_with('/') {
            format!("{}chat/completions", self.api_base)
        } else {
            format!("{}/chat/completions", self.api_base)
        }
    }
}

/// Platform-local data directory, falling back to the working directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}
