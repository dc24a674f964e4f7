use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use proctored_interview::config::{CliArgs, InterviewConfig, API_KEY_ENV};
use proctored_interview::log_capture::{LogLevel, LogSource};
use proctored_interview::server;
use proctored_interview::state::{AppState, SharedState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    // Held for the life of the process so buffered file logs get flushed.
    let _log_guard = init_tracing(args.log_file.as_deref())?;

    info!("Starting proctored-interview v{}", env!("CARGO_PKG_VERSION"));

    let config = InterviewConfig::from_args(args);
    info!("Data dir: {:?}", config.data_dir);
    info!("Model: {}", config.model);
    if !config.has_credentials() {
        warn!(
            "{} is not set; gateway calls will fail with a configuration error",
            API_KEY_ENV
        );
    }

    let bind_addr = config.bind_addr();
    let state: SharedState = Arc::new(AppState::new(config)?);

    state
        .logs
        .emit(
            LogSource::Server,
            LogLevel::Info,
            format!("Interview server starting on {}", bind_addr),
        )
        .await;

    let router = server::build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await?;

    info!("Shutting down, releasing {} live sessions", state.sessions.len().await);
    state.sessions.teardown_all().await;

    Ok(())
}

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "proctored_interview=info,tower_http=info".into());
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());

    let Some(path) = log_file else {
        registry.init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Invalid log file path: {:?}", path))?;
    std::fs::create_dir_all(dir)?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    registry
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .init();
    Ok(Some(guard))
}

async fn shutdown_signal(state: SharedState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }

    info!("Received shutdown signal");
    state
        .logs
        .emit(
            LogSource::Server,
            LogLevel::Info,
            "Shutdown signal received",
        )
        .await;
}
