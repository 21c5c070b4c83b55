use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use resume_tools_api::config::LogFormat;
use resume_tools_api::{AppState, Config, build_router, metrics, utils};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::from_env();

    // Logging comes up first so configuration errors are reported through it
    match &config {
        Ok(config) => init_tracing(&config.log_level, config.log_format),
        Err(_) => init_tracing("info", LogFormat::Pretty),
    }

    info!("Starting Resume Tools API v{}", env!("CARGO_PKG_VERSION"));

    match run(config).await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Json => builder.json().with_current_span(true).init(),
        LogFormat::Pretty => builder.with_thread_ids(true).init(),
    }
}

/// Run the application, returning an exit code on error.
async fn run(config: resume_tools_api::AppResult<Config>) -> Result<(), exitcode::ExitCode> {
    let config = config.map_err(|e| {
        error!("Configuration error: {e}");
        exitcode::CONFIG
    })?;
    info!(
        host = %config.host,
        port = %config.port,
        environment = %config.environment,
        ai_model = %config.ai_model,
        "Configuration loaded"
    );

    if !config.ai_configured() {
        warn!("GEMINI_API_KEY is not set; tool routes will answer 503 CONFIG_ERROR");
    }

    if let Some(metrics_addr) = config.metrics_addr() {
        metrics::try_init_metrics(metrics_addr);
    } else {
        info!("Prometheus metrics disabled (METRICS_PORT=0)");
    }

    let state = AppState::new(config.clone()).map_err(|e| {
        error!("Failed to build application state: {e}");
        exitcode::CONFIG
    })?;
    let app = build_router(state.clone());

    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("API endpoints:");
    info!("  GET  /health                  - Health check");
    info!("  GET  /ready                   - Readiness check");
    info!("  GET  /security/metrics        - Request gate snapshot");
    info!("  POST /api/resume-analysis     - Resume analysis");
    info!("  POST /api/skill-gap           - Skill gap analysis");
    info!("  POST /api/cover-letter        - Cover letter generation");
    info!("  GET  /api/learning-resources  - Learning resources for a skill");

    // Peer addresses feed client address resolution
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(utils::shutdown_signal())
    .await
    .map_err(|e| {
        error!("Server error: {e}");
        exitcode::SOFTWARE
    })?;

    info!("HTTP server stopped, shutting down background tasks...");
    state.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}
