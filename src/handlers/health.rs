//! Health, readiness, and security diagnostics endpoints.
//!
//! # Endpoints
//!
//! - `GET /health` - Liveness with AI configuration status
//! - `GET /ready` - Readiness probe, 503 while no AI key is configured
//! - `GET /security/metrics` - Request gate snapshot over the retention window
//!
//! # Health vs Readiness
//!
//! - **Health** (`/health`): Returns 200 even if degraded, includes details
//! - **Readiness** (`/ready`): Returns 503 if the tool routes cannot succeed

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use tracing::instrument;

use crate::models::HealthResponse;
use crate::security::SecurityMetrics;
use crate::state::AppState;

/// Health check endpoint.
///
/// # Response Body
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "aiConfigured": true,
///   "uptimeSeconds": 3600,
///   "timestamp": "2024-01-15T10:30:00Z"
/// }
/// ```
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ai_configured = state.ai.is_configured();

    Json(HealthResponse {
        status: if ai_configured { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        ai_configured,
        uptime_seconds: state.uptime().as_secs(),
        timestamp: Utc::now(),
    })
}

/// Readiness check endpoint for Kubernetes probes.
///
/// ```yaml
/// readinessProbe:
///   httpGet:
///     path: /ready
///     port: 3000
/// ```
#[instrument(skip(state))]
pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    if state.ai.is_configured() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Read-only view of gate activity. Never influences allow/deny decisions.
#[instrument(skip(state))]
pub async fn security_metrics(State(state): State<AppState>) -> Json<SecurityMetrics> {
    Json(state.gate.security_metrics())
}
