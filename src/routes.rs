//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← Sets/propagates X-Request-Id
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response spans
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │  Body Limit      │ ← Transport cap (TRANSPORT_BODY_LIMIT)
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │  Request Gate    │ ← /api only: 403 on violation, CORS + CSP headers
//! └────────┬─────────┘
//!          ▼
//!      Handler       ← validation → route rate limit (429) → AI call
//! ```
//!
//! # Route Groups
//!
//! - `/health`, `/ready` - Monitoring (outside the gate)
//! - `/security/metrics` - Gate diagnostics, only when `SECURITY_METRICS_ENABLED`
//! - `/api/*` - Career tools (behind the gate)

use axum::Router;
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::middleware::GateLayer;
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let api = Router::new()
        .route(
            "/resume-analysis",
            post(handlers::resume_analysis).options(handlers::preflight),
        )
        .route(
            "/skill-gap",
            post(handlers::skill_gap).options(handlers::preflight),
        )
        .route(
            "/cover-letter",
            post(handlers::cover_letter).options(handlers::preflight),
        )
        .route(
            "/learning-resources",
            get(handlers::learning_resources).options(handlers::preflight),
        )
        .layer(GateLayer::new(state.gate.clone()));

    info!(
        allowed_origins = ?config.cors_allowed_origins,
        max_body_size = config.max_body_size,
        require_csrf = config.require_csrf,
        block_threshold = config.block_threshold,
        "Request gate configured"
    );
    info!(
        transport_body_limit = config.transport_body_limit,
        "Request body size limit configured"
    );

    let mut router = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check));

    if config.security_metrics_enabled {
        router = router.route("/security/metrics", get(handlers::security_metrics));
    } else {
        info!("Security metrics endpoint disabled (SECURITY_METRICS_ENABLED=false)");
    }

    router
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(config.transport_body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                        let request_id = req
                            .headers()
                            .get("x-request-id")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("-");
                        tracing::info_span!(
                            "http_request",
                            method = %req.method(),
                            uri = %req.uri(),
                            request_id
                        )
                    }),
                )
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}
