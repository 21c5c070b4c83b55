//! # Resume Tools API
//!
//! HTTP API behind a resume-writing site's AI career tools (resume analysis,
//! skill-gap analysis, cover letters), featuring:
//!
//! - **Request Gate**: origin, user-agent, size and CSRF-provenance checks with
//!   repeat-offender blocking
//! - **Per-route Rate Limits**: hourly budgets per client and route
//! - **AI Client**: a hosted text-generation API behind a trait
//! - **Observability**: request IDs, structured logging, Prometheus metrics
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Request ID → Trace → Body Limit → Gate)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (health, tools)                                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Services (RouteRateLimiter, learning resources)            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TextGenerator (GeminiClient)                               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resume_tools_api::{AppState, Config, build_router};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let state = AppState::new(config)?;
//!     let app = build_router(state.clone());
//!
//!     // Start the server...
//!     state.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod ai_client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod security;
pub mod services;
pub mod state;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use ai_client::{AiError, GeminiClient, TextGenerator};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use routes::build_router;
pub use security::{RequestGate, SecurityConfig};
pub use state::AppState;
