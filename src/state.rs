//! Shared application state for Axum handlers.
//!
//! Holds the request gate, the route rate limiter and the AI client behind
//! `Arc`s so each handler gets a cheap clone.
//!
//! # Structured Concurrency
//!
//! The security cleanup task is tracked with `tokio_util::task::TaskTracker`
//! and stopped through a `CancellationToken`. Call `shutdown()` before exit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::ai_client::{GeminiClient, TextGenerator};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::security::{RequestGate, SecurityConfig};
use crate::services::{GovernorRouteLimiter, RouteRateLimiter};

/// Shared application state for Axum handlers.
///
/// # Lifecycle
///
/// ```rust,ignore
/// let state = AppState::new(config)?;
/// // ... serve ...
/// state.shutdown().await;
/// ```
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gate: Arc<RequestGate>,
    pub limiter: Arc<dyn RouteRateLimiter>,
    pub ai: Arc<dyn TextGenerator>,
    pub started_at: Instant,
    task_tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl AppState {
    /// Build production state from configuration.
    ///
    /// Must be called inside a Tokio runtime; spawns the cleanup task.
    pub fn new(config: Config) -> AppResult<Self> {
        let gate = RequestGate::in_memory(
            SecurityConfig::from_config(&config),
            config.violation_log_capacity,
        );
        let limiter = GovernorRouteLimiter::from_config(&config)
            .map_err(|e| AppError::Config(e.to_string()))?;
        let ai = GeminiClient::from_config(&config)
            .map_err(|e| AppError::Config(format!("Failed to build AI client: {e}")))?;

        Ok(Self::with_components(
            config,
            Arc::new(gate),
            limiter.into_shared(),
            Arc::new(ai),
        ))
    }

    /// Assemble state from explicit collaborators.
    pub fn with_components(
        config: Config,
        gate: Arc<RequestGate>,
        limiter: Arc<dyn RouteRateLimiter>,
        ai: Arc<dyn TextGenerator>,
    ) -> Self {
        let state = Self {
            config: Arc::new(config),
            gate,
            limiter,
            ai,
            started_at: Instant::now(),
            task_tracker: TaskTracker::new(),
            cancellation_token: CancellationToken::new(),
        };

        state.spawn_cleanup_task();
        state
    }

    /// Periodically evict expired suspicion records, logged violations and
    /// idle rate limiter keys.
    fn spawn_cleanup_task(&self) {
        let gate = self.gate.clone();
        let limiter = self.limiter.clone();
        let period = self.config.security_cleanup_interval;
        let cancel = self.cancellation_token.clone();

        self.task_tracker.spawn(async move {
            let mut ticker = interval(period);
            ticker.tick().await; // Skip the first immediate tick

            loop {
                tokio::select! {
                    biased;

                    () = cancel.cancelled() => {
                        debug!("Security cleanup task received cancellation signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let stats = gate.cleanup(Utc::now());
                        limiter.housekeeping();
                        debug!(
                            suspicion_records = stats.suspicion_records,
                            logged_violations = stats.logged_violations,
                            "Security cleanup pass complete"
                        );
                    }
                }
            }

            debug!("Security cleanup task shutting down");
        });
    }

    /// Stop background tasks and wait for them to finish.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown of background tasks");
        self.cancellation_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;
        info!("All background tasks have completed");
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
