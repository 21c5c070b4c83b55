//! Per-route, per-client rate limiting for the AI tool routes.
//!
//! # Algorithm
//!
//! Each route policy owns one keyed Governor limiter (GCRA). A budget of `N`
//! requests per window is expressed as a burst of `N` cells, one cell
//! replenished every `window / N`. A fresh client can spend the whole budget
//! at once and then earns requests back steadily.
//!
//! # Decisions
//!
//! Every check returns a [`RateLimitDecision`] carrying enough to build the
//! `X-RateLimit-*` and `Retry-After` headers, whether the request was allowed
//! or not. Routes without a policy are always allowed.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};
use governor::clock::{Clock, DefaultClock};
use governor::middleware::StateInformationMiddleware;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppResult, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET};
use crate::metrics;

pub const RESUME_ANALYSIS: &str = "resume-analysis";
pub const SKILL_GAP: &str = "skill-gap";
pub const COVER_LETTER: &str = "cover-letter";

const HOUR: Duration = Duration::from_secs(3600);

type KeyedLimiter =
    RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock, StateInformationMiddleware>;

/// Error type for rate limiter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    /// A policy's limit was zero.
    ZeroLimit(String),
    /// A policy's window was too short to divide into `limit` cells.
    InvalidWindow(String),
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitError::ZeroLimit(route) => {
                write!(f, "rate limit for route '{route}' must be greater than 0")
            }
            RateLimitError::InvalidWindow(route) => {
                write!(f, "rate limit window for route '{route}' is too short")
            }
        }
    }
}

impl std::error::Error for RateLimitError {}

/// Request budget for one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    pub route: String,
    pub limit: u32,
    pub window: Duration,
}

impl RoutePolicy {
    pub fn per_hour(route: impl Into<String>, limit: u32) -> Self {
        Self {
            route: route.into(),
            limit,
            window: HOUR,
        }
    }

    /// Policies for the career tool routes.
    pub fn from_config(config: &Config) -> Vec<Self> {
        vec![
            Self::per_hour(RESUME_ANALYSIS, config.analysis_rate_limit_per_hour),
            Self::per_hour(SKILL_GAP, config.analysis_rate_limit_per_hour),
            Self::per_hour(COVER_LETTER, config.generation_rate_limit_per_hour),
        ]
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// When the budget is full again (allowed) or the next request will be
    /// accepted (rejected).
    pub reset_time: DateTime<Utc>,
    /// Seconds to wait before retrying; set only on rejection.
    pub retry_after: Option<u64>,
    pub tier: String,
    pub message: Option<String>,
}

impl RateLimitDecision {
    /// Write `X-RateLimit-Limit`, `X-RateLimit-Remaining` and
    /// `X-RateLimit-Reset` (unix seconds).
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(
            X_RATELIMIT_RESET,
            HeaderValue::from(self.reset_time.timestamp()),
        );
    }
}

/// Consulted by each tool route before any AI call is made.
#[async_trait]
pub trait RouteRateLimiter: Send + Sync {
    /// Count one request from `client` against `route`'s budget.
    async fn check(&self, client: &str, route: &str) -> AppResult<RateLimitDecision>;

    /// Drop state for clients that have fully replenished.
    fn housekeeping(&self);
}

struct RouteBucket {
    limiter: KeyedLimiter,
    limit: u32,
    cell: Duration,
}

/// In-process [`RouteRateLimiter`] backed by Governor keyed limiters.
pub struct GovernorRouteLimiter {
    buckets: HashMap<String, RouteBucket>,
    tier: String,
    clock: DefaultClock,
}

impl GovernorRouteLimiter {
    pub fn new(
        policies: impl IntoIterator<Item = RoutePolicy>,
        tier: impl Into<String>,
    ) -> Result<Self, RateLimitError> {
        let mut buckets = HashMap::new();

        for policy in policies {
            let burst = NonZeroU32::new(policy.limit)
                .ok_or_else(|| RateLimitError::ZeroLimit(policy.route.clone()))?;
            let cell = policy.window / policy.limit;
            let quota = Quota::with_period(cell)
                .ok_or_else(|| RateLimitError::InvalidWindow(policy.route.clone()))?
                .allow_burst(burst);

            let limiter = RateLimiter::keyed(quota).with_middleware::<StateInformationMiddleware>();
            buckets.insert(
                policy.route,
                RouteBucket {
                    limiter,
                    limit: policy.limit,
                    cell,
                },
            );
        }

        Ok(Self {
            buckets,
            tier: tier.into(),
            clock: DefaultClock::default(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, RateLimitError> {
        Self::new(RoutePolicy::from_config(config), &config.rate_limit_tier)
    }

    pub fn into_shared(self) -> Arc<dyn RouteRateLimiter> {
        Arc::new(self)
    }

    fn decide(&self, client: &str, route: &str) -> RateLimitDecision {
        let now = Utc::now();

        let Some(bucket) = self.buckets.get(route) else {
            debug!(route, "No rate limit policy for route, allowing");
            return RateLimitDecision {
                allowed: true,
                limit: 0,
                remaining: 0,
                reset_time: now,
                retry_after: None,
                tier: self.tier.clone(),
                message: None,
            };
        };

        match bucket.limiter.check_key(&client.to_string()) {
            Ok(snapshot) => {
                let remaining = snapshot.remaining_burst_capacity();
                let refill = bucket.cell * bucket.limit.saturating_sub(remaining);
                RateLimitDecision {
                    allowed: true,
                    limit: bucket.limit,
                    remaining,
                    reset_time: now + chrono_duration(refill),
                    retry_after: None,
                    tier: self.tier.clone(),
                    message: None,
                }
            }
            Err(not_until) => {
                let wait = not_until.wait_time_from(self.clock.now());
                let retry_after = whole_seconds_ceil(wait).max(1);

                warn!(
                    client_address = %client,
                    route,
                    retry_after_secs = retry_after,
                    "Route rate limit exceeded"
                );
                metrics::record_rate_limit_rejection(route);

                RateLimitDecision {
                    allowed: false,
                    limit: bucket.limit,
                    remaining: 0,
                    reset_time: now + chrono_duration(Duration::from_secs(retry_after)),
                    retry_after: Some(retry_after),
                    tier: self.tier.clone(),
                    message: Some(rejection_message(bucket.limit, &self.tier, retry_after)),
                }
            }
        }
    }
}

#[async_trait]
impl RouteRateLimiter for GovernorRouteLimiter {
    async fn check(&self, client: &str, route: &str) -> AppResult<RateLimitDecision> {
        Ok(self.decide(client, route))
    }

    fn housekeeping(&self) {
        for (route, bucket) in &self.buckets {
            bucket.limiter.retain_recent();
            bucket.limiter.shrink_to_fit();
            debug!(
                route = %route,
                tracked_clients = bucket.limiter.len(),
                "Pruned rate limiter state"
            );
        }
    }
}

/// Round up so a client waiting the advertised time is admitted.
fn whole_seconds_ceil(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

fn chrono_duration(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::hours(1))
}

fn rejection_message(limit: u32, tier: &str, retry_after: u64) -> String {
    let minutes = retry_after.div_ceil(60);
    let wait = if minutes <= 1 {
        "about a minute".to_string()
    } else {
        format!("{minutes} minutes")
    };
    format!(
        "You've used all {limit} requests per hour available on the {tier} tier. \
         Please try again in {wait}."
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn limiter(limit: u32) -> GovernorRouteLimiter {
        GovernorRouteLimiter::new([RoutePolicy::per_hour(SKILL_GAP, limit)], "free").unwrap()
    }

    #[tokio::test]
    async fn test_budget_then_reject() {
        let limiter = limiter(4);

        for expected_remaining in (0..4).rev() {
            let decision = limiter.check("1.1.1.1", SKILL_GAP).await.unwrap();
            assert!(decision.allowed);
            assert_eq!(decision.limit, 4);
            assert_eq!(decision.remaining, expected_remaining);
            assert!(decision.retry_after.is_none());
        }

        let decision = limiter.check("1.1.1.1", SKILL_GAP).await.unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.tier, "free");
        // One cell is 15 minutes
        let retry = decision.retry_after.unwrap();
        assert!(retry > 800 && retry <= 900, "retry_after was {retry}");
        assert!(decision.message.unwrap().contains("15 minutes"));
    }

    #[tokio::test]
    async fn test_clients_are_independent() {
        let limiter = limiter(1);
        assert!(limiter.check("1.1.1.1", SKILL_GAP).await.unwrap().allowed);
        assert!(!limiter.check("1.1.1.1", SKILL_GAP).await.unwrap().allowed);
        assert!(limiter.check("2.2.2.2", SKILL_GAP).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_routes_are_independent() {
        let limiter = GovernorRouteLimiter::new(
            [
                RoutePolicy::per_hour(SKILL_GAP, 1),
                RoutePolicy::per_hour(COVER_LETTER, 1),
            ],
            "free",
        )
        .unwrap();

        assert!(limiter.check("1.1.1.1", SKILL_GAP).await.unwrap().allowed);
        assert!(limiter.check("1.1.1.1", COVER_LETTER).await.unwrap().allowed);
        assert!(!limiter.check("1.1.1.1", SKILL_GAP).await.unwrap().allowed);
    }

    #[test]
    fn test_whole_seconds_round_up() {
        assert_eq!(whole_seconds_ceil(Duration::from_millis(2_499)), 3);
        assert_eq!(whole_seconds_ceil(Duration::from_secs(2)), 2);
        assert_eq!(whole_seconds_ceil(Duration::from_nanos(1)), 1);
        assert_eq!(whole_seconds_ceil(Duration::ZERO), 0);
    }

    #[tokio::test]
    async fn test_waiting_retry_after_is_enough() {
        let policy = RoutePolicy {
            route: SKILL_GAP.to_string(),
            limit: 1,
            window: Duration::from_millis(2_500),
        };
        let limiter = GovernorRouteLimiter::new([policy], "free").unwrap();

        assert!(limiter.check("1.1.1.1", SKILL_GAP).await.unwrap().allowed);
        let refused = limiter.check("1.1.1.1", SKILL_GAP).await.unwrap();
        assert!(!refused.allowed);

        let retry_after = refused.retry_after.unwrap();
        assert_eq!(retry_after, 3);
        assert!(refused.reset_time >= Utc::now() + chrono::Duration::milliseconds(2_400));

        tokio::time::sleep(Duration::from_secs(retry_after)).await;
        assert!(limiter.check("1.1.1.1", SKILL_GAP).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_unknown_route_allowed() {
        let limiter = limiter(1);
        for _ in 0..5 {
            assert!(limiter.check("1.1.1.1", "no-such-route").await.unwrap().allowed);
        }
    }

    #[tokio::test]
    async fn test_reset_time_reflects_spent_budget() {
        let limiter = limiter(4);
        let decision = limiter.check("1.1.1.1", SKILL_GAP).await.unwrap();
        let until_reset = decision.reset_time - Utc::now();
        assert!(until_reset <= chrono::Duration::minutes(15));
        assert!(until_reset > chrono::Duration::minutes(14));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let err = GovernorRouteLimiter::new([RoutePolicy::per_hour(SKILL_GAP, 0)], "free")
            .err()
            .unwrap();
        assert_eq!(err, RateLimitError::ZeroLimit(SKILL_GAP.to_string()));
    }

    #[test]
    fn test_apply_headers() {
        let decision = RateLimitDecision {
            allowed: true,
            limit: 10,
            remaining: 7,
            reset_time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            retry_after: None,
            tier: "free".to_string(),
            message: None,
        };
        let mut headers = HeaderMap::new();
        decision.apply_headers(&mut headers);
        assert_eq!(headers["x-ratelimit-limit"], "10");
        assert_eq!(headers["x-ratelimit-remaining"], "7");
        assert_eq!(headers["x-ratelimit-reset"], "1700000000");
    }

    #[test]
    fn test_policies_from_config() {
        let policies = RoutePolicy::from_config(&Config::default());
        assert_eq!(policies.len(), 3);
        assert_eq!(policies[0], RoutePolicy::per_hour(RESUME_ANALYSIS, 4));
        assert_eq!(policies[2], RoutePolicy::per_hour(COVER_LETTER, 10));
    }

    #[test]
    fn test_housekeeping_does_not_panic() {
        let limiter = limiter(2);
        limiter.decide("1.1.1.1", SKILL_GAP);
        limiter.housekeeping();
    }
}
