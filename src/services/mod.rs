//! Business logic behind the tool routes.

pub mod learning_resources;
pub mod rate_limiter;

pub use learning_resources::{LearningResource, ResourceKind, resources_for};
pub use rate_limiter::{
    GovernorRouteLimiter, RateLimitDecision, RateLimitError, RoutePolicy, RouteRateLimiter,
};
