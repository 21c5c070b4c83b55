//! Request gate and its supporting types.

pub mod gate;
pub mod store;
pub mod violation;

pub use gate::{GateDecision, Rejection, RequestFacts, RequestGate, SecurityConfig, SecurityMetrics};
pub use store::{EvictionStats, InMemorySecurityStore, SecurityStore, SuspiciousClientRecord};
pub use violation::{SecurityViolation, Severity, ViolationKind};
