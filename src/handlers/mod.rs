mod health;
pub mod tools;

pub use health::{health_check, readiness_check, security_metrics};
pub use tools::{cover_letter, learning_resources, preflight, resume_analysis, skill_gap};
