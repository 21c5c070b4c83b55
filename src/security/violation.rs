//! Security violation records produced by the request gate.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Category of a detected anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    OriginMismatch,
    MissingOrBlockedUserAgent,
    OversizedBody,
    MissingCsrfProvenance,
    SuspiciousActivity,
}

impl ViolationKind {
    pub const ALL: [ViolationKind; 5] = [
        ViolationKind::OriginMismatch,
        ViolationKind::MissingOrBlockedUserAgent,
        ViolationKind::OversizedBody,
        ViolationKind::MissingCsrfProvenance,
        ViolationKind::SuspiciousActivity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::OriginMismatch => "origin-mismatch",
            ViolationKind::MissingOrBlockedUserAgent => "missing-or-blocked-user-agent",
            ViolationKind::OversizedBody => "oversized-body",
            ViolationKind::MissingCsrfProvenance => "missing-csrf-provenance",
            ViolationKind::SuspiciousActivity => "suspicious-activity",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Violation severity. Ordered so that `High` compares greatest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    /// The blocking policy: only high-severity violations reject a request.
    pub fn is_blocking(self) -> bool {
        match self {
            Severity::High => true,
            Severity::Low | Severity::Medium => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one detected anomaly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityViolation {
    pub id: Uuid,
    pub kind: ViolationKind,
    pub client_address: String,
    pub user_agent: String,
    pub observed_at: DateTime<Utc>,
    pub severity: Severity,
    pub details: BTreeMap<String, String>,
}

impl SecurityViolation {
    pub fn new(
        kind: ViolationKind,
        severity: Severity,
        client_address: impl Into<String>,
        user_agent: impl Into<String>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            client_address: client_address.into(),
            user_agent: user_agent.into(),
            observed_at,
            severity,
            details: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }
}
