//! State behind the request gate: suspicion counts, blocked addresses and
//! the rolling violation log.
//!
//! The gate only talks to the [`SecurityStore`] trait. [`InMemorySecurityStore`]
//! keeps everything in process memory, which is correct for a single
//! long-running server and resets on restart. A stateless deployment needs an
//! implementation backed by a shared keyed store to block consistently across
//! instances.
//!
//! # Blocking vs. eviction
//!
//! Suspicion records expire by `first_seen_at`, blocked addresses never do.
//! Evicting the count of an address that was already promoted leaves it blocked.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use dashmap::{DashMap, DashSet};
use tracing::debug;

use super::violation::SecurityViolation;

/// Per-address aggregate of observed violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuspiciousClientRecord {
    pub violation_count: u32,
    pub first_seen_at: DateTime<Utc>,
}

/// What a cleanup pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionStats {
    pub suspicion_records: usize,
    pub logged_violations: usize,
}

/// Storage contract for the request gate.
pub trait SecurityStore: Send + Sync {
    /// Whether `address` is in the blocked set.
    fn is_blocked(&self, address: &str) -> bool;

    /// Add `address` to the blocked set. Returns `true` if it was not blocked before.
    fn block(&self, address: &str) -> bool;

    /// Count `violations` against `address` and append them to the log.
    ///
    /// Returns the address's cumulative violation count.
    fn record(&self, address: &str, violations: &[SecurityViolation], now: DateTime<Utc>) -> u32;

    /// Append a violation to the log without touching suspicion counts.
    fn log(&self, violation: SecurityViolation);

    /// Current suspicion record for `address`, if any.
    fn suspicion(&self, address: &str) -> Option<SuspiciousClientRecord>;

    /// Drop suspicion records and logged violations older than the retention window.
    fn evict_expired(&self, now: DateTime<Utc>) -> EvictionStats;

    /// Logged violations observed after `since`.
    fn violations_since(&self, since: DateTime<Utc>) -> Vec<SecurityViolation>;

    fn blocked_count(&self) -> usize;

    fn suspicious_count(&self) -> usize;
}

/// Process-local [`SecurityStore`] built on concurrent maps.
pub struct InMemorySecurityStore {
    suspicious: DashMap<String, SuspiciousClientRecord>,
    blocked: DashSet<String>,
    log: Mutex<VecDeque<SecurityViolation>>,
    log_capacity: usize,
    retention: Duration,
}

impl InMemorySecurityStore {
    /// Create a store retaining records for `retention` and at most
    /// `log_capacity` logged violations (oldest dropped first).
    pub fn new(retention: std::time::Duration, log_capacity: usize) -> Self {
        let retention = Duration::from_std(retention).unwrap_or_else(|_| Duration::hours(24));
        Self {
            suspicious: DashMap::new(),
            blocked: DashSet::new(),
            log: Mutex::new(VecDeque::new()),
            log_capacity: log_capacity.max(1),
            retention,
        }
    }

    fn log_guard(&self) -> MutexGuard<'_, VecDeque<SecurityViolation>> {
        // Log entries are plain data; a panic mid-push cannot leave them inconsistent
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push_log(&self, log: &mut VecDeque<SecurityViolation>, violation: SecurityViolation) {
        if log.len() >= self.log_capacity {
            log.pop_front();
        }
        log.push_back(violation);
    }
}

impl Default for InMemorySecurityStore {
    fn default() -> Self {
        Self::new(std::time::Duration::from_secs(86_400), 10_000)
    }
}

impl SecurityStore for InMemorySecurityStore {
    fn is_blocked(&self, address: &str) -> bool {
        self.blocked.contains(address)
    }

    fn block(&self, address: &str) -> bool {
        self.blocked.insert(address.to_string())
    }

    fn record(&self, address: &str, violations: &[SecurityViolation], now: DateTime<Utc>) -> u32 {
        let added = u32::try_from(violations.len()).unwrap_or(u32::MAX);

        let count = {
            let mut entry = self
                .suspicious
                .entry(address.to_string())
                .or_insert(SuspiciousClientRecord {
                    violation_count: 0,
                    first_seen_at: now,
                });
            entry.violation_count = entry.violation_count.saturating_add(added);
            entry.violation_count
        };

        let mut log = self.log_guard();
        for violation in violations {
            self.push_log(&mut log, violation.clone());
        }

        count
    }

    fn log(&self, violation: SecurityViolation) {
        let mut log = self.log_guard();
        self.push_log(&mut log, violation);
    }

    fn suspicion(&self, address: &str) -> Option<SuspiciousClientRecord> {
        self.suspicious.get(address).map(|r| *r)
    }

    fn evict_expired(&self, now: DateTime<Utc>) -> EvictionStats {
        let cutoff = now - self.retention;

        let before = self.suspicious.len();
        self.suspicious.retain(|_, record| record.first_seen_at > cutoff);
        let suspicion_records = before.saturating_sub(self.suspicious.len());

        let mut log = self.log_guard();
        let before = log.len();
        log.retain(|v| v.observed_at > cutoff);
        let logged_violations = before.saturating_sub(log.len());

        debug!(
            suspicion_records,
            logged_violations, "Evicted expired security records"
        );

        EvictionStats {
            suspicion_records,
            logged_violations,
        }
    }

    fn violations_since(&self, since: DateTime<Utc>) -> Vec<SecurityViolation> {
        self.log_guard()
            .iter()
            .filter(|v| v.observed_at > since)
            .cloned()
            .collect()
    }

    fn blocked_count(&self) -> usize {
        self.blocked.len()
    }

    fn suspicious_count(&self) -> usize {
        self.suspicious.len()
    }
}
