//! The request gate: header heuristics, repeat-offender tracking and the
//! CORS/CSP headers for well-formed responses.
//!
//! # Checks (in order)
//!
//! ```text
//! blocked address? ──yes──► 403, single high `suspicious-activity`, nothing else runs
//!        │ no
//!        ▼
//! origin / referer allow-list   high    origin-mismatch
//! user-agent empty              medium  missing-or-blocked-user-agent
//! user-agent denylisted         high    missing-or-blocked-user-agent
//! content-length > max          medium  oversized-body
//! no origin+referer on writes   medium  missing-csrf-provenance
//!        │
//!        ▼
//! count violations per address; above threshold ─► blocked set
//!        │
//!        ▼
//! any high severity (or address just blocked) ─► 403, otherwise allowed
//! ```
//!
//! Low and medium violations never reject a request on their own; callers
//! get them back for logging.
//!
//! The gate never fails on malformed headers. Unparseable values are treated
//! as absent, e.g. a non-numeric `content-length` skips the size check. Body
//! size is judged from `content-length` only; a client that lies about it is
//! not caught here.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE, CONTENT_LENGTH, ORIGIN, REFERER, USER_AGENT, VARY,
};
use axum::http::{HeaderMap, HeaderValue, Method, Request};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::store::{EvictionStats, InMemorySecurityStore, SecurityStore};
use super::violation::{SecurityViolation, Severity, ViolationKind};
use crate::config::Config;
use crate::metrics;
use crate::middleware::ip::{TrustedProxyConfig, resolve_client_address};

pub const CORS_ALLOW_METHODS: &str = "GET, POST, OPTIONS";
pub const CORS_ALLOW_HEADERS: &str = "Content-Type, Authorization, X-Requested-With";
pub const CORS_MAX_AGE_SECS: u32 = 86_400;

/// Process-wide gate configuration, fixed at startup.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    pub max_body_size: u64,
    pub require_csrf: bool,
    /// Lowercased user-agent substrings.
    pub blocked_user_agents: Vec<String>,
    pub trusted_proxies: TrustedProxyConfig,
    pub block_threshold: u32,
    pub retention: Duration,
    /// Origin of the AI provider, the only external `connect-src`.
    pub ai_origin: String,
}

impl SecurityConfig {
    pub fn from_config(config: &Config) -> Self {
        let ai_origin = url::Url::parse(&config.ai_base_url)
            .map(|u| u.origin().ascii_serialization())
            .unwrap_or_else(|_| config.ai_base_url.clone());

        Self {
            allowed_origins: config.cors_allowed_origins.clone(),
            max_body_size: config.max_body_size,
            require_csrf: config.require_csrf,
            blocked_user_agents: config
                .blocked_user_agents
                .iter()
                .map(|ua| ua.to_ascii_lowercase())
                .collect(),
            trusted_proxies: TrustedProxyConfig::new(&config.trusted_proxies),
            block_threshold: config.block_threshold,
            retention: Duration::from_std(config.suspicion_ttl)
                .unwrap_or_else(|_| Duration::hours(24)),
            ai_origin,
        }
    }

    fn origin_allowed(&self, origin: &str) -> bool {
        let origin = origin.trim_end_matches('/');
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// The parts of a request the gate inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFacts {
    pub method: Method,
    pub origin: Option<String>,
    pub referer: Option<String>,
    pub user_agent: String,
    pub content_length: Option<u64>,
    pub client_address: String,
}

impl RequestFacts {
    pub fn from_request<B>(req: &Request<B>, trusted_proxies: &TrustedProxyConfig) -> Self {
        let headers = req.headers();
        Self {
            method: req.method().clone(),
            origin: header_text(headers, ORIGIN),
            referer: header_text(headers, REFERER),
            user_agent: header_text(headers, USER_AGENT).unwrap_or_default(),
            content_length: header_text(headers, CONTENT_LENGTH)
                .and_then(|v| v.parse::<u64>().ok()),
            client_address: resolve_client_address(req, trusted_proxies),
        }
    }
}

/// Non-empty, UTF-8, trimmed header value.
fn header_text(headers: &HeaderMap, name: axum::http::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Origin component of a referer URL, `None` if it has no tuple origin.
fn referer_origin(referer: &str) -> Option<String> {
    let url = url::Url::parse(referer).ok()?;
    let origin = url.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Why a request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The address was already in the blocked set.
    BlockedAddress,
    /// This request pushed the address over the block threshold.
    ThresholdExceeded,
    /// A high-severity violation was raised.
    Violation(ViolationKind),
}

impl Rejection {
    pub fn as_str(self) -> &'static str {
        match self {
            Rejection::BlockedAddress => "blocked-address",
            Rejection::ThresholdExceeded => "threshold-exceeded",
            Rejection::Violation(kind) => kind.as_str(),
        }
    }
}

/// Outcome of [`RequestGate::validate_request`].
///
/// `valid` is `false` on any high-severity violation, and also when this
/// request's violations push the address over the block threshold, even if
/// they are all low or medium. Check `rejection` for the reason.
#[derive(Debug, Clone)]
pub struct GateDecision {
    pub valid: bool,
    pub violations: Vec<SecurityViolation>,
    pub rejection: Option<Rejection>,
}

/// Read-only diagnostic view of recent gate activity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityMetrics {
    pub window_hours: i64,
    pub total_violations: usize,
    pub by_kind: BTreeMap<&'static str, usize>,
    pub by_severity: BTreeMap<&'static str, usize>,
    pub blocked_addresses: usize,
    pub suspicious_addresses: usize,
    pub generated_at: DateTime<Utc>,
}

/// Validates inbound requests and tracks repeat offenders.
///
/// Cheap to share behind an `Arc`; all mutable state lives in the injected
/// [`SecurityStore`].
pub struct RequestGate {
    config: SecurityConfig,
    store: Arc<dyn SecurityStore>,
    csp: String,
}

impl RequestGate {
    pub fn new(config: SecurityConfig, store: Arc<dyn SecurityStore>) -> Self {
        let csp = build_csp(&config.ai_origin);
        Self { config, store, csp }
    }

    /// Gate with a fresh process-local store.
    pub fn in_memory(config: SecurityConfig, log_capacity: usize) -> Self {
        let retention = config.retention.to_std().unwrap_or_default();
        let store = Arc::new(InMemorySecurityStore::new(retention, log_capacity));
        Self::new(config, store)
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SecurityStore> {
        &self.store
    }

    pub fn validate_request(&self, facts: &RequestFacts) -> GateDecision {
        self.validate_request_at(facts, Utc::now())
    }

    /// [`validate_request`](Self::validate_request) with an explicit clock.
    pub fn validate_request_at(&self, facts: &RequestFacts, now: DateTime<Utc>) -> GateDecision {
        let address = facts.client_address.as_str();

        if self.store.is_blocked(address) {
            let violation = SecurityViolation::new(
                ViolationKind::SuspiciousActivity,
                Severity::High,
                address,
                facts.user_agent.as_str(),
                now,
            )
            .with_detail("reason", "address is blocked");

            self.store.log(violation.clone());
            metrics::record_gate_violation(violation.kind.as_str(), violation.severity.as_str());
            metrics::record_gate_rejection(Rejection::BlockedAddress.as_str());

            return GateDecision {
                valid: false,
                violations: vec![violation],
                rejection: Some(Rejection::BlockedAddress),
            };
        }

        let mut violations = Vec::new();
        self.check_origin(facts, now, &mut violations);
        self.check_user_agent(facts, now, &mut violations);
        self.check_size(facts, now, &mut violations);
        self.check_csrf(facts, now, &mut violations);

        for v in &violations {
            metrics::record_gate_violation(v.kind.as_str(), v.severity.as_str());
        }

        let mut threshold_exceeded = false;
        if !violations.is_empty() {
            let count = self.store.record(address, &violations, now);
            if count > self.config.block_threshold {
                threshold_exceeded = true;
                if self.store.block(address) {
                    warn!(
                        client_address = %address,
                        violation_count = count,
                        "Client address blocked after repeated violations"
                    );
                    metrics::set_blocked_addresses(self.store.blocked_count());
                }
            }
        }

        let rejection = violations
            .iter()
            .find(|v| v.is_blocking())
            .map(|v| Rejection::Violation(v.kind))
            .or(threshold_exceeded.then_some(Rejection::ThresholdExceeded));

        match rejection {
            Some(reason) => {
                metrics::record_gate_rejection(reason.as_str());
                warn!(
                    client_address = %address,
                    reason = reason.as_str(),
                    violations = violations.len(),
                    "Request rejected by gate"
                );
            }
            None if !violations.is_empty() => {
                debug!(
                    client_address = %address,
                    kinds = ?violations.iter().map(|v| v.kind.as_str()).collect::<Vec<_>>(),
                    "Advisory violations recorded"
                );
            }
            None => {}
        }

        GateDecision {
            valid: rejection.is_none(),
            violations,
            rejection,
        }
    }

    fn violation(
        &self,
        facts: &RequestFacts,
        kind: ViolationKind,
        severity: Severity,
        now: DateTime<Utc>,
    ) -> SecurityViolation {
        SecurityViolation::new(
            kind,
            severity,
            facts.client_address.as_str(),
            facts.user_agent.as_str(),
            now,
        )
    }

    fn check_origin(
        &self,
        facts: &RequestFacts,
        now: DateTime<Utc>,
        out: &mut Vec<SecurityViolation>,
    ) {
        let (origin, source) = match (&facts.origin, &facts.referer) {
            (Some(origin), _) => (origin.clone(), "origin"),
            (None, Some(referer)) => match referer_origin(referer) {
                Some(origin) => (origin, "referer"),
                None => return,
            },
            // Same-origin navigations carry neither header
            (None, None) => return,
        };

        if !self.config.origin_allowed(&origin) {
            out.push(
                self.violation(facts, ViolationKind::OriginMismatch, Severity::High, now)
                    .with_detail("origin", origin)
                    .with_detail("source", source),
            );
        }
    }

    fn check_user_agent(
        &self,
        facts: &RequestFacts,
        now: DateTime<Utc>,
        out: &mut Vec<SecurityViolation>,
    ) {
        if facts.user_agent.is_empty() {
            out.push(
                self.violation(
                    facts,
                    ViolationKind::MissingOrBlockedUserAgent,
                    Severity::Medium,
                    now,
                )
                .with_detail("reason", "missing"),
            );
            return;
        }

        let lowered = facts.user_agent.to_ascii_lowercase();
        if let Some(pattern) = self
            .config
            .blocked_user_agents
            .iter()
            .find(|p| lowered.contains(p.as_str()))
        {
            out.push(
                self.violation(
                    facts,
                    ViolationKind::MissingOrBlockedUserAgent,
                    Severity::High,
                    now,
                )
                .with_detail("reason", "blocked")
                .with_detail("pattern", pattern.as_str()),
            );
        }
    }

    fn check_size(
        &self,
        facts: &RequestFacts,
        now: DateTime<Utc>,
        out: &mut Vec<SecurityViolation>,
    ) {
        if let Some(length) = facts.content_length
            && length > self.config.max_body_size
        {
            out.push(
                self.violation(facts, ViolationKind::OversizedBody, Severity::Medium, now)
                    .with_detail("contentLength", length.to_string())
                    .with_detail("maxBodySize", self.config.max_body_size.to_string()),
            );
        }
    }

    fn check_csrf(
        &self,
        facts: &RequestFacts,
        now: DateTime<Utc>,
        out: &mut Vec<SecurityViolation>,
    ) {
        if !self.config.require_csrf
            || facts.method == Method::GET
            || facts.method == Method::OPTIONS
        {
            return;
        }

        if facts.origin.is_none() && facts.referer.is_none() {
            out.push(
                self.violation(
                    facts,
                    ViolationKind::MissingCsrfProvenance,
                    Severity::Medium,
                    now,
                )
                .with_detail("method", facts.method.as_str()),
            );
        }
    }

    /// CORS headers for a response to a request with the given `origin`.
    ///
    /// Echoes the origin when allow-listed, otherwise the first configured
    /// origin. Pure function of configuration and input.
    pub fn cors_headers(&self, origin: Option<&str>) -> HeaderMap {
        let allow_origin = origin
            .filter(|o| self.config.origin_allowed(o))
            .or_else(|| self.config.allowed_origins.first().map(String::as_str))
            .and_then(|o| HeaderValue::from_str(o).ok());

        let mut headers = HeaderMap::new();
        if let Some(value) = allow_origin {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        );
        headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from(CORS_MAX_AGE_SECS));
        headers.insert(VARY, HeaderValue::from_static("Origin"));
        headers
    }

    /// The fixed Content-Security-Policy value.
    pub fn csp_header(&self) -> &str {
        &self.csp
    }

    pub fn security_metrics(&self) -> SecurityMetrics {
        self.security_metrics_at(Utc::now())
    }

    pub fn security_metrics_at(&self, now: DateTime<Utc>) -> SecurityMetrics {
        let recent = self.store.violations_since(now - self.config.retention);

        let mut by_kind: BTreeMap<&'static str, usize> =
            ViolationKind::ALL.iter().map(|k| (k.as_str(), 0)).collect();
        let mut by_severity: BTreeMap<&'static str, usize> =
            Severity::ALL.iter().map(|s| (s.as_str(), 0)).collect();

        for v in &recent {
            *by_kind.entry(v.kind.as_str()).or_default() += 1;
            *by_severity.entry(v.severity.as_str()).or_default() += 1;
        }

        SecurityMetrics {
            window_hours: self.config.retention.num_hours(),
            total_violations: recent.len(),
            by_kind,
            by_severity,
            blocked_addresses: self.store.blocked_count(),
            suspicious_addresses: self.store.suspicious_count(),
            generated_at: now,
        }
    }

    /// Prune expired suspicion records and log entries.
    pub fn cleanup(&self, now: DateTime<Utc>) -> EvictionStats {
        let stats = self.store.evict_expired(now);
        metrics::set_blocked_addresses(self.store.blocked_count());
        stats
    }
}

fn build_csp(ai_origin: &str) -> String {
    format!(
        "default-src 'self'; \
         script-src 'self' 'unsafe-inline'; \
         style-src 'self' 'unsafe-inline'; \
         img-src 'self' data: https:; \
         font-src 'self' data:; \
         connect-src 'self' {ai_origin}; \
         frame-ancestors 'none'; \
         base-uri 'self'; \
         form-action 'self'"
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const ALLOWED: &str = "https://example.com";
    const BROWSER_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) Safari/605.1.15";

    fn gate() -> RequestGate {
        RequestGate::in_memory(SecurityConfig::default(), 1_000)
    }

    fn facts(method: Method) -> RequestFacts {
        RequestFacts {
            method,
            origin: Some(ALLOWED.to_string()),
            referer: None,
            user_agent: BROWSER_UA.to_string(),
            content_length: Some(120),
            client_address: "203.0.113.10".to_string(),
        }
    }

    #[test]
    fn test_clean_request_passes() {
        let decision = gate().validate_request(&facts(Method::POST));
        assert!(decision.valid);
        assert!(decision.violations.is_empty());
        assert!(decision.rejection.is_none());
    }

    #[test]
    fn test_unknown_origin_is_high() {
        let mut f = facts(Method::POST);
        f.origin = Some("https://evil.example".to_string());

        let decision = gate().validate_request(&f);
        assert!(!decision.valid);
        assert_eq!(decision.violations.len(), 1);
        assert_eq!(decision.violations[0].kind, ViolationKind::OriginMismatch);
        assert_eq!(decision.violations[0].severity, Severity::High);
        assert_eq!(
            decision.rejection,
            Some(Rejection::Violation(ViolationKind::OriginMismatch))
        );
    }

    #[test]
    fn test_referer_fallback() {
        let mut f = facts(Method::POST);
        f.origin = None;
        f.referer = Some("https://example.com/tools/resume-analysis?x=1".to_string());
        assert!(gate().validate_request(&f).valid);

        f.referer = Some("https://evil.example/page".to_string());
        let decision = gate().validate_request(&f);
        assert!(!decision.valid);
        assert_eq!(decision.violations[0].details["source"], "referer");
    }

    #[test]
    fn test_unparseable_referer_treated_as_absent() {
        let mut f = facts(Method::GET);
        f.origin = None;
        f.referer = Some("::not a url::".to_string());

        let decision = gate().validate_request(&f);
        assert!(decision.valid);
        assert!(decision.violations.is_empty());
    }

    #[test]
    fn test_no_origin_or_referer_on_get_is_clean() {
        let mut f = facts(Method::GET);
        f.origin = None;
        assert!(gate().validate_request(&f).violations.is_empty());
    }

    #[test]
    fn test_empty_user_agent_is_medium() {
        let mut f = facts(Method::POST);
        f.user_agent = String::new();

        let decision = gate().validate_request(&f);
        assert!(decision.valid);
        assert_eq!(decision.violations.len(), 1);
        assert_eq!(
            decision.violations[0].kind,
            ViolationKind::MissingOrBlockedUserAgent
        );
        assert_eq!(decision.violations[0].severity, Severity::Medium);
    }

    #[test]
    fn test_blocked_user_agent_is_high_case_insensitive() {
        for ua in ["curl/8.4.0", "Mozilla/5.0 (compatible; GoogleBot/2.1)", "PostmanRuntime/7.36"] {
            let mut f = facts(Method::POST);
            f.user_agent = ua.to_string();

            let decision = gate().validate_request(&f);
            assert!(!decision.valid, "{ua} should be rejected");
            assert_eq!(decision.violations[0].severity, Severity::High);
        }
    }

    #[test]
    fn test_oversized_body_is_advisory() {
        let mut f = facts(Method::POST);
        f.content_length = Some(50_001);

        let decision = gate().validate_request(&f);
        assert!(decision.valid);
        assert_eq!(decision.violations[0].kind, ViolationKind::OversizedBody);

        f.content_length = Some(50_000);
        assert!(gate().validate_request(&f).violations.is_empty());
    }

    #[test]
    fn test_post_without_provenance_is_medium_and_allowed() {
        let mut f = facts(Method::POST);
        f.origin = None;

        let decision = gate().validate_request(&f);
        assert!(decision.valid);
        assert_eq!(decision.violations.len(), 1);
        assert_eq!(
            decision.violations[0].kind,
            ViolationKind::MissingCsrfProvenance
        );
        assert_eq!(decision.violations[0].severity, Severity::Medium);
    }

    #[test]
    fn test_csrf_skipped_for_options() {
        let mut f = facts(Method::OPTIONS);
        f.origin = None;
        assert!(gate().validate_request(&f).violations.is_empty());
    }

    #[test]
    fn test_csrf_disabled() {
        let config = SecurityConfig {
            require_csrf: false,
            ..SecurityConfig::default()
        };
        let gate = RequestGate::in_memory(config, 100);
        let mut f = facts(Method::POST);
        f.origin = None;
        assert!(gate.validate_request(&f).violations.is_empty());
    }

    #[test]
    fn test_violations_accumulate_into_block() {
        let gate = gate();
        let mut noisy = facts(Method::POST);
        noisy.origin = None; // one medium violation per request

        for i in 1..=10 {
            let decision = gate.validate_request(&noisy);
            assert!(decision.valid, "request {i} should be allowed");
        }
        assert!(!gate.store().is_blocked(&noisy.client_address));

        let eleventh = gate.validate_request(&noisy);
        assert!(!eleventh.valid);
        assert_eq!(eleventh.rejection, Some(Rejection::ThresholdExceeded));
        assert!(gate.store().is_blocked(&noisy.client_address));

        // A clean request from the same address is now short-circuited
        let clean = facts(Method::POST);
        let decision = gate.validate_request(&clean);
        assert!(!decision.valid);
        assert_eq!(decision.rejection, Some(Rejection::BlockedAddress));
        assert_eq!(decision.violations.len(), 1);
        assert_eq!(
            decision.violations[0].kind,
            ViolationKind::SuspiciousActivity
        );
        assert_eq!(decision.violations[0].severity, Severity::High);
    }

    #[test]
    fn test_block_survives_cleanup() {
        let gate = gate();
        let past = Utc::now() - Duration::hours(30);
        let mut noisy = facts(Method::POST);
        noisy.origin = None;

        for _ in 0..11 {
            gate.validate_request_at(&noisy, past);
        }
        assert!(gate.store().is_blocked(&noisy.client_address));

        let stats = gate.cleanup(Utc::now());
        assert_eq!(stats.suspicion_records, 1);
        assert!(gate.store().suspicion(&noisy.client_address).is_none());
        assert!(gate.store().is_blocked(&noisy.client_address));
    }

    #[test]
    fn test_cors_headers_echo_allowed_origin() {
        let gate = gate();
        let headers = gate.cors_headers(Some("http://localhost:3000"));
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:3000");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], CORS_ALLOW_METHODS);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_HEADERS], CORS_ALLOW_HEADERS);
        assert_eq!(headers[ACCESS_CONTROL_MAX_AGE], "86400");
    }

    #[test]
    fn test_cors_headers_default_to_first_origin() {
        let gate = gate();
        let first = gate.config().allowed_origins[0].clone();

        let headers = gate.cors_headers(Some("https://evil.example"));
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], first.as_str());

        let headers = gate.cors_headers(None);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], first.as_str());
    }

    #[test]
    fn test_cors_headers_idempotent() {
        let gate = gate();
        assert_eq!(
            gate.cors_headers(Some(ALLOWED)),
            gate.cors_headers(Some(ALLOWED))
        );
    }

    #[test]
    fn test_csp_names_ai_host() {
        let gate = gate();
        assert!(
            gate.csp_header()
                .contains("connect-src 'self' https://generativelanguage.googleapis.com")
        );
        assert!(gate.csp_header().starts_with("default-src 'self'"));
    }

    #[test]
    fn test_security_metrics_counts_window() {
        let gate = gate();
        let mut f = facts(Method::POST);
        f.origin = Some("https://evil.example".to_string());
        gate.validate_request(&f);

        let old = Utc::now() - Duration::hours(48);
        f.client_address = "198.51.100.1".to_string();
        gate.validate_request_at(&f, old);

        let snapshot = gate.security_metrics();
        assert_eq!(snapshot.window_hours, 24);
        assert_eq!(snapshot.total_violations, 1);
        assert_eq!(snapshot.by_kind["origin-mismatch"], 1);
        assert_eq!(snapshot.by_kind["oversized-body"], 0);
        assert_eq!(snapshot.by_severity["high"], 1);
        assert_eq!(snapshot.suspicious_addresses, 2);
        assert_eq!(snapshot.blocked_addresses, 0);
    }

    #[test]
    fn test_request_facts_from_request() {
        let req = Request::builder()
            .method(Method::POST)
            .header("origin", ALLOWED)
            .header("user-agent", BROWSER_UA)
            .header("content-length", "not-a-number")
            .header("x-forwarded-for", "192.0.2.55")
            .body(())
            .unwrap();

        let facts = RequestFacts::from_request(&req, &TrustedProxyConfig::default());
        assert_eq!(facts.origin.as_deref(), Some(ALLOWED));
        assert_eq!(facts.user_agent, BROWSER_UA);
        assert_eq!(facts.content_length, None);
        assert_eq!(facts.client_address, "192.0.2.55");
        assert!(facts.referer.is_none());
    }
}
