//! Fuzz testing for the request gate.
//!
//! Feeds arbitrary header values through `validate_request` and checks the
//! decision invariants hold for every input.
//!
//! ```bash
//! cargo +nightly fuzz run fuzz_gate -- -max_total_time=60
//! ```

#![no_main]

use std::sync::OnceLock;

use arbitrary::Arbitrary;
use http::Method;
use libfuzzer_sys::fuzz_target;
use resume_tools_api::security::{RequestFacts, RequestGate, SecurityConfig, Severity};

#[derive(Debug, Arbitrary)]
struct Input {
    post: bool,
    origin: Option<String>,
    referer: Option<String>,
    user_agent: String,
    content_length: Option<u64>,
    address: u8,
}

fn gate() -> &'static RequestGate {
    static GATE: OnceLock<RequestGate> = OnceLock::new();
    GATE.get_or_init(|| RequestGate::in_memory(SecurityConfig::default(), 10_000))
}

fuzz_target!(|input: Input| {
    let gate = gate();
    let address = format!("10.0.0.{}", input.address);
    let was_blocked = gate.store().is_blocked(&address);

    let facts = RequestFacts {
        method: if input.post { Method::POST } else { Method::GET },
        origin: input.origin,
        referer: input.referer,
        user_agent: input.user_agent,
        content_length: input.content_length,
        client_address: address.clone(),
    };

    let decision = gate.validate_request(&facts);

    if was_blocked {
        assert!(!decision.valid);
        assert_eq!(decision.violations.len(), 1);
        assert_eq!(decision.violations[0].severity, Severity::High);
    }
    if decision.violations.iter().any(|v| v.severity == Severity::High) {
        assert!(!decision.valid);
    }
    if decision.violations.is_empty() {
        assert!(decision.valid);
    }

    let _ = gate.cors_headers(facts.origin.as_deref());
});
