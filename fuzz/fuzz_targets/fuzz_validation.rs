//! Fuzz testing for request validation and model-output parsing.
//!
//! Every function here takes untrusted text, from a client body or from the
//! AI provider, and must return a `Result` rather than panic.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! cargo +nightly install cargo-fuzz
//! cargo +nightly fuzz run fuzz_validation -- -max_total_time=60
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use resume_tools_api::ai_client::strip_json_fences;
use resume_tools_api::models::{CoverLetterRequest, SkillGapDraft, SkillGapRequest};
use resume_tools_api::services::resources_for;
use resume_tools_api::validation::{
    MAX_RESUME_LENGTH, MIN_RESUME_LENGTH, validate_cover_letter, validate_skill, validate_skill_gap,
    validate_text,
};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    let _ = validate_text("resumeText", s, MIN_RESUME_LENGTH, MAX_RESUME_LENGTH);
    let _ = validate_skill(s);

    // Split the input so both fields see arbitrary text
    let mid = s.char_indices().nth(s.chars().count() / 2).map_or(0, |(i, _)| i);
    let (left, right) = s.split_at(mid);

    let _ = validate_skill_gap(&SkillGapRequest {
        resume_text: left.to_string(),
        target_role: right.to_string(),
    });
    let _ = validate_cover_letter(&CoverLetterRequest {
        resume_text: left.to_string(),
        job_description: right.to_string(),
        company_name: Some(s.to_string()),
    });

    // Model output goes through fence stripping before deserialization
    let _ = serde_json::from_str::<SkillGapDraft>(strip_json_fences(s));

    let resources = resources_for(s);
    assert!(!resources.is_empty());
});
