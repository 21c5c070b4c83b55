//! Field validation for the tool routes.
//!
//! Lengths are counted in characters after trimming. Free text may contain
//! line breaks and tabs but no other control characters.

use crate::error::{AppError, AppResult};
use crate::models::{CoverLetterRequest, ResumeAnalysisRequest, SkillGapRequest};

// =============================================================================
// Validation Constants
// =============================================================================

pub const MIN_RESUME_LENGTH: usize = 50;
pub const MAX_RESUME_LENGTH: usize = 20_000;

pub const MIN_ROLE_LENGTH: usize = 2;
pub const MAX_ROLE_LENGTH: usize = 120;

pub const MIN_JOB_DESCRIPTION_LENGTH: usize = 50;
pub const MAX_JOB_DESCRIPTION_LENGTH: usize = 10_000;

pub const MAX_COMPANY_NAME_LENGTH: usize = 120;

pub const MAX_SKILL_LENGTH: usize = 100;

/// Validate a required text field against a character range.
pub fn validate_text(field: &str, value: &str, min: usize, max: usize) -> AppResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }

    let len = value.chars().count();
    if len < min {
        return Err(AppError::Validation(format!(
            "{field} must be at least {min} characters"
        )));
    }
    if len > max {
        return Err(AppError::Validation(format!(
            "{field} cannot exceed {max} characters"
        )));
    }

    if let Some((i, c)) = value
        .chars()
        .enumerate()
        .find(|(_, c)| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
    {
        return Err(AppError::Validation(format!(
            "{field} contains an invalid control character (U+{:04X}) at position {i}",
            u32::from(c)
        )));
    }

    Ok(())
}

/// Validate an optional text field; blank counts as absent.
pub fn validate_optional_text(
    field: &str,
    value: Option<&str>,
    min: usize,
    max: usize,
) -> AppResult<()> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => validate_text(field, v, min, max),
        None => Ok(()),
    }
}

/// Trimmed value of an optional field, `None` when blank.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn validate_resume_analysis(req: &ResumeAnalysisRequest) -> AppResult<()> {
    validate_text(
        "resumeText",
        &req.resume_text,
        MIN_RESUME_LENGTH,
        MAX_RESUME_LENGTH,
    )?;
    validate_optional_text(
        "targetRole",
        req.target_role.as_deref(),
        MIN_ROLE_LENGTH,
        MAX_ROLE_LENGTH,
    )
}

pub fn validate_skill_gap(req: &SkillGapRequest) -> AppResult<()> {
    validate_text(
        "resumeText",
        &req.resume_text,
        MIN_RESUME_LENGTH,
        MAX_RESUME_LENGTH,
    )?;
    validate_text(
        "targetRole",
        &req.target_role,
        MIN_ROLE_LENGTH,
        MAX_ROLE_LENGTH,
    )
}

pub fn validate_cover_letter(req: &CoverLetterRequest) -> AppResult<()> {
    validate_text(
        "resumeText",
        &req.resume_text,
        MIN_RESUME_LENGTH,
        MAX_RESUME_LENGTH,
    )?;
    validate_text(
        "jobDescription",
        &req.job_description,
        MIN_JOB_DESCRIPTION_LENGTH,
        MAX_JOB_DESCRIPTION_LENGTH,
    )?;
    validate_optional_text(
        "companyName",
        req.company_name.as_deref(),
        1,
        MAX_COMPANY_NAME_LENGTH,
    )
}

pub fn validate_skill(skill: &str) -> AppResult<()> {
    validate_text("skill", skill, 1, MAX_SKILL_LENGTH)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn resume() -> String {
        "Senior analyst with eight years of experience in SQL and reporting.\n\tLed a team of four."
            .to_string()
    }

    fn message(result: AppResult<()>) -> String {
        match result {
            Err(AppError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_resume_analysis() {
        let req = ResumeAnalysisRequest {
            resume_text: resume(),
            target_role: None,
        };
        assert!(validate_resume_analysis(&req).is_ok());
    }

    #[test]
    fn test_missing_resume() {
        let req = ResumeAnalysisRequest {
            resume_text: "   ".to_string(),
            target_role: None,
        };
        assert_eq!(
            message(validate_resume_analysis(&req)),
            "resumeText is required"
        );
    }

    #[test]
    fn test_resume_too_short_and_too_long() {
        assert!(message(validate_text("resumeText", "short", 50, 100)).contains("at least 50"));
        let long = "a".repeat(MAX_RESUME_LENGTH + 1);
        assert!(
            message(validate_text(
                "resumeText",
                &long,
                MIN_RESUME_LENGTH,
                MAX_RESUME_LENGTH
            ))
            .contains("cannot exceed")
        );
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let text = "é".repeat(MIN_RESUME_LENGTH);
        assert!(validate_text("resumeText", &text, MIN_RESUME_LENGTH, MAX_RESUME_LENGTH).is_ok());
    }

    #[test]
    fn test_control_characters_rejected() {
        let text = format!("{}\u{0007}", resume());
        assert!(
            message(validate_text(
                "resumeText",
                &text,
                MIN_RESUME_LENGTH,
                MAX_RESUME_LENGTH
            ))
            .contains("U+0007")
        );
    }

    #[test]
    fn test_blank_optional_role_is_absent() {
        let req = ResumeAnalysisRequest {
            resume_text: resume(),
            target_role: Some("  ".to_string()),
        };
        assert!(validate_resume_analysis(&req).is_ok());
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(Some(" PM ")), Some("PM"));
    }

    #[test]
    fn test_skill_gap_requires_role() {
        let req = SkillGapRequest {
            resume_text: resume(),
            target_role: "X".to_string(),
        };
        assert!(message(validate_skill_gap(&req)).contains("targetRole"));
    }

    #[test]
    fn test_cover_letter_job_description() {
        let req = CoverLetterRequest {
            resume_text: resume(),
            job_description: "Too short".to_string(),
            company_name: Some("Acme".to_string()),
        };
        assert!(message(validate_cover_letter(&req)).contains("jobDescription"));

        let req = CoverLetterRequest {
            job_description: resume(),
            ..req
        };
        assert!(validate_cover_letter(&req).is_ok());
    }

    #[test]
    fn test_company_name_limit() {
        let req = CoverLetterRequest {
            resume_text: resume(),
            job_description: resume(),
            company_name: Some("c".repeat(MAX_COMPANY_NAME_LENGTH + 1)),
        };
        assert!(message(validate_cover_letter(&req)).contains("companyName"));
    }
}
