use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::LearningResource;

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /api/resume-analysis`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeAnalysisRequest {
    pub resume_text: String,
    #[serde(default)]
    pub target_role: Option<String>,
}

/// Body of `POST /api/skill-gap`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillGapRequest {
    pub resume_text: String,
    pub target_role: String,
}

/// Body of `POST /api/cover-letter`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverLetterRequest {
    pub resume_text: String,
    pub job_description: String,
    #[serde(default)]
    pub company_name: Option<String>,
}

/// Query of `GET /api/learning-resources`.
#[derive(Debug, Clone, Deserialize)]
pub struct LearningResourcesQuery {
    #[serde(default)]
    pub skill: String,
}

// =============================================================================
// Responses
// =============================================================================

/// Success envelope shared by the tool routes.
///
/// The route-specific result is flattened next to `processingTime` and
/// `success`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse<T> {
    #[serde(flatten)]
    pub result: T,
    /// Handler wall time in milliseconds.
    pub processing_time: u64,
    pub success: bool,
}

impl<T> ToolResponse<T> {
    pub fn new(result: T, processing_time: u64) -> Self {
        Self {
            result,
            processing_time,
            success: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResumeAnalysis {
    pub analysis: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillGapAnalysis {
    pub summary: String,
    pub missing_skills: Vec<SkillRecommendation>,
}

/// A missing skill with where to learn it.
#[derive(Debug, Serialize)]
pub struct SkillRecommendation {
    pub skill: String,
    pub resources: Vec<LearningResource>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverLetter {
    pub cover_letter: String,
}

#[derive(Debug, Serialize)]
pub struct LearningResourcesResponse {
    pub skill: String,
    pub resources: Vec<LearningResource>,
}

/// JSON the model is asked to return for a skill-gap prompt.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillGapDraft {
    pub summary: String,
    #[serde(default, alias = "missing_skills")]
    pub missing_skills: Vec<String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub ai_configured: bool,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}
