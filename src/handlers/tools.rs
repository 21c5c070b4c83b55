//! Career tool handlers.
//!
//! # Endpoints
//!
//! - `POST /api/resume-analysis` - Resume critique (analysis budget)
//! - `POST /api/skill-gap` - Missing skills for a target role, with resources (analysis budget)
//! - `POST /api/cover-letter` - Cover letter draft (generation budget)
//! - `GET /api/learning-resources?skill=` - Static resource lookup, no AI call
//! - `OPTIONS` on each POST route - Preflight, CORS headers only
//!
//! # Pipeline
//!
//! ```text
//! gate (layer) → JSON body → field validation → route rate limit → AI call → envelope
//! ```
//!
//! Validation runs before the rate limiter so malformed input does not spend
//! the caller's budget. The limiter runs before the AI call.

use std::collections::HashSet;
use std::time::Instant;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{info, instrument};

use crate::ai_client::{AiError, generate_json, prompts};
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::middleware::ClientAddress;
use crate::models::{
    CoverLetter, CoverLetterRequest, LearningResourcesQuery, LearningResourcesResponse,
    ResumeAnalysis, ResumeAnalysisRequest, SkillGapAnalysis, SkillGapDraft, SkillGapRequest,
    SkillRecommendation, ToolResponse,
};
use crate::services::rate_limiter::{COVER_LETTER, RESUME_ANALYSIS, SKILL_GAP};
use crate::services::{RateLimitDecision, resources_for};
use crate::state::AppState;
use crate::validation::{
    non_blank, validate_cover_letter, validate_resume_analysis, validate_skill,
    validate_skill_gap,
};

pub const X_PROCESSING_TIME: HeaderName = HeaderName::from_static("x-processing-time");

/// Upper bound on skills returned by the skill-gap tool.
pub const MAX_MISSING_SKILLS: usize = 8;

const LEARNING_RESOURCES: &str = "learning-resources";

/// Preflight for the tool routes. The gate layer supplies the CORS headers.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Analyze a resume, optionally against a target role.
///
/// # Request Body
///
/// ```json
/// { "resumeText": "...", "targetRole": "Data Analyst" }
/// ```
///
/// # Response Body
///
/// ```json
/// { "analysis": "...", "processingTime": 1834, "success": true }
/// ```
#[instrument(skip_all, fields(client = %client.0))]
pub async fn resume_analysis(
    State(state): State<AppState>,
    client: ClientAddress,
    payload: Result<Json<ResumeAnalysisRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    finish(
        RESUME_ANALYSIS,
        analyze_resume(&state, &client, payload, started).await,
    )
}

async fn analyze_resume(
    state: &AppState,
    client: &ClientAddress,
    payload: Result<Json<ResumeAnalysisRequest>, JsonRejection>,
    started: Instant,
) -> AppResult<Response> {
    let Json(payload) = payload?;
    validate_resume_analysis(&payload)?;
    let decision = admit(state, client, RESUME_ANALYSIS).await?;

    let prompt = prompts::resume_analysis(
        payload.resume_text.trim(),
        non_blank(payload.target_role.as_deref()),
    );
    let analysis = generate_text(
        state,
        RESUME_ANALYSIS,
        prompts::CAREER_COACH_SYSTEM,
        &prompt,
    )
    .await?;

    Ok(success(ResumeAnalysis { analysis }, &decision, started))
}

/// Compare a resume with a target role and attach learning resources to each
/// missing skill.
///
/// # Request Body
///
/// ```json
/// { "resumeText": "...", "targetRole": "Backend Engineer" }
/// ```
///
/// # Response Body
///
/// ```json
/// {
///   "summary": "...",
///   "missingSkills": [{ "skill": "Kubernetes", "resources": [ ... ] }],
///   "processingTime": 2110,
///   "success": true
/// }
/// ```
#[instrument(skip_all, fields(client = %client.0))]
pub async fn skill_gap(
    State(state): State<AppState>,
    client: ClientAddress,
    payload: Result<Json<SkillGapRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    finish(
        SKILL_GAP,
        analyze_skill_gap(&state, &client, payload, started).await,
    )
}

async fn analyze_skill_gap(
    state: &AppState,
    client: &ClientAddress,
    payload: Result<Json<SkillGapRequest>, JsonRejection>,
    started: Instant,
) -> AppResult<Response> {
    let Json(payload) = payload?;
    validate_skill_gap(&payload)?;
    let decision = admit(state, client, SKILL_GAP).await?;

    let prompt = prompts::skill_gap(payload.resume_text.trim(), payload.target_role.trim());
    let system = format!(
        "{} {}",
        prompts::CAREER_COACH_SYSTEM,
        prompts::JSON_ONLY_SYSTEM
    );

    let ai_started = Instant::now();
    let draft = generate_json::<SkillGapDraft>(state.ai.as_ref(), &system, &prompt).await;
    record_ai(SKILL_GAP, ai_started, draft.as_ref().err().map(AiError::label));
    let draft = draft?;

    let analysis = SkillGapAnalysis {
        summary: draft.summary.trim().to_string(),
        missing_skills: recommend(draft.missing_skills),
    };

    Ok(success(analysis, &decision, started))
}

/// Draft a cover letter from a resume and job description.
///
/// # Request Body
///
/// ```json
/// { "resumeText": "...", "jobDescription": "...", "companyName": "Acme" }
/// ```
///
/// # Response Body
///
/// ```json
/// { "coverLetter": "...", "processingTime": 2950, "success": true }
/// ```
#[instrument(skip_all, fields(client = %client.0))]
pub async fn cover_letter(
    State(state): State<AppState>,
    client: ClientAddress,
    payload: Result<Json<CoverLetterRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    finish(
        COVER_LETTER,
        write_cover_letter(&state, &client, payload, started).await,
    )
}

async fn write_cover_letter(
    state: &AppState,
    client: &ClientAddress,
    payload: Result<Json<CoverLetterRequest>, JsonRejection>,
    started: Instant,
) -> AppResult<Response> {
    let Json(payload) = payload?;
    validate_cover_letter(&payload)?;
    let decision = admit(state, client, COVER_LETTER).await?;

    let prompt = prompts::cover_letter(
        payload.resume_text.trim(),
        payload.job_description.trim(),
        non_blank(payload.company_name.as_deref()),
    );
    let cover_letter =
        generate_text(state, COVER_LETTER, prompts::COVER_LETTER_SYSTEM, &prompt).await?;

    Ok(success(CoverLetter { cover_letter }, &decision, started))
}

/// Look up learning resources for one skill.
#[instrument(skip_all)]
pub async fn learning_resources(
    query: Result<Query<LearningResourcesQuery>, QueryRejection>,
) -> Response {
    finish(LEARNING_RESOURCES, lookup_resources(query))
}

fn lookup_resources(
    query: Result<Query<LearningResourcesQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) =
        query.map_err(|_| AppError::Validation("Invalid query string".to_string()))?;
    validate_skill(&query.skill)?;

    let skill = query.skill.trim().to_string();
    let resources = resources_for(&skill);
    Ok(Json(LearningResourcesResponse { skill, resources }).into_response())
}

// =============================================================================
// Helpers
// =============================================================================

/// Consult the route rate limiter, turning a refusal into an error.
async fn admit(
    state: &AppState,
    client: &ClientAddress,
    route: &str,
) -> AppResult<RateLimitDecision> {
    let decision = state.limiter.check(&client.0, route).await?;
    if decision.allowed {
        Ok(decision)
    } else {
        Err(AppError::RateLimited(Box::new(decision)))
    }
}

/// Plain-text AI call with latency recorded.
async fn generate_text(
    state: &AppState,
    route: &str,
    system: &str,
    prompt: &str,
) -> AppResult<String> {
    let started = Instant::now();
    let result = state.ai.generate(system, prompt).await;
    record_ai(route, started, result.as_ref().err().map(AiError::label));
    Ok(result?.trim().to_string())
}

fn record_ai(route: &str, started: Instant, error: Option<&'static str>) {
    metrics::record_ai_duration(
        route,
        error.unwrap_or("success"),
        started.elapsed().as_secs_f64(),
    );
}

/// Trim, de-duplicate (case-insensitively) and cap the model's skill list.
fn recommend(skills: Vec<String>) -> Vec<SkillRecommendation> {
    let mut seen = HashSet::new();
    skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .take(MAX_MISSING_SKILLS)
        .map(|skill| SkillRecommendation {
            resources: resources_for(&skill),
            skill,
        })
        .collect()
}

fn success<T: Serialize>(result: T, decision: &RateLimitDecision, started: Instant) -> Response {
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let mut response = Json(ToolResponse::new(result, elapsed_ms)).into_response();
    let headers = response.headers_mut();
    decision.apply_headers(headers);
    headers.insert(X_PROCESSING_TIME, HeaderValue::from(elapsed_ms));
    response
}

fn finish(route: &str, result: AppResult<Response>) -> Response {
    let response = result.unwrap_or_else(IntoResponse::into_response);
    let status = response.status();
    metrics::record_tool_request(route, status.as_u16());
    if status.is_success() {
        info!(route, status = status.as_u16(), "Tool request completed");
    }
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_recommend_dedupes_and_caps() {
        let skills = vec![
            " SQL ".to_string(),
            "sql".to_string(),
            String::new(),
            "Docker".to_string(),
        ];
        let recs = recommend(skills);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].skill, "SQL");
        assert_eq!(recs[1].skill, "Docker");
        assert!(recs.iter().all(|r| !r.resources.is_empty()));

        let many: Vec<String> = (0..20).map(|i| format!("Skill {i}")).collect();
        assert_eq!(recommend(many).len(), MAX_MISSING_SKILLS);
    }

    #[tokio::test]
    async fn test_learning_resources_requires_skill() {
        let response = learning_resources(Ok(Query(LearningResourcesQuery {
            skill: "  ".to_string(),
        })))
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_learning_resources_lookup() {
        let response = learning_resources(Ok(Query(LearningResourcesQuery {
            skill: "javascript".to_string(),
        })))
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["skill"], "javascript");
        assert_eq!(
            json["resources"][0]["platform"].as_str().unwrap(),
            "MDN Web Docs"
        );
    }

    #[test]
    fn test_success_headers() {
        let decision = RateLimitDecision {
            allowed: true,
            limit: 4,
            remaining: 3,
            reset_time: chrono::Utc::now(),
            retry_after: None,
            tier: "free".to_string(),
            message: None,
        };
        let response = success(
            ResumeAnalysis {
                analysis: "ok".to_string(),
            },
            &decision,
            Instant::now(),
        );
        assert_eq!(response.headers()["x-ratelimit-remaining"], "3");
        assert_eq!(response.headers()["x-ratelimit-limit"], "4");
        assert!(response.headers().contains_key("x-processing-time"));
    }
}
