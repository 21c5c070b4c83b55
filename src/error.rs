use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::http::header::{HeaderName, HeaderValue, RETRY_AFTER};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::ai_client::AiError;
use crate::services::RateLimitDecision;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Application-wide error types mapped onto the public error taxonomy.
///
/// | Variant | Status | `type` |
/// |---|---|---|
/// | `Validation` | 400 | `VALIDATION_ERROR` |
/// | `Forbidden` | 403 | `SECURITY_VIOLATION` |
/// | `RateLimited` | 429 | `RATE_LIMIT_EXCEEDED` |
/// | `UpstreamQuota` | 429 | `UPSTREAM_QUOTA` |
/// | `Api` | 500 | `API_ERROR` |
/// | `Config` | 503 | `CONFIG_ERROR` |
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Request rejected by security gate: {0}")]
    Forbidden(String),

    #[error("Rate limit exceeded for route")]
    RateLimited(Box<RateLimitDecision>),

    #[error("AI provider quota exhausted")]
    UpstreamQuota { retry_after: Option<u64> },

    #[error("AI provider call failed: {0}")]
    Api(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body for API endpoints.
#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
    message: String,
    #[serde(rename = "type")]
    error_type: &'a str,
}

/// Body of a 429 produced by the route rate limiter.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitResponse<'a> {
    error: &'static str,
    message: &'a str,
    tier: &'a str,
    reset_time: String,
    retry_after: Option<u64>,
}

/// Guidance shown when the upstream provider quota is exhausted.
pub const UPSTREAM_QUOTA_MESSAGE: &str = "Our AI assistant has reached its usage quota for now. \
     The quota resets daily at midnight Pacific Time; please try again later.";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(message) => {
                tracing::debug!(%message, "Validation failed");
                error_body(
                    StatusCode::BAD_REQUEST,
                    "Invalid input",
                    message,
                    "VALIDATION_ERROR",
                )
            }
            AppError::Forbidden(reason) => {
                tracing::warn!(%reason, "Request forbidden");
                error_body(
                    StatusCode::FORBIDDEN,
                    "FORBIDDEN",
                    "Request blocked by security policy.".to_string(),
                    "SECURITY_VIOLATION",
                )
            }
            AppError::RateLimited(decision) => rate_limited_response(&decision),
            AppError::UpstreamQuota { retry_after } => {
                tracing::warn!(?retry_after, "AI provider quota exhausted");
                let mut response = error_body(
                    StatusCode::TOO_MANY_REQUESTS,
                    "RATE_LIMIT_EXCEEDED",
                    UPSTREAM_QUOTA_MESSAGE.to_string(),
                    "UPSTREAM_QUOTA",
                );
                if let Some(secs) = retry_after {
                    insert_header(&mut response, RETRY_AFTER, secs.to_string());
                }
                response
            }
            AppError::Api(detail) => {
                // Log the full error details server-side for debugging
                // but only expose sanitized messages to clients
                tracing::error!(%detail, "AI provider call failed");
                error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "AI service error",
                    "We couldn't process your request right now. Please try again in a few minutes."
                        .to_string(),
                    "API_ERROR",
                )
            }
            AppError::Config(detail) => {
                tracing::error!(%detail, "Service misconfigured");
                error_body(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service unavailable",
                    "This tool is temporarily unavailable. Please try again later.".to_string(),
                    "CONFIG_ERROR",
                )
            }
            AppError::Internal(detail) => {
                tracing::error!(%detail, "Internal error");
                error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error",
                    "An internal error occurred. Please try again later.".to_string(),
                    "API_ERROR",
                )
            }
        }
    }
}

fn error_body(status: StatusCode, error: &str, message: String, error_type: &str) -> Response {
    let body = ErrorResponse {
        error,
        message,
        error_type,
    };
    (status, axum::Json(body)).into_response()
}

fn rate_limited_response(decision: &RateLimitDecision) -> Response {
    let message = decision
        .message
        .as_deref()
        .unwrap_or("Rate limit exceeded. Please retry later.");

    let body = RateLimitResponse {
        error: "RATE_LIMIT_EXCEEDED",
        message,
        tier: &decision.tier,
        reset_time: decision.reset_time.to_rfc3339(),
        retry_after: decision.retry_after,
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, axum::Json(body)).into_response();
    decision.apply_headers(response.headers_mut());
    if let Some(secs) = decision.retry_after {
        insert_header(&mut response, RETRY_AFTER, secs.to_string());
    }
    response
}

fn insert_header(response: &mut Response, name: HeaderName, value: String) {
    if let Ok(value) = HeaderValue::from_str(&value) {
        response.headers_mut().insert(name, value);
    }
}

impl From<AiError> for AppError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::MissingApiKey => AppError::Config("GEMINI_API_KEY is not set".to_string()),
            AiError::QuotaExceeded { retry_after } => AppError::UpstreamQuota { retry_after },
            other => AppError::Api(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(sanitize_json_rejection(&rejection))
    }
}

/// Sanitize JSON body rejections to avoid leaking internal type information.
///
/// Serde errors can contain internal struct/field names which shouldn't be
/// exposed to external clients. This function extracts the useful parts.
fn sanitize_json_rejection(rejection: &JsonRejection) -> String {
    if matches!(rejection, JsonRejection::MissingJsonContentType(_)) {
        return "Request body must be JSON (Content-Type: application/json)".to_string();
    }

    let msg = rejection.body_text();

    if msg.contains("missing field")
        && let Some(start) = msg.find('`')
        && let Some(end) = msg[start + 1..].find('`')
    {
        let field = &msg[start + 1..start + 1 + end];
        return format!("Missing required field: {field}");
    }

    if msg.contains("invalid type") {
        return "Invalid data type in request body".to_string();
    }

    if msg.contains("EOF while parsing") || msg.contains("expected") {
        return "Malformed JSON in request body".to_string();
    }

    if msg.contains("length limit") {
        return "Request body is too large".to_string();
    }

    "Invalid request format".to_string()
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
