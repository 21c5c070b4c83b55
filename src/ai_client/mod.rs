//! Client for the hosted generative-AI provider.
//!
//! Handlers depend on the [`TextGenerator`] trait only; [`GeminiClient`] is the
//! production implementation and tests substitute a stub.
//!
//! Provider quota exhaustion (HTTP 429) is surfaced as
//! [`AiError::QuotaExceeded`] and never retried: the free-tier quota resets on
//! the provider's schedule, so retrying only burns more of it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

pub mod prompts;

const API_KEY_HEADER: &str = "x-goog-api-key";
const MAX_OUTPUT_TOKENS: u32 = 2048;
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI provider API key is not configured")]
    MissingApiKey,

    #[error("AI provider quota exceeded")]
    QuotaExceeded { retry_after: Option<u64> },

    #[error("AI provider request timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("AI provider blocked the prompt: {0}")]
    Blocked(String),

    #[error("AI provider returned empty content")]
    EmptyContent,

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl AiError {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            AiError::MissingApiKey => "missing_key",
            AiError::QuotaExceeded { .. } => "quota",
            AiError::Timeout => "timeout",
            AiError::Http(_) => "http",
            AiError::Api { .. } => "api",
            AiError::Blocked(_) => "blocked",
            AiError::EmptyContent => "empty",
            AiError::Parse(_) => "parse",
        }
    }
}

/// A text-in, text-out model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send `prompt` with the given system instruction and return the answer text.
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, AiError>;

    fn is_configured(&self) -> bool;
}

/// Generate and deserialize a JSON answer.
///
/// The system instruction must ask for JSON only; markdown fences are
/// tolerated anyway.
pub async fn generate_json<T: DeserializeOwned>(
    generator: &dyn TextGenerator,
    system: &str,
    prompt: &str,
) -> Result<T, AiError> {
    let text = generator.generate(system, prompt).await?;
    serde_json::from_str(strip_json_fences(&text)).map_err(AiError::Parse)
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

impl GenerateResponse {
    fn into_text(self) -> Result<String, AiError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(AiError::Blocked(reason));
        }

        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            Err(AiError::EmptyContent)
        } else {
            Ok(text)
        }
    }
}

// =============================================================================
// Gemini client
// =============================================================================

/// [`TextGenerator`] backed by the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(
        api_key: Option<String>,
        base_url: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        let client = Client::builder().timeout(timeout).build()?;
        let endpoint = format!(
            "{}/v1beta/models/{model}:generateContent",
            base_url.trim_end_matches('/')
        );

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AiError> {
        Self::new(
            config.ai_api_key.clone(),
            &config.ai_base_url,
            &config.ai_model,
            config.ai_timeout,
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, AiError> {
        let api_key = self.api_key.as_deref().ok_or(AiError::MissingApiKey)?;

        let body = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: [Part { text: system }],
            },
            contents: [Content {
                role: Some("user"),
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { AiError::Timeout } else { AiError::Http(e) })?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            warn!(?retry_after, "AI provider quota exceeded");
            return Err(AiError::QuotaExceeded { retry_after });
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ProviderError>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| if e.is_timeout() { AiError::Timeout } else { AiError::Http(e) })?;

        let text = parsed.into_text()?;
        debug!(chars = text.len(), "AI provider call succeeded");
        Ok(text)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };

    let rest = rest.trim_start();
    rest.strip_suffix("```").map_or(rest, str::trim)
}
