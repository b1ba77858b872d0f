//! Inference stage: mood analysis with a remote model and a local fallback
//!
//! Provides an `AnalysisBackend` trait with one remote implementation:
//! - **Gemini**: `generateContent` call asking for a single JSON object
//!
//! `InferenceStage` wraps an optional backend together with the
//! `FallbackAnalyzer`. Blank input is rejected; every other failure (no
//! credential, transport error, non-2xx status, timeout, malformed response)
//! is logged and answered by the fallback analyzer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

use crate::fallback::FallbackAnalyzer;
use crate::lexicon::Lexicon;
use crate::models::{AnalysisInput, AnalysisResult, AnalysisSource, Mood};
use crate::response::{parse_analysis_response, ParsedAnalysis, ResponseShapeError};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Upper bound on extra attempts after the first request.
pub const MAX_RETRIES: usize = 1;

// ============================================================================
// AnalysisBackend trait
// ============================================================================

/// Abstraction over remote analysis services.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Analyze one entry. Any error sends the caller to the fallback path.
    async fn analyze(&self, text: &str) -> Result<ParsedAnalysis, AnalysisError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

/// Raised when the submitted text is empty or whitespace-only.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Journal entry text is required")]
pub struct InvalidInput;

/// Remote analysis errors. Never surfaced past `InferenceStage`.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Missing API key")]
    MissingApiKey,

    #[error("Response contained no candidate text")]
    EmptyCandidate,

    #[error("Malformed analysis response: {0}")]
    Shape(#[from] ResponseShapeError),

    #[error("All {attempts} attempts failed, last error: {last}")]
    RetryExhausted { attempts: usize, last: String },
}

impl AnalysisError {
    fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AnalysisError::Timeout
        } else {
            AnalysisError::Http(e)
        }
    }

    /// Worth another attempt: connection trouble, timeouts, throttling, 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            AnalysisError::Timeout => true,
            AnalysisError::Http(e) => e.is_connect() || e.is_timeout(),
            AnalysisError::Api { code, .. } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

// ============================================================================
// Config
// ============================================================================

/// Remote analysis client configuration. The credential is passed in, never
/// read from the environment here.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    /// Extra attempts after the first one, for transient failures only.
    /// Anything above `MAX_RETRIES` is capped.
    pub max_retries: usize,
    pub retry_delay_ms: u64,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl AnalysisConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: 1,
            retry_delay_ms: 250,
            temperature: 0.3,
            max_output_tokens: 300,
        }
    }
}

/// Fixed instruction sent with every request.
pub fn analysis_instruction() -> String {
    let vocabulary = Mood::ALL
        .iter()
        .map(Mood::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are a journaling assistant that analyzes diary entries. \
Respond with a single JSON object and no other text, containing:\n\
- mood: string, exactly one of: {vocabulary}\n\
- moodScore: number between 0 and 1, where 0 is very negative, 0.5 is neutral and 1 is very positive\n\
- summary: string, a 1-2 sentence summary of the entry\n\
- tags: array of up to 5 short lower-case topic labels"
    )
}

// ============================================================================
// Gemini API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    code: u16,
    message: String,
}

// ============================================================================
// GeminiAnalysisClient
// ============================================================================

/// Gemini analysis client: calls the `generateContent` API.
#[derive(Debug, Clone)]
pub struct GeminiAnalysisClient {
    client: Client,
    config: AnalysisConfig,
    lexicon: Arc<Lexicon>,
}

impl GeminiAnalysisClient {
    fn retries(&self) -> usize {
        self.config.max_retries.min(MAX_RETRIES)
    }

    pub fn new(config: AnalysisConfig, lexicon: Arc<Lexicon>) -> Result<Self, AnalysisError> {
        if config.api_key.trim().is_empty() {
            return Err(AnalysisError::MissingApiKey);
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            config,
            lexicon,
        })
    }

    async fn analyze_once(&self, text: &str) -> Result<ParsedAnalysis, AnalysisError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        let request = GenerateRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: analysis_instruction(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: text.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(AnalysisError::from_transport)?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let error_detail = serde_json::from_str::<GeminiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error);

            let (code, message) = error_detail
                .map(|e| (e.code, e.message))
                .unwrap_or((status.as_u16(), error_body));

            tracing::warn!(code = code, message = %message, "Gemini API error");

            return Err(AnalysisError::Api { code, message });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(AnalysisError::from_transport)?;

        let raw: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if raw.trim().is_empty() {
            return Err(AnalysisError::EmptyCandidate);
        }

        Ok(parse_analysis_response(&raw, &self.lexicon)?)
    }
}

#[async_trait]
impl AnalysisBackend for GeminiAnalysisClient {
    async fn analyze(&self, text: &str) -> Result<ParsedAnalysis, AnalysisError> {
        let retry_strategy = ExponentialBackoff::from_millis(self.config.retry_delay_ms.max(1))
            .max_delay(Duration::from_secs(2))
            .map(jitter)
            .take(self.retries());

        let result = RetryIf::spawn(
            retry_strategy,
            || self.analyze_once(text),
            |e: &AnalysisError| e.is_transient(),
        )
        .await;

        match result {
            Ok(parsed) => Ok(parsed),
            Err(e) if e.is_transient() => Err(AnalysisError::RetryExhausted {
                attempts: self.retries() + 1,
                last: e.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// ============================================================================
// InferenceStage
// ============================================================================

/// Combine a remote result with the fallback's score and tags when the remote
/// response left them out. The remote mood and summary always win.
pub fn merge_with_fallback(remote: ParsedAnalysis, fallback: AnalysisResult) -> AnalysisResult {
    AnalysisResult {
        mood: remote.mood,
        summary: remote.summary,
        mood_score: remote.mood_score.or(fallback.mood_score),
        tags: if remote.tags.is_empty() {
            fallback.tags
        } else {
            remote.tags
        },
        source: AnalysisSource::External,
    }
}

/// Orchestrates the remote backend (when configured) and the fallback analyzer.
#[derive(Clone)]
pub struct InferenceStage {
    remote: Option<Arc<dyn AnalysisBackend>>,
    fallback: FallbackAnalyzer,
}

impl InferenceStage {
    pub fn new(remote: Option<Arc<dyn AnalysisBackend>>, fallback: FallbackAnalyzer) -> Self {
        Self { remote, fallback }
    }

    pub fn fallback_only(fallback: FallbackAnalyzer) -> Self {
        Self::new(None, fallback)
    }

    /// Build a stage with a Gemini backend. A missing or unusable credential
    /// leaves the stage in fallback-only mode.
    pub fn with_gemini(config: AnalysisConfig, fallback: FallbackAnalyzer) -> Self {
        let lexicon = Arc::new(fallback.lexicon().clone());
        match GeminiAnalysisClient::new(config, lexicon) {
            Ok(client) => Self::new(Some(Arc::new(client)), fallback),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Remote analysis unavailable, using keyword fallback for every entry"
                );
                Self::fallback_only(fallback)
            }
        }
    }

    pub fn remote_name(&self) -> Option<&str> {
        self.remote.as_deref().map(|r| r.name())
    }

    pub fn fallback(&self) -> &FallbackAnalyzer {
        &self.fallback
    }

    pub async fn analyze_text(&self, text: &str) -> Result<AnalysisResult, InvalidInput> {
        self.analyze(&AnalysisInput::new(text)).await
    }

    /// Never fails except on blank input.
    pub async fn analyze(&self, input: &AnalysisInput) -> Result<AnalysisResult, InvalidInput> {
        if input.text.trim().is_empty() {
            return Err(InvalidInput);
        }

        let fallback = self.fallback.analyze_input(input);

        let Some(remote) = self.remote.as_ref() else {
            tracing::debug!("No remote analysis backend configured, using fallback");
            return Ok(fallback);
        };

        let prompt = match input.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => format!("Title: {}\n\n{}", title, input.text),
            _ => input.text.clone(),
        };

        match remote.analyze(&prompt).await {
            Ok(parsed) => {
                tracing::debug!(backend = remote.name(), mood = %parsed.mood, "Remote analysis succeeded");
                Ok(merge_with_fallback(parsed, fallback))
            }
            Err(e) => {
                tracing::warn!(
                    backend = remote.name(),
                    error = %e,
                    "Remote analysis failed, using keyword fallback"
                );
                Ok(fallback)
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
