//! Google Gemini provider
//!
//! Streams replies from the `streamGenerateContent` endpoint with
//! `alt=sse`, so every event is one `GenerateContentResponse` carrying the
//! next slice of reply text.
//!
//! # Configuration
//!
//! ```toml
//! [llm]
//! provider = "gemini"
//! endpoint = "https://generativelanguage.googleapis.com/v1beta"
//! api_key_env = "GEMINI_API_KEY"
//! model = "gemini-3-flash-preview"
//! ```

use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::prompts;
use crate::conversation::{Speaker, Turn};

use super::sse::SseDecoder;
use super::{FragmentStream, ProviderError, ReplyBackend, ReplyRequest};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// A role-tagged block of content
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.to_string()),
                thought: None,
            }],
        }
    }
}

impl From<&Turn> for Content {
    fn from(turn: &Turn) -> Self {
        let role = match turn.speaker {
            Speaker::User => "user",
            Speaker::Assistant => "model",
        };
        Content::text(Some(role), &turn.text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    /// Set on reasoning summaries, which are not part of the reply
    #[serde(default, skip_serializing)]
    thought: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: GenerationConfig,
}

/// One streamed `GenerateContentResponse`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Error response from API
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl ApiError {
    fn describe(&self) -> String {
        match &self.status {
            Some(status) => format!("API error ({}): {}", status, self.message),
            None => format!("API error: {}", self.message),
        }
    }
}

/// Gemini provider configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Base URL, without trailing slash
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    /// Time allowed to establish the connection
    pub connect_timeout_secs: u64,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            connect_timeout_secs: 10,
        }
    }
}

pub struct GeminiProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.config.endpoint, self.config.model
        )
    }

    fn build_request(&self, request: &ReplyRequest) -> GenerateContentRequest {
        let mut contents: Vec<Content> = request.history.iter().map(Content::from).collect();
        contents.push(Content::text(Some("user"), &request.new_message));

        GenerateContentRequest {
            contents,
            system_instruction: Content::text(None, prompts::SYSTEM_INSTRUCTION),
            generation_config: GenerationConfig {
                temperature: prompts::TEMPERATURE,
                top_p: prompts::TOP_P,
            },
        }
    }
}

#[async_trait]
impl ReplyBackend for GeminiProvider {
    async fn open(&self, request: ReplyRequest) -> Result<FragmentStream, ProviderError> {
        let body = self.build_request(&request);
        tracing::debug!(
            model = %self.config.model,
            contents = body.contents.len(),
            "Opening Gemini stream"
        );

        let response = self
            .client
            .post(self.stream_url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if let Ok(error_resp) = serde_json::from_str::<ErrorResponse>(&body) {
                return Err(ProviderError::InvalidResponse(error_resp.error.describe()));
            }
            return Err(ProviderError::InvalidResponse(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        Ok(Box::pin(fragments(response)))
    }
}

fn fragments(response: reqwest::Response) -> impl Stream<Item = Result<String, ProviderError>> {
    try_stream! {
        let mut bytes = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk?;
            for payload in decoder.push(&chunk) {
                if let Some(text) = parse_chunk(&payload)? {
                    yield text;
                }
            }
        }

        if let Some(payload) = decoder.finish() {
            if let Some(text) = parse_chunk(&payload)? {
                yield text;
            }
        }
    }
}

/// Pull the reply text out of one event payload
fn parse_chunk(payload: &str) -> Result<Option<String>, ProviderError> {
    let chunk: StreamChunk = serde_json::from_str(payload).map_err(|e| {
        ProviderError::InvalidResponse(format!("Failed to parse chunk: {} - Body: {}", e, payload))
    })?;

    if let Some(error) = chunk.error {
        return Err(ProviderError::InvalidResponse(error.describe()));
    }

    if chunk.candidates.is_empty() {
        if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ProviderError::InvalidResponse(format!("Prompt blocked: {}", reason)));
        }
    }

    let Some(candidate) = chunk.candidates.into_iter().next() else {
        return Ok(None);
    };
    if let Some(reason) = &candidate.finish_reason {
        tracing::trace!(%reason, "Gemini candidate finished");
    }

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| !part.thought.unwrap_or(false))
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    Ok((!text.is_empty()).then_some(text))
}
