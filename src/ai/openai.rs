//! OpenAI-compatible chat-completions client
//!
//! Speaks the chat-completions JSON protocol against a configurable base
//! URL. Non-2xx responses come back as structured failure outcomes so the
//! caller can account for the attempt; only transport-level problems
//! (connect, timeout, undecodable 2xx body) are errors.

use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::AiClient;
use crate::types::{CompletionOutcome, CompletionRequest};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// AI client errors
#[derive(Debug, thiserror::Error)]
pub enum AiClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Response decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client for an OpenAI-compatible completion endpoint
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenAiClient {
    /// Create a client against the standard OpenAI endpoint.
    pub fn new() -> Result<Self, AiClientError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client against a compatible endpoint (proxy, self-hosted).
    pub fn with_base_url(base_url: &str) -> Result<Self, AiClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Submit one completion call and return a structured outcome.
    pub async fn complete(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<CompletionOutcome, AiClientError> {
        let body = ChatRequest {
            model: &request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            max_tokens: request.max_tokens,
        };

        let started = Instant::now();
        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        let duration_ms = started.elapsed().as_millis() as u64;

        debug!(
            model = %request.model,
            status = status.as_u16(),
            duration_ms,
            "AI completion round trip"
        );

        if status.is_success() {
            let parsed: ChatResponse = serde_json::from_slice(&bytes)?;
            Ok(success_outcome(
                parsed,
                &request.model,
                status.as_u16(),
                duration_ms,
            ))
        } else {
            let message = serde_json::from_slice::<ErrorResponse>(&bytes)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("upstream error")
                        .to_string()
                });
            Ok(failure_outcome(
                &request.model,
                status.as_u16(),
                duration_ms,
                message,
            ))
        }
    }
}

fn success_outcome(
    parsed: ChatResponse,
    requested_model: &str,
    http_status: u16,
    duration_ms: u64,
) -> CompletionOutcome {
    let usage = parsed.usage.unwrap_or_default();
    let (content, finish_reason) = parsed
        .choices
        .into_iter()
        .next()
        .map_or((None, None), |c| (c.message.content, c.finish_reason));

    CompletionOutcome {
        content,
        model: parsed
            .model
            .unwrap_or_else(|| requested_model.to_string()),
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
        finish_reason,
        http_status,
        success: true,
        duration_ms,
        error_message: None,
    }
}

fn failure_outcome(
    requested_model: &str,
    http_status: u16,
    duration_ms: u64,
    message: String,
) -> CompletionOutcome {
    CompletionOutcome {
        content: None,
        model: requested_model.to_string(),
        input_tokens: 0,
        output_tokens: 0,
        total_tokens: 0,
        finish_reason: None,
        http_status,
        success: false,
        duration_ms,
        error_message: Some(message),
    }
}

#[async_trait]
impl AiClient for OpenAiClient {
    async fn analyze(
        &self,
        api_key: &str,
        request: CompletionRequest,
    ) -> Result<CompletionOutcome> {
        Ok(self.complete(api_key, &request).await?)
    }
}
