//! OpenAI-compatible chat-completions provider.
//!
//! Works against any endpoint that speaks the `/chat/completions` dialect
//! (OpenAI, DashScope compatible mode, local gateways), with and without
//! `stream: true`.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, instrument};

use super::sse::{SseDecoder, SseEvent};
use super::{GenerationProvider, ProviderError, TextStream};
use crate::http::HttpClient;

/// Finish reason reported when the provider filtered the output.
const CONTENT_FILTER: &str = "content_filter";

/// Default system message.
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

// ============================================================================
// Configuration
// ============================================================================

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Provider name used in logs.
    pub name: String,
    /// Base URL, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Bearer token.
    pub api_key: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token limit.
    pub max_tokens: u32,
    /// Request timeout.
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Creates a config with default sampling parameters.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            temperature: 0.7,
            max_tokens: 1500,
            timeout: Duration::from_secs(60),
        }
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatContent>,
    #[serde(default)]
    delta: Option<ChatContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    #[serde(default)]
    content: Option<String>,
}

// ============================================================================
// Provider
// ============================================================================

/// Chat-completions provider.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    config: OpenAiConfig,
    http: HttpClient,
}

impl OpenAiCompatibleProvider {
    /// Creates a provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: OpenAiConfig) -> Result<Self, ProviderError> {
        let http = HttpClient::with_timeout(config.timeout)
            .map_err(|e| ProviderError::other(config.name.clone(), e.to_string()))?;
        Ok(Self { config, http })
    }

    /// Returns the provider configuration.
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn headers(&self) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        if let Some(ref key) = self.config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| ProviderError::other(self.name(), format!("Invalid API key: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn request<'a>(&'a self, prompt: &'a str, stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: DEFAULT_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream,
        }
    }

    async fn send(&self, prompt: &str, stream: bool) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .http
            .post_json(&self.config.endpoint(), self.headers()?, &self.request(prompt, stream))
            .await
            .map_err(|e| match e {
                crate::error::HttpError::Request(ref err) => {
                    ProviderError::from_reqwest(self.name(), err)
                }
                other => ProviderError::other(self.name(), other.to_string()),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(self.name(), status, &body))
    }
}

#[async_trait]
impl GenerationProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    #[instrument(
        skip(self, prompt),
        fields(provider = %self.config.name, model = %self.config.model)
    )]
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let response = self.send(prompt, false).await?;
        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(self.name(), &e))?;
        let text = parse_completion(self.name(), body)?;
        debug!(chars = text.len(), "Completion received");
        Ok(text)
    }

    #[instrument(
        skip(self, prompt),
        fields(provider = %self.config.name, model = %self.config.model)
    )]
    async fn generate_stream(&self, prompt: &str) -> Result<TextStream, ProviderError> {
        let response = self.send(prompt, true).await?;
        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()))
            .boxed();
        Ok(decode_stream(self.name().to_string(), bytes))
    }
}

// ============================================================================
// Response Handling
// ============================================================================

/// Maps an error status to a provider error.
fn classify_status(provider: &str, status: StatusCode, body: &str) -> ProviderError {
    let snippet: String = body.chars().take(200).collect();
    let message = format!("HTTP {}: {snippet}", status.as_u16());
    match status.as_u16() {
        400 | 403 | 451 => ProviderError::policy(provider, message),
        408 | 502 | 503 | 504 => ProviderError::connection(provider, message),
        _ => ProviderError::other(provider, message),
    }
}

fn parse_completion(provider: &str, body: ChatResponse) -> Result<String, ProviderError> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::other(provider, "response has no choices"))?;

    if choice.finish_reason.as_deref() == Some(CONTENT_FILTER) {
        return Err(ProviderError::policy(provider, "output withheld by content filter"));
    }

    Ok(choice.message.and_then(|m| m.content).unwrap_or_default())
}

/// Parses one streamed `data:` payload into an optional text delta.
fn parse_chunk(provider: &str, payload: &str) -> Result<Option<String>, ProviderError> {
    let chunk: ChatResponse = serde_json::from_str(payload)
        .map_err(|e| ProviderError::other(provider, format!("malformed stream chunk: {e}")))?;

    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(None);
    };

    if choice.finish_reason.as_deref() == Some(CONTENT_FILTER) {
        return Err(ProviderError::policy(provider, "stream stopped by content filter"));
    }

    Ok(choice
        .delta
        .and_then(|d| d.content)
        .filter(|content| !content.is_empty()))
}

struct StreamState {
    provider: String,
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, ProviderError>>,
    finished: bool,
}

impl StreamState {
    fn absorb(&mut self, event: SseEvent) {
        match event {
            SseEvent::Done => self.finished = true,
            SseEvent::Data(payload) => match parse_chunk(&self.provider, &payload) {
                Ok(Some(text)) => self.pending.push_back(Ok(text)),
                Ok(None) => {}
                Err(e) => {
                    self.pending.push_back(Err(e));
                    self.finished = true;
                }
            },
        }
    }
}

/// Turns an SSE byte stream into a text-delta stream.
fn decode_stream(
    provider: String,
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
) -> TextStream {
    let state = StreamState {
        provider,
        bytes,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(next) = state.pending.pop_front() {
                return Some((next, state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    for event in state.decoder.push(&chunk) {
                        state.absorb(event);
                        if state.finished {
                            break;
                        }
                    }
                }
                Some(Err(e)) => {
                    let error = ProviderError::from_reqwest(state.provider.clone(), &e);
                    state.pending.push_back(Err(error));
                    state.finished = true;
                }
                None => {
                    if let Some(event) = state.decoder.finish() {
                        state.absorb(event);
                    }
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}
