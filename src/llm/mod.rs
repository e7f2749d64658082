//! Chat-completion backends for the dispatch queue.
//!
//! The dispatcher only ever sees the [`ChatBackend`] trait and the classified
//! [`BackendError`] taxonomy; everything endpoint-specific — request shape,
//! auth, status handling, and the best-effort "try again in Ns" wait hint —
//! lives here. The shipped adapter speaks the OpenAI-compatible
//! `chat/completions` protocol used by Groq and similar hosted services.

use crate::dispatch::{BackendError, GenerationRequest};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Interface implemented by text-generation backends.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Issue one generation call against the named model.
    ///
    /// Failures must be classified into the [`BackendError`] taxonomy; the
    /// retry machinery never inspects raw responses.
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<String, BackendError>;
}

/// Client for OpenAI-compatible chat-completion endpoints.
pub struct OpenAiChatClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiChatClient {
    /// Construct a client with the given per-call timeout.
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Self {
        let http = Client::builder()
            .user_agent("docbrief/0.1")
            .timeout(timeout)
            .build()
            .expect("Failed to construct reqwest::Client for chat completions");
        Self {
            http,
            base_url,
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

#[async_trait]
impl ChatBackend for OpenAiChatClient {
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<String, BackendError> {
        let payload = json!({
            "model": model,
            "messages": request.messages,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "top_p": request.top_p,
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let message = read_error_message(response).await;
            let retry_after = parse_retry_hint(&message);
            return Err(BackendError::RateLimited {
                retry_after,
                message,
            });
        }

        if !status.is_success() {
            let message = read_error_message(response).await;
            return Err(BackendError::Permanent(format!("{status}: {message}")));
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|error| {
            BackendError::Permanent(format!("malformed completion response: {error}"))
        })?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| BackendError::Permanent("completion response had no choices".into()))
    }
}

fn classify_transport_error(error: reqwest::Error) -> BackendError {
    if error.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Transport(error.to_string())
    }
}

/// Extract the structured error message from a failure response, falling back
/// to the raw body text.
async fn read_error_message(response: reqwest::Response) -> String {
    let raw = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&raw) {
        Ok(ErrorBody {
            error: Some(ErrorDetail {
                message: Some(message),
            }),
        }) => message,
        _ => raw,
    }
}

/// Best-effort extraction of a "try again in 14.5s" wait hint.
///
/// The remote service phrases this inside a human-readable message, so the
/// contract is fragile; when nothing parseable is found the dispatcher falls
/// back to its computed exponential backoff.
fn parse_retry_hint(message: &str) -> Option<Duration> {
    const MARKER: &str = "try again in ";
    let start = message.find(MARKER)? + MARKER.len();
    let rest = &message[start..];
    let digits: String = rest
        .chars()
        .take_while(|ch| ch.is_ascii_digit() || *ch == '.')
        .collect();
    if !rest[digits.len()..].starts_with('s') {
        return None;
    }
    let seconds: f64 = digits.parse().ok()?;
    if seconds.is_finite() && seconds >= 0.0 {
        Some(Duration::from_secs_f64(seconds))
    } else {
        None
    }
}
