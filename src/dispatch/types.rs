//! Core data types and error definitions for the dispatch queue.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// A role-tagged message forwarded to the inference API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role (`system`, `user`, or `assistant`).
    pub role: String,
    /// Message body.
    pub content: String,
}

impl ChatMessage {
    /// Build a `system` message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    /// Build a `user` message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// One unit of generation work accepted by the dispatcher.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Ordered conversation forwarded to the model.
    pub messages: Vec<ChatMessage>,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus-sampling threshold.
    pub top_p: f32,
}

impl GenerationRequest {
    /// Build a request with the sampling defaults used across the service.
    pub fn new(messages: Vec<ChatMessage>, max_tokens: u32) -> Self {
        Self {
            messages,
            max_tokens,
            temperature: 0.3,
            top_p: 0.9,
        }
    }
}

/// One selectable model configuration among an ordered preference list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCandidate {
    /// Model identifier understood by the remote endpoint.
    pub model: String,
}

impl BackendCandidate {
    /// Wrap a model identifier as a candidate.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

/// Successful outcome of a dispatched request.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Generated text content.
    pub text: String,
    /// Model that produced the response.
    pub backend: String,
    /// Number of calls issued before success, across all backends.
    pub attempts: u32,
}

/// Classified failure from a single remote call.
///
/// Produced by the backend client (which owns all endpoint-specific error
/// parsing) and consumed by the retry state machine, which never inspects
/// raw responses itself.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The service asked the caller to slow down, optionally suggesting a wait.
    #[error("rate limited: {message}")]
    RateLimited {
        /// Server-suggested wait, when one could be extracted.
        retry_after: Option<Duration>,
        /// Diagnostic text returned by the service.
        message: String,
    },
    /// The call exceeded the per-request timeout.
    #[error("request timed out")]
    Timeout,
    /// The call failed below the HTTP layer.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The service rejected the request in a way retrying cannot fix.
    #[error("backend rejected request: {0}")]
    Permanent(String),
}

/// Errors surfaced to dispatch callers.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Every configured backend exhausted its attempt budget or failed permanently.
    #[error("all backends exhausted; last backend '{backend}' failed: {message}")]
    AllBackendsExhausted {
        /// Last backend tried before giving up.
        backend: String,
        /// Error text observed on the final attempt.
        message: String,
    },
    /// The dispatcher was constructed without any backend candidates.
    #[error("no backend candidates configured")]
    NoBackends,
    /// The worker task is gone; no further work can be accepted.
    #[error("dispatch queue is no longer running")]
    QueueClosed,
}
