#![deny(missing_docs)]

//! Core library for the docbrief summarization server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Rate-limited, retrying, multi-backend dispatch queue.
pub mod dispatch;
/// Chat-completion client abstraction and adapters.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Service metrics helpers.
pub mod metrics;
/// Text preparation and summary orchestration.
pub mod processing;
/// In-memory document storage.
pub mod store;
