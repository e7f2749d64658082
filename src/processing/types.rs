//! Core data types and error definitions for the summarization pipeline.

use crate::dispatch::DispatchError;
use crate::metrics::MetricsSnapshot;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Summary style requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryKind {
    /// Two to three paragraphs focused on the main points.
    Brief,
    /// Key points rendered as bullets.
    BulletPoints,
    /// Detailed coverage of all major topics.
    Comprehensive,
}

impl Default for SummaryKind {
    fn default() -> Self {
        Self::Comprehensive
    }
}

/// Document context used to answer a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionContext {
    /// Full document text, truncated to the prompt budget.
    Full,
    /// The cached comprehensive summary, when one exists.
    Summary,
}

impl Default for QuestionContext {
    fn default() -> Self {
        Self::Full
    }
}

/// Errors emitted by the summarization service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No document is stored under the requested identifier.
    #[error("document not found")]
    DocumentNotFound,
    /// The supplied text was too short to summarize after cleanup.
    #[error("document contains insufficient text content")]
    InsufficientText,
    /// The question body was empty.
    #[error("question must not be empty")]
    EmptyQuestion,
    /// Every chunk of the document failed to summarize.
    #[error("failed to process any document section: {0}")]
    NoSectionSucceeded(String),
    /// The dispatch queue reported a terminal failure.
    #[error("generation failed: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Metadata returned after a document is accepted.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    /// Identifier assigned to the stored document.
    pub id: Uuid,
    /// Caller-supplied display name.
    pub name: String,
    /// Cleaned text length in characters.
    pub text_length: usize,
    /// Rough token estimate for the cleaned text.
    pub estimated_tokens: usize,
    /// RFC3339 upload timestamp.
    pub uploaded_at: String,
}

/// Result of a summary request.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryOutcome {
    /// Generated (or cached) summary text.
    pub summary: String,
    /// Style that was produced.
    pub kind: SummaryKind,
    /// Whether the summary was served from the per-document cache.
    pub from_cache: bool,
    /// Number of chunks processed (zero on cache hits).
    pub chunks_processed: usize,
}

/// Result of a question request.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    /// Generated answer text.
    pub answer: String,
    /// Context mode that was actually used.
    pub context: QuestionContext,
}

/// Listing entry for a stored document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    /// Document identifier.
    pub id: Uuid,
    /// Caller-supplied display name.
    pub name: String,
    /// RFC3339 upload timestamp.
    pub uploaded_at: String,
    /// Cleaned text length in characters.
    pub text_length: usize,
    /// Rough token estimate for the cleaned text.
    pub estimated_tokens: usize,
    /// Whether any summary has been cached for this document.
    pub has_summary: bool,
}

/// Operational snapshot exposed on the status surface.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    /// Items currently queued for dispatch.
    pub queue_depth: usize,
    /// Documents currently stored.
    pub total_documents: usize,
    /// Ordered backend model list.
    pub models: Vec<String>,
    /// Service counters.
    pub metrics: MetricsSnapshot,
}
