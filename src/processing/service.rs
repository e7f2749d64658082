//! Summary service coordinating storage, chunking, and dispatch.

use crate::dispatch::{ChatMessage, Dispatcher, GenerationRequest};
use crate::metrics::ServiceMetrics;
use crate::processing::prompts::{
    COMBINE_SYSTEM_PROMPT, QUESTION_SYSTEM_PROMPT, SUMMARY_SYSTEM_PROMPT, chunk_prompt,
    combine_prompt, question_prompt,
};
use crate::processing::text::{chunk_text, determine_chunk_size, estimate_tokens, preprocess_text};
use crate::processing::types::{
    AnswerOutcome, DocumentInfo, IngestOutcome, QuestionContext, ServiceError, StatusSnapshot,
    SummaryKind, SummaryOutcome,
};
use crate::store::DocumentStore;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Minimum cleaned-text length accepted for ingestion.
const MIN_DOCUMENT_CHARS: usize = 100;
/// Token budget for one per-section summary call.
const SECTION_SUMMARY_MAX_TOKENS: u32 = 1_000;
/// Token budget for the combine pass over section summaries.
const COMBINED_SUMMARY_MAX_TOKENS: u32 = 1_500;
/// Token budget for a question answer.
const ANSWER_MAX_TOKENS: u32 = 1_000;
/// Character budget for document context embedded in a question prompt.
const QUESTION_CONTEXT_CHARS: usize = 12_000;

/// Coordinates the full pipeline: cleanup, chunking, dispatch, and caching.
///
/// The service owns long-lived handles to the document store, the dispatch
/// queue, and the metrics registry. Construct it once near process start and
/// share it through an `Arc`.
pub struct SummaryService {
    store: Arc<DocumentStore>,
    dispatcher: Dispatcher,
    metrics: Arc<ServiceMetrics>,
    models: Vec<String>,
    chunk_size_override: Option<usize>,
}

/// Abstraction over the summarization pipeline used by the HTTP surface.
#[async_trait]
pub trait SummaryApi: Send + Sync {
    /// Clean and store a document, returning its metadata.
    async fn ingest(&self, name: String, text: String) -> Result<IngestOutcome, ServiceError>;

    /// Produce (or serve from cache) a summary of the requested style.
    async fn summarize(&self, id: Uuid, kind: SummaryKind)
    -> Result<SummaryOutcome, ServiceError>;

    /// Answer a question against the stored document.
    async fn answer(
        &self,
        id: Uuid,
        question: &str,
        context: QuestionContext,
    ) -> Result<AnswerOutcome, ServiceError>;

    /// Enumerate stored documents.
    async fn list_documents(&self) -> Vec<DocumentInfo>;

    /// Remove a stored document.
    async fn delete_document(&self, id: Uuid) -> Result<(), ServiceError>;

    /// Operational snapshot for the status surface.
    async fn status(&self) -> StatusSnapshot;
}

impl SummaryService {
    /// Build a new summary service over the given store and dispatcher.
    pub fn new(
        store: Arc<DocumentStore>,
        dispatcher: Dispatcher,
        metrics: Arc<ServiceMetrics>,
        models: Vec<String>,
        chunk_size_override: Option<usize>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            metrics,
            models,
            chunk_size_override,
        }
    }

    async fn summarize_sections(
        &self,
        kind: SummaryKind,
        chunks: &[String],
    ) -> Result<String, ServiceError> {
        let mut sections = Vec::with_capacity(chunks.len());
        let mut last_error: Option<String> = None;

        for (index, chunk) in chunks.iter().enumerate() {
            let request = GenerationRequest::new(
                vec![
                    ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
                    ChatMessage::user(chunk_prompt(kind, chunk)),
                ],
                SECTION_SUMMARY_MAX_TOKENS,
            );
            match self.dispatcher.submit(request).await {
                Ok(completion) => {
                    tracing::debug!(
                        section = index + 1,
                        total = chunks.len(),
                        backend = %completion.backend,
                        "Section summarized"
                    );
                    sections.push(completion.text);
                }
                // One failed section does not sink the document.
                Err(error) => {
                    tracing::warn!(
                        section = index + 1,
                        total = chunks.len(),
                        error = %error,
                        "Failed to summarize section"
                    );
                    last_error = Some(error.to_string());
                }
            }
        }

        if sections.is_empty() {
            return Err(ServiceError::NoSectionSucceeded(
                last_error.unwrap_or_else(|| "no sections produced".to_string()),
            ));
        }

        if sections.len() == 1 {
            return Ok(sections.swap_remove(0));
        }

        let combined = sections.join("\n\n---\n\n");
        let request = GenerationRequest::new(
            vec![
                ChatMessage::system(COMBINE_SYSTEM_PROMPT),
                ChatMessage::user(combine_prompt(kind, &combined)),
            ],
            COMBINED_SUMMARY_MAX_TOKENS,
        );
        Ok(self.dispatcher.submit(request).await?.text)
    }
}

#[async_trait]
impl SummaryApi for SummaryService {
    async fn ingest(&self, name: String, text: String) -> Result<IngestOutcome, ServiceError> {
        let cleaned = preprocess_text(&text);
        if cleaned.len() < MIN_DOCUMENT_CHARS {
            return Err(ServiceError::InsufficientText);
        }

        let estimated_tokens = estimate_tokens(&cleaned);
        let text_length = cleaned.len();
        let id = self.store.insert(name.clone(), cleaned, estimated_tokens).await;
        let uploaded_at = self.store.uploaded_at(id).await.unwrap_or_default();
        self.metrics.record_document();
        tracing::info!(%id, name = %name, text_length, estimated_tokens, "Document stored");

        Ok(IngestOutcome {
            id,
            name,
            text_length,
            estimated_tokens,
            uploaded_at,
        })
    }

    async fn summarize(
        &self,
        id: Uuid,
        kind: SummaryKind,
    ) -> Result<SummaryOutcome, ServiceError> {
        let record = self
            .store
            .fetch(id)
            .await
            .ok_or(ServiceError::DocumentNotFound)?;

        if let Some(cached) = record.summary(kind) {
            tracing::debug!(%id, ?kind, "Serving cached summary");
            return Ok(SummaryOutcome {
                summary: cached.to_string(),
                kind,
                from_cache: true,
                chunks_processed: 0,
            });
        }

        let chunk_size = determine_chunk_size(record.text.len(), self.chunk_size_override);
        let chunks = chunk_text(&record.text, chunk_size);
        tracing::info!(
            %id,
            ?kind,
            chunks = chunks.len(),
            chunk_size,
            "Summarizing document"
        );

        let summary = self.summarize_sections(kind, &chunks).await?;
        self.store.store_summary(id, kind, summary.clone()).await;
        self.metrics.record_summary();

        Ok(SummaryOutcome {
            summary,
            kind,
            from_cache: false,
            chunks_processed: chunks.len(),
        })
    }

    async fn answer(
        &self,
        id: Uuid,
        question: &str,
        context: QuestionContext,
    ) -> Result<AnswerOutcome, ServiceError> {
        if question.trim().is_empty() {
            return Err(ServiceError::EmptyQuestion);
        }

        let record = self
            .store
            .fetch(id)
            .await
            .ok_or(ServiceError::DocumentNotFound)?;

        // Fall back to full text when no comprehensive summary is cached yet.
        let (context_text, context_used) = match context {
            QuestionContext::Summary => match record.summary(SummaryKind::Comprehensive) {
                Some(summary) => (summary.to_string(), QuestionContext::Summary),
                None => (truncate_context(&record.text), QuestionContext::Full),
            },
            QuestionContext::Full => (truncate_context(&record.text), QuestionContext::Full),
        };

        let request = GenerationRequest::new(
            vec![
                ChatMessage::system(QUESTION_SYSTEM_PROMPT),
                ChatMessage::user(question_prompt(&context_text, question)),
            ],
            ANSWER_MAX_TOKENS,
        );
        let completion = self.dispatcher.submit(request).await?;
        self.metrics.record_question();
        tracing::info!(%id, context = ?context_used, backend = %completion.backend, "Question answered");

        Ok(AnswerOutcome {
            answer: completion.text,
            context: context_used,
        })
    }

    async fn list_documents(&self) -> Vec<DocumentInfo> {
        self.store
            .list()
            .await
            .into_iter()
            .map(|(id, record)| DocumentInfo {
                id,
                name: record.name.clone(),
                uploaded_at: record.uploaded_at.clone(),
                text_length: record.text.len(),
                estimated_tokens: record.estimated_tokens,
                has_summary: record.has_summary(),
            })
            .collect()
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), ServiceError> {
        if self.store.remove(id).await {
            tracing::info!(%id, "Document deleted");
            Ok(())
        } else {
            Err(ServiceError::DocumentNotFound)
        }
    }

    async fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            queue_depth: self.dispatcher.queue_depth(),
            total_documents: self.store.len().await,
            models: self.models.clone(),
            metrics: self.metrics.snapshot(),
        }
    }
}

/// Clamp question context to the prompt budget, marking the cut.
fn truncate_context(text: &str) -> String {
    if text.len() <= QUESTION_CONTEXT_CHARS {
        return text.to_string();
    }
    let mut end = QUESTION_CONTEXT_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
