//! Volatile in-memory document storage.
//!
//! The original design keeps extracted text and cached summaries only for the
//! process lifetime; persistence is deliberately out of scope. The store is an
//! explicit object owned by the hosting service and injected into handlers
//! rather than held as ambient state.

use crate::processing::SummaryKind;
use std::collections::HashMap;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One stored document with its cached summaries.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    /// Caller-supplied display name.
    pub name: String,
    /// Cleaned document text.
    pub text: String,
    /// RFC3339 upload timestamp.
    pub uploaded_at: String,
    /// Rough token estimate for the cleaned text.
    pub estimated_tokens: usize,
    summaries: HashMap<SummaryKind, String>,
}

impl DocumentRecord {
    /// Whether any summary has been cached for this document.
    pub fn has_summary(&self) -> bool {
        !self.summaries.is_empty()
    }

    /// Cached summary of the given kind, if present.
    pub fn summary(&self, kind: SummaryKind) -> Option<&str> {
        self.summaries.get(&kind).map(String::as_str)
    }
}

/// Thread-safe in-memory document store.
#[derive(Default)]
pub struct DocumentStore {
    documents: RwLock<HashMap<Uuid, DocumentRecord>>,
}

impl DocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document and return its generated identifier.
    pub async fn insert(&self, name: String, text: String, estimated_tokens: usize) -> Uuid {
        let id = Uuid::new_v4();
        let record = DocumentRecord {
            name,
            text,
            uploaded_at: current_timestamp_rfc3339(),
            estimated_tokens,
            summaries: HashMap::new(),
        };
        self.documents.write().await.insert(id, record);
        id
    }

    /// Fetch a clone of the stored record.
    pub async fn fetch(&self, id: Uuid) -> Option<DocumentRecord> {
        self.documents.read().await.get(&id).cloned()
    }

    /// Fetch the upload timestamp for a freshly stored document.
    pub async fn uploaded_at(&self, id: Uuid) -> Option<String> {
        self.documents
            .read()
            .await
            .get(&id)
            .map(|record| record.uploaded_at.clone())
    }

    /// Cached summary of the given kind, if present.
    pub async fn cached_summary(&self, id: Uuid, kind: SummaryKind) -> Option<String> {
        self.documents
            .read()
            .await
            .get(&id)
            .and_then(|record| record.summary(kind).map(str::to_string))
    }

    /// Cache a summary under the document. Returns `false` when the document
    /// was removed in the meantime.
    pub async fn store_summary(&self, id: Uuid, kind: SummaryKind, summary: String) -> bool {
        match self.documents.write().await.get_mut(&id) {
            Some(record) => {
                record.summaries.insert(kind, summary);
                true
            }
            None => false,
        }
    }

    /// Enumerate stored documents as `(id, record)` pairs.
    pub async fn list(&self) -> Vec<(Uuid, DocumentRecord)> {
        let guard = self.documents.read().await;
        let mut entries: Vec<(Uuid, DocumentRecord)> = guard
            .iter()
            .map(|(id, record)| (*id, record.clone()))
            .collect();
        entries.sort_by(|a, b| a.1.uploaded_at.cmp(&b.1.uploaded_at));
        entries
    }

    /// Remove a document. Returns `false` when it was not present.
    pub async fn remove(&self, id: Uuid) -> bool {
        self.documents.write().await.remove(&id).is_some()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether the store holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("RFC3339 formatting of the current time cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_fetch_and_remove_round_trip() {
        let store = DocumentStore::new();
        let id = store
            .insert("report.pdf".into(), "Cleaned text body.".into(), 5)
            .await;

        let record = store.fetch(id).await.expect("stored record");
        assert_eq!(record.name, "report.pdf");
        assert_eq!(record.estimated_tokens, 5);
        assert!(!record.has_summary());

        assert!(store.remove(id).await);
        assert!(!store.remove(id).await);
        assert!(store.fetch(id).await.is_none());
    }

    #[tokio::test]
    async fn summary_cache_is_keyed_by_kind() {
        let store = DocumentStore::new();
        let id = store.insert("doc".into(), "text".into(), 1).await;

        assert!(store.cached_summary(id, SummaryKind::Brief).await.is_none());
        assert!(
            store
                .store_summary(id, SummaryKind::Brief, "short".into())
                .await
        );

        assert_eq!(
            store.cached_summary(id, SummaryKind::Brief).await.as_deref(),
            Some("short")
        );
        assert!(
            store
                .cached_summary(id, SummaryKind::Comprehensive)
                .await
                .is_none()
        );
        assert!(store.fetch(id).await.expect("record").has_summary());
    }

    #[tokio::test]
    async fn storing_summary_for_missing_document_is_rejected() {
        let store = DocumentStore::new();
        assert!(
            !store
                .store_summary(Uuid::new_v4(), SummaryKind::Brief, "orphan".into())
                .await
        );
    }
}
