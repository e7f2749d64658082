use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing service activity.
#[derive(Default)]
pub struct ServiceMetrics {
    documents_ingested: AtomicU64,
    summaries_generated: AtomicU64,
    questions_answered: AtomicU64,
    dispatch_calls: AtomicU64,
    dispatch_retries: AtomicU64,
    dispatch_failovers: AtomicU64,
}

impl ServiceMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stored document.
    pub fn record_document(&self) {
        self.documents_ingested.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed summary (cache hits excluded).
    pub fn record_summary(&self) {
        self.summaries_generated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an answered question.
    pub fn record_question(&self) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one outbound call issued by the dispatch worker.
    pub fn record_dispatch_call(&self) {
        self.dispatch_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a retry of the same backend after a transient failure.
    pub fn record_dispatch_retry(&self) {
        self.dispatch_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failover to the next backend candidate.
    pub fn record_dispatch_failover(&self) {
        self.dispatch_failovers.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_ingested: self.documents_ingested.load(Ordering::Relaxed),
            summaries_generated: self.summaries_generated.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
            dispatch_calls: self.dispatch_calls.load(Ordering::Relaxed),
            dispatch_retries: self.dispatch_retries.load(Ordering::Relaxed),
            dispatch_failovers: self.dispatch_failovers.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of service counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents accepted since startup.
    pub documents_ingested: u64,
    /// Summaries produced by the remote service (cache hits excluded).
    pub summaries_generated: u64,
    /// Questions answered against stored documents.
    pub questions_answered: u64,
    /// Outbound inference calls issued, including retries.
    pub dispatch_calls: u64,
    /// Same-backend retries after transient failures.
    pub dispatch_retries: u64,
    /// Failovers to the next backend candidate.
    pub dispatch_failovers: u64,
}
