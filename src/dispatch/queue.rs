//! Serialized dispatch queue with retry, backoff, and model fallback.
//!
//! All outbound inference calls flow through a single worker task so that the
//! remote service never sees two concurrent requests from this process and a
//! minimum spacing between calls is honored even across unrelated work items.
//! Each item runs the full backend-preference list: transient failures are
//! retried on the same backend under a bounded budget, permanent failures
//! advance to the next backend immediately, and only when every candidate is
//! exhausted does the caller see a terminal error.

use crate::dispatch::policy::RetryPolicy;
use crate::dispatch::types::{
    BackendCandidate, BackendError, Completion, DispatchError, GenerationRequest,
};
use crate::llm::ChatBackend;
use crate::metrics::ServiceMetrics;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep};

/// One pending call queued for the worker.
struct WorkItem {
    request: GenerationRequest,
    enqueued_at: Instant,
    // Written exactly once when the item reaches its outcome.
    result: oneshot::Sender<Result<Completion, DispatchError>>,
}

/// Handle for submitting generation work to the serialized worker.
///
/// Cloning is cheap; all clones feed the same FIFO queue. Dropping every
/// handle shuts the worker down once the queue drains.
#[derive(Clone)]
pub struct Dispatcher {
    sender: mpsc::UnboundedSender<WorkItem>,
    depth: Arc<AtomicUsize>,
}

impl Dispatcher {
    /// Spawn the worker task and return a submission handle.
    ///
    /// Returns [`DispatchError::NoBackends`] when the candidate list is empty;
    /// that is a programmer error, not a runtime condition.
    pub fn new(
        client: Arc<dyn ChatBackend>,
        backends: Vec<BackendCandidate>,
        policy: RetryPolicy,
        metrics: Arc<ServiceMetrics>,
    ) -> Result<Self, DispatchError> {
        if backends.is_empty() {
            return Err(DispatchError::NoBackends);
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let depth = Arc::new(AtomicUsize::new(0));
        let worker = Worker {
            client,
            backends,
            policy,
            metrics,
            depth: Arc::clone(&depth),
            last_request_at: None,
        };
        tokio::spawn(worker.run(receiver));

        Ok(Self { sender, depth })
    }

    /// Enqueue a request and wait for its outcome.
    ///
    /// Ordinary remote failures are encoded in the returned
    /// [`DispatchError::AllBackendsExhausted`]; they never poison the queue,
    /// and subsequent submissions are unaffected.
    pub async fn submit(&self, request: GenerationRequest) -> Result<Completion, DispatchError> {
        let (tx, rx) = oneshot::channel();
        let item = WorkItem {
            request,
            enqueued_at: Instant::now(),
            result: tx,
        };
        self.depth.fetch_add(1, Ordering::Relaxed);
        self.sender.send(item).map_err(|_| {
            self.depth.fetch_sub(1, Ordering::Relaxed);
            DispatchError::QueueClosed
        })?;
        rx.await.map_err(|_| DispatchError::QueueClosed)?
    }

    /// Number of items waiting in the queue, including the one being processed.
    pub fn queue_depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }
}

/// What the retry state machine does after a classified failure.
enum NextStep {
    RetrySameBackend(std::time::Duration),
    AdvanceBackend,
}

struct Worker {
    client: Arc<dyn ChatBackend>,
    backends: Vec<BackendCandidate>,
    policy: RetryPolicy,
    metrics: Arc<ServiceMetrics>,
    depth: Arc<AtomicUsize>,
    last_request_at: Option<Instant>,
}

impl Worker {
    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<WorkItem>) {
        while let Some(item) = receiver.recv().await {
            let waited_ms = item.enqueued_at.elapsed().as_millis() as u64;
            tracing::debug!(queued_ms = waited_ms, "Dequeued work item");

            let outcome = self.process(&item.request).await;
            self.depth.fetch_sub(1, Ordering::Relaxed);
            if item.result.send(outcome).is_err() {
                tracing::debug!("Work item submitter went away before its outcome was ready");
            }

            sleep(self.policy.inter_item_pause).await;
        }
        tracing::debug!("Dispatch queue closed; worker exiting");
    }

    /// Run one work item through the backend-preference list.
    async fn process(&mut self, request: &GenerationRequest) -> Result<Completion, DispatchError> {
        let mut total_calls = 0u32;
        let mut last_failure: Option<(String, String)> = None;

        'backends: for (index, backend) in self.backends.iter().enumerate() {
            for attempt in 0..=self.policy.max_retries_per_backend {
                self.pace().await;
                let call = self.client.generate(&backend.model, request).await;
                self.last_request_at = Some(Instant::now());
                total_calls += 1;
                self.metrics.record_dispatch_call();

                let error = match call {
                    Ok(text) => {
                        tracing::info!(
                            backend = %backend.model,
                            attempt = attempt + 1,
                            "Generation succeeded"
                        );
                        return Ok(Completion {
                            text,
                            backend: backend.model.clone(),
                            attempts: total_calls,
                        });
                    }
                    Err(error) => error,
                };

                let budget_left = attempt < self.policy.max_retries_per_backend;
                let step = match &error {
                    BackendError::RateLimited { retry_after, .. } if budget_left => {
                        let wait = match retry_after {
                            Some(hint) => self.policy.cap_hint(*hint),
                            None => self.policy.backoff_delay(attempt),
                        };
                        tracing::warn!(
                            backend = %backend.model,
                            attempt = attempt + 1,
                            wait_ms = wait.as_millis() as u64,
                            hinted = retry_after.is_some(),
                            "Rate limited; backing off"
                        );
                        NextStep::RetrySameBackend(wait)
                    }
                    BackendError::Timeout | BackendError::Transport(_) if budget_left => {
                        tracing::warn!(
                            backend = %backend.model,
                            attempt = attempt + 1,
                            error = %error,
                            "Transient transport failure; retrying"
                        );
                        NextStep::RetrySameBackend(self.policy.transport_retry_delay)
                    }
                    BackendError::Permanent(_) => {
                        tracing::warn!(
                            backend = %backend.model,
                            error = %error,
                            "Permanent backend error; failing over"
                        );
                        NextStep::AdvanceBackend
                    }
                    _ => {
                        tracing::warn!(
                            backend = %backend.model,
                            error = %error,
                            "Attempt budget exhausted; failing over"
                        );
                        NextStep::AdvanceBackend
                    }
                };

                last_failure = Some((backend.model.clone(), error.to_string()));
                match step {
                    NextStep::RetrySameBackend(wait) => {
                        self.metrics.record_dispatch_retry();
                        sleep(wait).await;
                    }
                    NextStep::AdvanceBackend => {
                        if index + 1 < self.backends.len() {
                            self.metrics.record_dispatch_failover();
                        }
                        continue 'backends;
                    }
                }
            }
        }

        let (backend, message) = last_failure
            .expect("at least one backend attempt is made before exhaustion");
        tracing::error!(backend = %backend, error = %message, "All backends exhausted");
        Err(DispatchError::AllBackendsExhausted { backend, message })
    }

    /// Suspend until the minimum inter-request spacing has passed.
    async fn pace(&self) {
        if let Some(last) = self.last_request_at {
            let elapsed = last.elapsed();
            if elapsed < self.policy.min_request_interval {
                sleep(self.policy.min_request_interval - elapsed).await;
            }
        }
    }
}
