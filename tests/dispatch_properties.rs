//! Behavioral tests for the dispatch queue: ordering, pacing, backoff,
//! failover, and exhaustion, driven by a scripted backend under a paused
//! clock so every wait is observed exactly.

use async_trait::async_trait;
use docbrief::dispatch::{
    BackendCandidate, BackendError, ChatMessage, DispatchError, Dispatcher, GenerationRequest,
    RetryPolicy,
};
use docbrief::llm::ChatBackend;
use docbrief::metrics::ServiceMetrics;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Scripted response for one backend call.
#[derive(Clone, Copy)]
enum Step {
    Succeed,
    RateLimitedWithHint(u64),
    RateLimited,
    Timeout,
    Permanent,
}

/// Recorded outbound call.
#[derive(Clone)]
struct Call {
    model: String,
    prompt: String,
    at: Instant,
}

struct ScriptedBackend {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedBackend {
    fn new(scripts: &[(&str, &[Step])]) -> Arc<Self> {
        let scripts = scripts
            .iter()
            .map(|(model, steps)| ((*model).to_string(), steps.iter().copied().collect()))
            .collect();
        Arc::new(Self {
            scripts: Mutex::new(scripts),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_to(&self, model: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.model == model)
            .collect()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<String, BackendError> {
        self.calls.lock().unwrap().push(Call {
            model: model.to_string(),
            prompt: request.messages.last().map(|m| m.content.clone()).unwrap_or_default(),
            at: Instant::now(),
        });
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(model)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Step::Permanent);
        match step {
            Step::Succeed => Ok(format!("{model} output")),
            Step::RateLimitedWithHint(secs) => Err(BackendError::RateLimited {
                retry_after: Some(Duration::from_secs(secs)),
                message: format!("Rate limit reached. Please try again in {secs}s."),
            }),
            Step::RateLimited => Err(BackendError::RateLimited {
                retry_after: None,
                message: "rate limit reached".into(),
            }),
            Step::Timeout => Err(BackendError::Timeout),
            Step::Permanent => Err(BackendError::Permanent("400: bad request".into())),
        }
    }
}

fn policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries_per_backend: max_retries,
        base_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(60),
        backoff_multiplier: 2.0,
        min_request_interval: Duration::from_millis(100),
        transport_retry_delay: Duration::from_secs(2),
        inter_item_pause: Duration::from_millis(50),
    }
}

fn dispatcher(
    backend: Arc<ScriptedBackend>,
    models: &[&str],
    policy: RetryPolicy,
) -> Dispatcher {
    Dispatcher::new(
        backend,
        models.iter().map(|model| BackendCandidate::new(*model)).collect(),
        policy,
        Arc::new(ServiceMetrics::new()),
    )
    .expect("dispatcher")
}

fn request(tag: &str) -> GenerationRequest {
    GenerationRequest::new(vec![ChatMessage::user(tag)], 100)
}

// Slack for paused-clock comparisons; sleeps auto-advance exactly, so this
// only absorbs the odd timer-granularity millisecond.
const SLOP: Duration = Duration::from_millis(10);

#[tokio::test(start_paused = true)]
async fn first_call_success_returns_immediately() {
    let backend = ScriptedBackend::new(&[("model-a", &[Step::Succeed][..])]);
    let queue = dispatcher(Arc::clone(&backend), &["model-a"], policy(5));

    let completion = queue.submit(request("hello")).await.expect("completion");
    assert_eq!(completion.text, "model-a output");
    assert_eq!(completion.backend, "model-a");
    assert_eq!(completion.attempts, 1);
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn items_are_processed_in_submission_order() {
    let backend = ScriptedBackend::new(&[("model-a", &[Step::Succeed, Step::Succeed][..])]);
    let queue = dispatcher(Arc::clone(&backend), &["model-a"], policy(5));

    let (first, second) = tokio::join!(queue.submit(request("first")), queue.submit(request("second")));
    first.expect("first completion");
    second.expect("second completion");

    let prompts: Vec<String> = backend.calls().iter().map(|call| call.prompt.clone()).collect();
    assert_eq!(prompts, vec!["first".to_string(), "second".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn consecutive_calls_honor_minimum_interval() {
    let backend = ScriptedBackend::new(&[("model-a", &[Step::Succeed, Step::Succeed][..])]);
    let queue = dispatcher(Arc::clone(&backend), &["model-a"], policy(5));

    queue.submit(request("one")).await.expect("first");
    queue.submit(request("two")).await.expect("second");

    let calls = backend.calls();
    assert_eq!(calls.len(), 2);
    let gap = calls[1].at - calls[0].at;
    assert!(gap >= Duration::from_millis(100), "gap was {gap:?}");
}

#[tokio::test(start_paused = true)]
async fn server_hint_overrides_computed_backoff() {
    let backend = ScriptedBackend::new(&[(
        "model-a",
        &[Step::RateLimitedWithHint(2), Step::Succeed][..],
    )]);
    let queue = dispatcher(Arc::clone(&backend), &["model-a"], policy(5));

    let completion = queue.submit(request("hint")).await.expect("completion");
    assert_eq!(completion.attempts, 2);

    let calls = backend.calls();
    let gap = calls[1].at - calls[0].at;
    assert!(gap >= Duration::from_secs(2), "gap was {gap:?}");
    assert!(gap < Duration::from_secs(2) + SLOP, "gap was {gap:?}");
}

#[tokio::test(start_paused = true)]
async fn backoff_without_hint_grows_per_attempt() {
    let backend = ScriptedBackend::new(&[(
        "model-a",
        &[Step::RateLimited, Step::RateLimited, Step::Succeed][..],
    )]);
    let queue = dispatcher(Arc::clone(&backend), &["model-a"], policy(5));

    queue.submit(request("backoff")).await.expect("completion");

    let calls = backend.calls();
    assert_eq!(calls.len(), 3);
    let first_gap = calls[1].at - calls[0].at;
    let second_gap = calls[2].at - calls[1].at;
    assert!(first_gap >= Duration::from_secs(1) && first_gap < Duration::from_secs(1) + SLOP);
    assert!(second_gap >= Duration::from_secs(2) && second_gap < Duration::from_secs(2) + SLOP);
    assert!(second_gap >= first_gap);
}

#[tokio::test(start_paused = true)]
async fn oversized_hint_is_capped_at_max_delay() {
    let backend = ScriptedBackend::new(&[(
        "model-a",
        &[Step::RateLimitedWithHint(120), Step::Succeed][..],
    )]);
    let mut capped = policy(5);
    capped.max_delay = Duration::from_secs(5);
    let queue = dispatcher(Arc::clone(&backend), &["model-a"], capped);

    queue.submit(request("capped")).await.expect("completion");

    let calls = backend.calls();
    let gap = calls[1].at - calls[0].at;
    assert!(gap >= Duration::from_secs(5) && gap < Duration::from_secs(5) + SLOP);
}

#[tokio::test(start_paused = true)]
async fn timeout_retries_after_fixed_delay() {
    let backend = ScriptedBackend::new(&[("model-a", &[Step::Timeout, Step::Succeed][..])]);
    let queue = dispatcher(Arc::clone(&backend), &["model-a"], policy(5));

    let completion = queue.submit(request("timeout")).await.expect("completion");
    assert_eq!(completion.attempts, 2);

    let calls = backend.calls();
    let gap = calls[1].at - calls[0].at;
    assert!(gap >= Duration::from_secs(2) && gap < Duration::from_secs(2) + SLOP);
}

#[tokio::test(start_paused = true)]
async fn permanent_error_fails_over_and_resets_the_attempt_counter() {
    let backend = ScriptedBackend::new(&[
        ("model-a", &[Step::RateLimited, Step::RateLimited, Step::RateLimited][..]),
        ("model-b", &[Step::RateLimited, Step::Succeed][..]),
    ]);
    let queue = dispatcher(Arc::clone(&backend), &["model-a", "model-b"], policy(2));

    let completion = queue.submit(request("failover")).await.expect("completion");
    assert_eq!(completion.backend, "model-b");

    // model-a exhausts its budget of three calls with 1s then 2s waits.
    assert_eq!(backend.calls_to("model-a").len(), 3);

    // model-b starts over: its retry wait is the base delay again, not the
    // continuation of model-a's backoff curve.
    let b_calls = backend.calls_to("model-b");
    assert_eq!(b_calls.len(), 2);
    let gap = b_calls[1].at - b_calls[0].at;
    assert!(gap >= Duration::from_secs(1) && gap < Duration::from_secs(1) + SLOP);
}

#[tokio::test(start_paused = true)]
async fn budget_exhaustion_advances_past_a_backend_that_would_eventually_succeed() {
    // Budget of 1 retry = two calls per backend. The third call that would
    // have succeeded on model-a must never happen.
    let backend = ScriptedBackend::new(&[
        (
            "model-a",
            &[
                Step::RateLimitedWithHint(2),
                Step::RateLimitedWithHint(2),
                Step::Succeed,
            ][..],
        ),
        ("model-b", &[Step::Succeed][..]),
        ("model-c", &[Step::Succeed][..]),
    ]);
    let queue = dispatcher(
        Arc::clone(&backend),
        &["model-a", "model-b", "model-c"],
        policy(1),
    );

    let completion = queue.submit(request("budget")).await.expect("completion");
    assert_eq!(completion.backend, "model-b");
    assert_eq!(backend.calls_to("model-a").len(), 2);
    assert_eq!(backend.calls_to("model-b").len(), 1);
    assert!(backend.calls_to("model-c").is_empty());
}

#[tokio::test(start_paused = true)]
async fn permanent_errors_do_not_consume_the_attempt_budget() {
    let backend = ScriptedBackend::new(&[
        ("model-a", &[Step::Permanent][..]),
        ("model-b", &[Step::Succeed][..]),
    ]);
    let queue = dispatcher(Arc::clone(&backend), &["model-a", "model-b"], policy(5));

    let completion = queue.submit(request("permanent")).await.expect("completion");
    assert_eq!(completion.backend, "model-b");
    assert_eq!(backend.calls_to("model-a").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausting_every_backend_reports_the_last_error() {
    let backend = ScriptedBackend::new(&[
        ("model-a", &[Step::Permanent][..]),
        ("model-b", &[Step::Permanent][..]),
        ("model-c", &[Step::Permanent][..]),
    ]);
    let queue = dispatcher(
        Arc::clone(&backend),
        &["model-a", "model-b", "model-c"],
        policy(5),
    );

    let error = queue.submit(request("doomed")).await.expect_err("exhaustion");
    match error {
        DispatchError::AllBackendsExhausted { backend: last, message } => {
            assert_eq!(last, "model-c");
            assert!(message.contains("400"));
        }
        other => panic!("expected AllBackendsExhausted, got {other:?}"),
    }
    assert_eq!(backend.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn a_terminal_failure_does_not_poison_later_submissions() {
    let backend = ScriptedBackend::new(&[("model-a", &[Step::Permanent, Step::Succeed][..])]);
    let queue = dispatcher(Arc::clone(&backend), &["model-a"], policy(5));

    queue
        .submit(request("first"))
        .await
        .expect_err("first item exhausts the only backend");
    let completion = queue.submit(request("second")).await.expect("second item");
    assert_eq!(completion.backend, "model-a");
}

#[tokio::test(start_paused = true)]
async fn empty_backend_list_is_rejected_at_construction() {
    let backend = ScriptedBackend::new(&[]);
    let result = Dispatcher::new(
        backend,
        Vec::new(),
        policy(5),
        Arc::new(ServiceMetrics::new()),
    );
    assert!(matches!(result, Err(DispatchError::NoBackends)));
}
