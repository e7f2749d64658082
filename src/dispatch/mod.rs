//! Rate-limited, retrying, multi-backend dispatch queue.
//!
//! Callers hand a [`GenerationRequest`] to the [`Dispatcher`] and await its
//! outcome. A single worker drains the queue in submission order, paces
//! consecutive remote calls, retries rate limits with exponential backoff or
//! server wait hints, and falls over across the configured model list.

mod policy;
mod queue;
mod types;

pub use policy::RetryPolicy;
pub use queue::Dispatcher;
pub use types::{
    BackendCandidate, BackendError, ChatMessage, Completion, DispatchError, GenerationRequest,
};
