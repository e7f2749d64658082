//! Document processing pipeline: cleanup, chunking, prompts, and the
//! summary service orchestrating dispatch.

mod prompts;
mod service;
mod text;
mod types;

pub use service::{SummaryApi, SummaryService};
pub use types::{
    AnswerOutcome, DocumentInfo, IngestOutcome, QuestionContext, ServiceError, StatusSnapshot,
    SummaryKind, SummaryOutcome,
};
