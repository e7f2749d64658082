//! HTTP surface for docbrief.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /documents` – Accept extracted document text (PDF parsing happens upstream),
//!   clean it, and store it in memory. Returns the assigned id and text metadata.
//! - `GET /documents` – List stored documents.
//! - `DELETE /documents/:id` – Drop a stored document.
//! - `POST /documents/:id/summary` – Produce (or serve from cache) a summary in the
//!   requested style (`brief` | `bullet-points` | `comprehensive`).
//! - `POST /documents/:id/question` – Answer a question against the document, using
//!   either the full text or the cached comprehensive summary as context.
//! - `GET /health`, `GET /status` – Liveness plus queue depth, model list, and counters.
//!
//! Handlers are generic over [`SummaryApi`] so tests can inject a stub service.

use crate::processing::{
    QuestionContext, ServiceError, SummaryApi, SummaryKind,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Build the HTTP router exposing the summarization API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: SummaryApi + 'static,
{
    Router::new()
        .route("/health", get(health::<S>))
        .route("/status", get(get_status::<S>))
        .route(
            "/documents",
            post(ingest_document::<S>).get(list_documents::<S>),
        )
        .route("/documents/:id", delete(delete_document::<S>))
        .route("/documents/:id/summary", post(summarize_document::<S>))
        .route("/documents/:id/question", post(ask_question::<S>))
        .with_state(service)
}

/// Request body for `POST /documents`.
#[derive(Deserialize)]
struct IngestRequest {
    /// Display name for the document (typically the original filename).
    name: String,
    /// Extracted document text.
    text: String,
}

/// Request body for `POST /documents/:id/summary`.
#[derive(Deserialize, Default)]
struct SummaryRequest {
    /// Summary style; defaults to `comprehensive`.
    #[serde(default)]
    kind: SummaryKind,
}

/// Request body for `POST /documents/:id/question`.
#[derive(Deserialize)]
struct QuestionRequest {
    /// Question to answer against the document.
    question: String,
    /// Context mode; defaults to `full`.
    #[serde(default)]
    context: QuestionContext,
}

/// Response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    models: Vec<String>,
    queue_depth: usize,
}

async fn health<S>(State(service): State<Arc<S>>) -> Json<HealthResponse>
where
    S: SummaryApi,
{
    let status = service.status().await;
    Json(HealthResponse {
        status: "OK",
        models: status.models,
        queue_depth: status.queue_depth,
    })
}

async fn get_status<S>(State(service): State<Arc<S>>) -> Response
where
    S: SummaryApi,
{
    Json(service.status().await).into_response()
}

async fn ingest_document<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<IngestRequest>,
) -> Result<Response, AppError>
where
    S: SummaryApi,
{
    let outcome = service.ingest(request.name, request.text).await?;
    Ok((StatusCode::CREATED, Json(outcome)).into_response())
}

/// Response body for `GET /documents`.
#[derive(Serialize)]
struct DocumentsResponse {
    documents: Vec<crate::processing::DocumentInfo>,
}

async fn list_documents<S>(State(service): State<Arc<S>>) -> Json<DocumentsResponse>
where
    S: SummaryApi,
{
    Json(DocumentsResponse {
        documents: service.list_documents().await,
    })
}

async fn delete_document<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError>
where
    S: SummaryApi,
{
    service.delete_document(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn summarize_document<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<Uuid>,
    Json(request): Json<SummaryRequest>,
) -> Result<Response, AppError>
where
    S: SummaryApi,
{
    let outcome = service.summarize(id, request.kind).await?;
    Ok(Json(outcome).into_response())
}

async fn ask_question<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<Uuid>,
    Json(request): Json<QuestionRequest>,
) -> Result<Response, AppError>
where
    S: SummaryApi,
{
    let outcome = service
        .answer(id, &request.question, request.context)
        .await?;
    Ok(Json(outcome).into_response())
}

struct AppError(ServiceError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ServiceError::DocumentNotFound => StatusCode::NOT_FOUND,
            ServiceError::InsufficientText | ServiceError::EmptyQuestion => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::NoSectionSucceeded(_) | ServiceError::Dispatch(_) => {
                StatusCode::BAD_GATEWAY
            }
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(inner: ServiceError) -> Self {
        Self(inner)
    }
}
