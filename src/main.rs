use docbrief::dispatch::{BackendCandidate, Dispatcher};
use docbrief::llm::OpenAiChatClient;
use docbrief::metrics::ServiceMetrics;
use docbrief::processing::SummaryService;
use docbrief::store::DocumentStore;
use docbrief::{api, config, logging};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Ports tried in order when no explicit `SERVER_PORT` is configured.
const FALLBACK_PORTS: std::ops::RangeInclusive<u16> = 4300..=4399;

#[tokio::main]
async fn main() {
    config::init_config();
    let config = config::get_config();
    logging::init_tracing(&config.log_file);

    let metrics = Arc::new(ServiceMetrics::new());
    let client = Arc::new(OpenAiChatClient::new(
        config.api_url.clone(),
        config.api_key.clone(),
        config.request_timeout(),
    ));
    let backends: Vec<BackendCandidate> = config
        .models
        .iter()
        .cloned()
        .map(BackendCandidate::new)
        .collect();
    let dispatcher = Dispatcher::new(
        client,
        backends,
        config.retry_policy(),
        Arc::clone(&metrics),
    )
    .expect("At least one backend model must be configured");

    let service = SummaryService::new(
        Arc::new(DocumentStore::new()),
        dispatcher,
        metrics,
        config.models.clone(),
        config.chunk_size,
    );
    let app = api::create_router(Arc::new(service));

    let listener = bind_listener(config.server_port)
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("listener address");
    tracing::info!(models = config.models.len(), %addr, "Listening");
    axum::serve(listener, app).await.expect("Server error");
}

/// Bind the requested port, or walk the fallback range until a free one turns up.
async fn bind_listener(fixed_port: Option<u16>) -> Result<TcpListener, std::io::Error> {
    let candidates: Vec<u16> = match fixed_port {
        Some(port) => vec![port],
        None => FALLBACK_PORTS.collect(),
    };

    let mut last_error = None;
    for port in candidates {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => return Ok(listener),
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port taken; trying the next candidate");
                last_error = Some(err);
            }
            Err(err) => return Err(err),
        }
    }

    Err(last_error.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "every candidate port was taken",
        )
    }))
}
