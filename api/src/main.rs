// ./api/src/main.rs
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use application::{
    ApplicationError, DocumentService, SaveDocumentRequest, SearchRequest, StatsService,
};
use infrastructure::InMemoryDocumentRepository;

mod config;

use config::ServerConfig;

#[derive(Clone)]
struct AppState {
    document_service: Arc<DocumentService>,
    stats_service: Arc<StatsService>,
}

// Application entry point
#[tokio::main]
async fn main() {
    // --- Logger Initialization ---
    let filter: EnvFilter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
    info!("Logger initialized successfully.");

    let config = ServerConfig::from_env();

    // --- Dependency Injection ---
    let document_repository = Arc::new(InMemoryDocumentRepository::new());
    info!("In-memory document repository initialized.");

    let app_state = AppState {
        document_service: Arc::new(DocumentService::new(document_repository.clone())),
        stats_service: Arc::new(StatsService::new(document_repository)),
    };
    info!("Application services initialized.");

    let app = router(app_state);
    info!("API routes configured.");

    // --- Server Startup ---
    let addr = config.socket_addr();
    info!("Server starting on {}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            info!("Server listening on {}", addr);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app.into_make_service()).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats_handler))
        .route("/documents", post(save_document_handler))
        .route("/documents/search", post(search_documents_handler))
        .route("/documents/:doc_id", get(get_document_handler))
        .with_state(app_state)
}

// --- API Handlers ---

async fn health_check() -> impl IntoResponse {
    info!("Health check endpoint called");
    (StatusCode::OK, "OK")
}

/// Handler for saving a document (POST /documents). Inserts when `id` is omitted.
async fn save_document_handler(
    State(state): State<AppState>,
    Json(payload): Json<SaveDocumentRequest>,
) -> Response {
    let is_insert = payload.id.is_none();
    info!(doc_id = ?payload.id, "Received request to save document");
    match state.document_service.save_document(payload).await {
        Ok(document) => {
            let status = if is_insert {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, Json(document)).into_response()
        }
        Err(e) => {
            error!("Failed to save document via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler for fetching a document (GET /documents/:doc_id).
async fn get_document_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Response {
    info!(doc_id = %doc_id, "Received request to get document");
    match state.document_service.get_document(&doc_id).await {
        Ok(document) => (StatusCode::OK, Json(document)).into_response(),
        Err(e) => map_application_error_to_response(e),
    }
}

/// Handler for searching documents (POST /documents/search).
/// A JSON `null` body means "no constraints".
async fn search_documents_handler(
    State(state): State<AppState>,
    Json(request): Json<Option<SearchRequest>>,
) -> Response {
    info!(has_request = request.is_some(), "Received search request");
    match state.document_service.search_documents(request).await {
        Ok(response) => {
            info!("Search completed successfully via handler, {} total hits", response.total);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!("Failed to search documents via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

async fn get_stats_handler(State(state): State<AppState>) -> Response {
    info!("Received request to get statistics");
    match state.stats_service.get_stats().await {
        Ok(stats_response) => (StatusCode::OK, Json(stats_response)).into_response(),
        Err(e) => {
            error!("Failed to get statistics via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Maps ApplicationError to an HTTP status code and response body.
fn map_application_error_to_response(err: ApplicationError) -> Response {
    let (status, body) = match err {
        ApplicationError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            format!("Document '{}' not found", id),
        ),
        ApplicationError::DomainError(domain_err) => {
            warn!("Domain validation failed: {}", domain_err);
            (StatusCode::BAD_REQUEST, domain_err.to_string())
        }
    };
    (status, body).into_response()
}
