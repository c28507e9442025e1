use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Author, Document, DocumentFilter, DocumentId, DomainError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

// --- Application Errors ---
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Domain validation error: {0}")]
    DomainError(#[from] DomainError), // Propagate domain errors cleanly
}

// --- Infrastructure Interfaces (Traits) ---

/// Interface for storing and retrieving documents.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Upserts a document. Without an id a fresh identity and creation time are
    /// assigned; with an id the document is stored as given under that id.
    /// Returns the record now stored.
    async fn save(&self, document: Document) -> Result<Document, ApplicationError>;
    /// Exact-key lookup. Absence is `Ok(None)`, not an error.
    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, ApplicationError>;
    /// Returns every stored document the filter accepts; `None` returns all of them.
    async fn search(
        &self,
        filter: Option<&DocumentFilter>,
    ) -> Result<Vec<Document>, ApplicationError>;
    /// Number of stored documents.
    async fn count(&self) -> Result<usize, ApplicationError>;
}

// --- Request/Response Models (Data Transfer Objects - DTOs) ---

/// Request to save a document. Omitting `id` inserts a new document.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SaveDocumentRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub author: Author,
    /// Only meaningful on update; ignored when `id` is absent.
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

impl SaveDocumentRequest {
    pub fn into_document(self) -> Result<Document, DomainError> {
        let mut document = Document::new(self.title, self.content, self.author);
        if let Some(id) = self.id {
            document = document.with_id(DocumentId::parse(id)?);
        }
        if let Some(created) = self.created {
            document = document.with_created(created);
        }
        Ok(document)
    }
}

/// Search constraints as received from callers. Every field is optional and an
/// empty list means the same as an absent one.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
    pub title_prefixes: Option<Vec<String>>,
    pub contains_contents: Option<Vec<String>>,
    pub author_ids: Option<Vec<String>>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

impl SearchRequest {
    pub fn into_filter(self) -> DocumentFilter {
        DocumentFilter::any()
            .with_title_prefixes(self.title_prefixes.unwrap_or_default())
            .with_contains_contents(self.contains_contents.unwrap_or_default())
            .with_author_ids(self.author_ids.unwrap_or_default())
            .with_created_from(self.created_from)
            .with_created_to(self.created_to)
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// All matching documents.
    pub documents: Vec<Document>,
    /// Number of matching documents.
    pub total: usize,
    /// Time taken by the search operation in milliseconds.
    pub processing_time_ms: u128,
}

/// Response for the /stats endpoint.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_documents: usize,
}

// --- Application Services (Use Cases) ---

/// Service exposing save / find-by-id / search over a document repository.
pub struct DocumentService {
    doc_repo: Arc<dyn DocumentRepository>,
}

impl DocumentService {
    pub fn new(doc_repo: Arc<dyn DocumentRepository>) -> Self {
        Self { doc_repo }
    }

    #[instrument(skip(self, request), fields(doc_id = ?request.id))]
    pub async fn save_document(
        &self,
        request: SaveDocumentRequest,
    ) -> Result<Document, ApplicationError> {
        info!("Attempting to save document");
        let is_insert = request.id.is_none();

        // DomainError will be converted to ApplicationError::DomainError
        let document = request.into_document()?;

        let saved = self.doc_repo.save(document).await.map_err(|e| {
            error!("Failed to save document to repository: {}", e);
            e
        })?;
        info!(
            doc_id = ?saved.id().map(DocumentId::as_str),
            inserted = is_insert,
            "Document saved successfully"
        );
        Ok(saved)
    }

    /// Looks a document up by id. An unknown id is a successful `None`.
    #[instrument(skip(self))]
    pub async fn find_document(&self, id: &str) -> Result<Option<Document>, ApplicationError> {
        debug!("Looking up document");
        // A blank id can never have been stored.
        let Ok(doc_id) = DocumentId::parse(id) else {
            return Ok(None);
        };
        self.doc_repo.find_by_id(&doc_id).await
    }

    /// Like `find_document`, but absence becomes `ApplicationError::NotFound`.
    #[instrument(skip(self))]
    pub async fn get_document(&self, id: &str) -> Result<Document, ApplicationError> {
        self.find_document(id).await?.ok_or_else(|| {
            warn!(doc_id = %id, "Document not found");
            ApplicationError::NotFound(id.to_string())
        })
    }

    #[instrument(skip(self, request), fields(has_request = request.is_some()))]
    pub async fn search_documents(
        &self,
        request: Option<SearchRequest>,
    ) -> Result<SearchResponse, ApplicationError> {
        info!("Attempting to search documents");
        let start_time = Instant::now();

        let filter = request.map(SearchRequest::into_filter);
        let documents = self.doc_repo.search(filter.as_ref()).await?;

        let processing_time_ms = start_time.elapsed().as_millis();
        info!(
            total_hits = documents.len(),
            time_ms = processing_time_ms,
            "Search successful"
        );

        Ok(SearchResponse {
            total: documents.len(),
            documents,
            processing_time_ms,
        })
    }
}

pub struct StatsService {
    doc_repo: Arc<dyn DocumentRepository>,
}

impl StatsService {
    pub fn new(doc_repo: Arc<dyn DocumentRepository>) -> Self {
        Self { doc_repo }
    }

    #[instrument(skip(self))]
    pub async fn get_stats(&self) -> Result<StatsResponse, ApplicationError> {
        info!("Gathering repository statistics");
        let total_documents = self.doc_repo.count().await.map_err(|e| {
            error!("Failed to count documents for stats: {}", e);
            e
        })?;
        debug!(total_documents, "Repository stats gathered");
        Ok(StatsResponse { total_documents })
    }
}
