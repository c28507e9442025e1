// ./infrastructure/src/persistence/in_memory_repository.rs
use application::{ApplicationError, DocumentRepository};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use domain::{Document, DocumentFilter, DocumentId};
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// In-memory document store keyed by document id.
/// Cloning yields another handle to the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentRepository {
    // Document ID -> Document
    store: Arc<DashMap<DocumentId, Document>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self {
            store: Arc::new(DashMap::new()),
        }
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    #[instrument(skip(self, document))]
    async fn save(&self, document: Document) -> Result<Document, ApplicationError> {
        let (id, stored) = match document.id().cloned() {
            Some(id) => {
                // Raw upsert: whatever `created` the caller sent is stored as-is.
                debug!(doc_id = %id, "Overwriting document in in-memory store");
                (id, document)
            }
            None => {
                let id = DocumentId::generate();
                debug!(doc_id = %id, "Inserting new document into in-memory store");
                let stored = document.with_id(id.clone()).with_created(Utc::now());
                (id, stored)
            }
        };

        self.store.insert(id, stored.clone());
        Ok(stored)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, ApplicationError> {
        debug!(doc_id = %id, "Getting document from in-memory store");
        Ok(self.store.get(id).map(|doc_ref| doc_ref.value().clone()))
    }

    #[instrument(skip(self, filter), fields(has_filter = filter.is_some()))]
    async fn search(
        &self,
        filter: Option<&DocumentFilter>,
    ) -> Result<Vec<Document>, ApplicationError> {
        trace!(stored = self.store.len(), "Scanning in-memory store");
        // Only matching documents are copied out of the map.
        let mut matches: Vec<Document> = self
            .store
            .iter()
            .filter(|entry| filter.map_or(true, |f| f.matches(entry.value())))
            .map(|entry| entry.value().clone())
            .collect();

        // Stable output: oldest first, id as tie-breaker.
        matches.sort_by(|a, b| {
            a.created()
                .cmp(&b.created())
                .then_with(|| a.id().cmp(&b.id()))
        });

        debug!(returned_hits = matches.len(), "In-memory search finished.");
        Ok(matches)
    }

    async fn count(&self) -> Result<usize, ApplicationError> {
        Ok(self.store.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use domain::Author;

    fn draft(title: &str, content: &str, author_id: &str) -> Document {
        Document::new(title, content, Author::new(author_id, "Someone"))
    }

    async fn seeded() -> (InMemoryDocumentRepository, Document, Document) {
        let repo = InMemoryDocumentRepository::new();
        let alpha = repo
            .save(draft("Alpha Report", "foo bar", "a1"))
            .await
            .unwrap();
        let beta = repo.save(draft("Beta Memo", "baz", "a2")).await.unwrap();
        (repo, alpha, beta)
    }

    fn ids(docs: &[Document]) -> Vec<&DocumentId> {
        docs.iter().filter_map(Document::id).collect()
    }

    #[tokio::test]
    async fn insert_assigns_fresh_id_and_created() {
        let repo = InMemoryDocumentRepository::new();
        let before = Utc::now();
        let caller_created = before - Duration::days(30);

        let first = repo
            .save(draft("One", "x", "a1").with_created(caller_created))
            .await
            .unwrap();
        let second = repo.save(draft("One", "x", "a1")).await.unwrap();

        let first_id = first.id().unwrap();
        assert!(!first_id.as_str().is_empty());
        assert_ne!(Some(first_id), second.id());
        // Caller-supplied created is replaced on insert.
        let created = first.created().unwrap();
        assert!(created >= before && created <= Utc::now());
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn save_with_id_stores_verbatim_and_overwrites() {
        let repo = InMemoryDocumentRepository::new();
        let id = DocumentId::parse("fixed").unwrap();

        let original = draft("First", "v1", "a1").with_id(id.clone());
        let stored = repo.save(original.clone()).await.unwrap();
        assert_eq!(stored, original);
        assert!(stored.created().is_none());

        let created = Utc::now() - Duration::hours(1);
        let updated = draft("Second", "v2", "a2")
            .with_id(id.clone())
            .with_created(created);
        repo.save(updated.clone()).await.unwrap();

        assert_eq!(repo.find_by_id(&id).await.unwrap(), Some(updated));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn update_keeps_created_when_caller_round_trips_it() {
        let (repo, alpha, _) = seeded().await;
        let id = alpha.id().unwrap().clone();

        let edited = draft("Alpha Report v2", "foo bar", "a1")
            .with_id(id.clone())
            .with_created(alpha.created().unwrap());
        repo.save(edited).await.unwrap();

        let found = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(found.title(), "Alpha Report v2");
        assert_eq!(found.created(), alpha.created());
    }

    #[tokio::test]
    async fn find_by_id_round_trips_and_reports_absence() {
        let (repo, alpha, beta) = seeded().await;
        assert_eq!(
            repo.find_by_id(alpha.id().unwrap()).await.unwrap(),
            Some(alpha)
        );
        assert_eq!(
            repo.find_by_id(beta.id().unwrap()).await.unwrap(),
            Some(beta)
        );
        let unknown = DocumentId::parse("never-saved").unwrap();
        assert!(repo.find_by_id(&unknown).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_without_constraints_returns_everything() {
        let (repo, alpha, beta) = seeded().await;

        let all = repo.search(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let empty_lists = DocumentFilter::any()
            .with_title_prefixes(Vec::<String>::new())
            .with_author_ids(Vec::<String>::new());
        let all_again = repo.search(Some(&empty_lists)).await.unwrap();
        assert_eq!(ids(&all_again), ids(&all));
        assert!(all.contains(&alpha) && all.contains(&beta));
    }

    #[tokio::test]
    async fn search_narrows_prefix_match_by_author() {
        let (repo, alpha, _) = seeded().await;
        let filter = DocumentFilter::any()
            .with_title_prefixes(["Alpha", "Beta"])
            .with_author_ids(["a1"]);

        let hits = repo.search(Some(&filter)).await.unwrap();
        assert_eq!(hits, vec![alpha]);
    }

    #[tokio::test]
    async fn search_date_range_is_inclusive() {
        let (repo, alpha, beta) = seeded().await;
        let created = beta.created().unwrap();

        let from = DocumentFilter::any().with_created_from(Some(created));
        assert!(repo.search(Some(&from)).await.unwrap().contains(&beta));

        let to = DocumentFilter::any().with_created_to(Some(created));
        let hits = repo.search(Some(&to)).await.unwrap();
        assert!(hits.contains(&beta));
        assert!(hits.contains(&alpha));
    }

    #[tokio::test]
    async fn search_results_are_ordered_by_created() {
        let repo = InMemoryDocumentRepository::new();
        let now = Utc::now();
        for (id, offset) in [("c", 0), ("a", 2), ("b", 1)] {
            repo.save(
                draft(id, "", "a1")
                    .with_id(DocumentId::parse(id).unwrap())
                    .with_created(now - Duration::minutes(offset)),
            )
            .await
            .unwrap();
        }

        let hits = repo.search(None).await.unwrap();
        let titles: Vec<&str> = hits.iter().map(Document::title).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn empty_store_returns_no_results() {
        let repo = InMemoryDocumentRepository::new();
        assert!(repo.search(None).await.unwrap().is_empty());
        let filter = DocumentFilter::any().with_contains_contents(["x"]);
        assert!(repo.search(Some(&filter)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn returned_documents_are_detached_copies() {
        let (repo, alpha, _) = seeded().await;
        let id = alpha.id().unwrap().clone();

        let mut hits = repo.search(None).await.unwrap();
        hits.clear();
        drop(alpha);

        assert!(repo.find_by_id(&id).await.unwrap().is_some());
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn changing_a_returned_document_leaves_the_store_untouched() {
        let (repo, alpha, _) = seeded().await;
        let id = alpha.id().unwrap().clone();

        let found = repo.find_by_id(&id).await.unwrap().unwrap();
        let moved = found.with_created(Utc::now() + Duration::days(1));
        assert_ne!(moved.created(), alpha.created());

        let hits = repo.search(None).await.unwrap();
        assert!(hits.contains(&alpha));
        assert_eq!(repo.find_by_id(&id).await.unwrap(), Some(alpha));
    }

    #[tokio::test]
    async fn concurrent_inserts_all_land() {
        let repo = InMemoryDocumentRepository::new();
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.save(draft(&format!("Doc {i}"), "body", "a1")).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(repo.count().await.unwrap(), 16);
    }
}
