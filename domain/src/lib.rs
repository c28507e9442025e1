use chrono::{DateTime, Utc}; // Provenance timestamps
use serde::{Deserialize, Serialize}; // For documents crossing the API boundary
use std::fmt;
use thiserror::Error; // For domain-specific errors
use uuid::Uuid; // Generated document identities

// --- Domain Errors ---
#[derive(Error, Debug, PartialEq)]
pub enum DomainError {
    #[error("Invalid document id: {0}")]
    InvalidDocumentId(String),
}

// --- Document ID ---
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Generates a fresh, random identity (UUID v4, canonical hyphenated form).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accepts any caller-supplied id except an empty or blank one.
    pub fn parse(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidDocumentId(
                "Document id cannot be empty.".to_string(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = DomainError;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        Self::parse(id)
    }
}

impl From<DocumentId> for String {
    fn from(doc_id: DocumentId) -> Self {
        doc_id.0
    }
}

// --- Author ---

/// Author embedded in a document. Has no lifecycle of its own.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: String,
    pub name: String,
}

impl Author {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

// --- Document ---

/// A stored record. `id` and `created` are assigned by the repository on insert;
/// `title`, `content` and `author` are supplied by the caller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    id: Option<DocumentId>,
    title: String,
    content: String,
    author: Author,
    #[serde(default)]
    created: Option<DateTime<Utc>>,
}

impl Document {
    /// Creates a document that has not been saved yet (no id, no creation time).
    pub fn new(title: impl Into<String>, content: impl Into<String>, author: Author) -> Self {
        Self {
            id: None,
            title: title.into(),
            content: content.into(),
            author,
            created: None,
        }
    }

    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }

    pub fn id(&self) -> Option<&DocumentId> {
        self.id.as_ref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }
}

// --- Search Filter ---

/// Normalized search constraints. Fields combine with AND; the values listed
/// within one field combine with OR. `None` is the only "no constraint" form:
/// empty lists are folded into `None` when the filter is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFilter {
    title_prefixes: Option<Vec<String>>,
    contains_contents: Option<Vec<String>>,
    author_ids: Option<Vec<String>>,
    created_from: Option<DateTime<Utc>>,
    created_to: Option<DateTime<Utc>>,
}

impl DocumentFilter {
    /// A filter that every document satisfies.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_title_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.title_prefixes = non_empty(prefixes);
        self
    }

    pub fn with_contains_contents<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contains_contents = non_empty(fragments);
        self
    }

    pub fn with_author_ids<I, S>(mut self, author_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.author_ids = non_empty(author_ids);
        self
    }

    pub fn with_created_from(mut self, from: Option<DateTime<Utc>>) -> Self {
        self.created_from = from;
        self
    }

    pub fn with_created_to(mut self, to: Option<DateTime<Utc>>) -> Self {
        self.created_to = to;
        self
    }

    /// True when no dimension carries a constraint.
    pub fn is_unconstrained(&self) -> bool {
        self.title_prefixes.is_none()
            && self.contains_contents.is_none()
            && self.author_ids.is_none()
            && self.created_from.is_none()
            && self.created_to.is_none()
    }

    /// Checks a document against every present constraint.
    pub fn matches(&self, document: &Document) -> bool {
        self.matches_title(document)
            && self.matches_content(document)
            && self.matches_author(document)
            && self.matches_created(document)
    }

    fn matches_title(&self, document: &Document) -> bool {
        self.title_prefixes.as_deref().map_or(true, |prefixes| {
            prefixes
                .iter()
                .any(|prefix| document.title().starts_with(prefix.as_str()))
        })
    }

    fn matches_content(&self, document: &Document) -> bool {
        self.contains_contents.as_deref().map_or(true, |fragments| {
            fragments
                .iter()
                .any(|fragment| document.content().contains(fragment.as_str()))
        })
    }

    fn matches_author(&self, document: &Document) -> bool {
        self.author_ids
            .as_deref()
            .map_or(true, |ids| ids.iter().any(|id| *id == document.author().id))
    }

    fn matches_created(&self, document: &Document) -> bool {
        if self.created_from.is_none() && self.created_to.is_none() {
            return true;
        }
        // A document without a creation time cannot be placed inside a range.
        let Some(created) = document.created() else {
            return false;
        };
        self.created_from.map_or(true, |from| created >= from)
            && self.created_to.map_or(true, |to| created <= to)
    }
}

fn non_empty<I, S>(values: I) -> Option<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let values: Vec<String> = values.into_iter().map(Into::into).collect();
    if values.is_empty() { None } else { Some(values) }
}
