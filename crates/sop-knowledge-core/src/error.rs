//! Error taxonomy for the knowledge service.
//!
//! Every failure that crosses the service boundary is a [`KnowledgeError`].
//! Store backends report the narrower [`StoreError`], which the resolver
//! maps onto the taxonomy together with the id being resolved.
//!
//! | Variant | Meaning | Caller action |
//! |---------|---------|---------------|
//! | `NotFound` | unknown id, or catalogued id with no backing document | fall back to search |
//! | `CorruptDocument` | stored bytes do not parse into a valid SOP | report, do not retry |
//! | `StoreUnavailable` | transport, auth, or timeout failure | retry with backoff |

use std::fmt;

use thiserror::Error;

/// Why an id could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    /// The id has no entry in the table of contents.
    NotInCatalog,
    /// The id is catalogued but the store has no document for it.
    MissingDocument,
}

impl fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundKind::NotInCatalog => f.write_str("not in catalog"),
            NotFoundKind::MissingDocument => f.write_str("catalogued but document missing"),
        }
    }
}

/// Errors surfaced by the knowledge service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KnowledgeError {
    #[error("SOP not found: {id} ({kind})")]
    NotFound { id: String, kind: NotFoundKind },

    #[error("SOP {id} is corrupt: {reason}")]
    CorruptDocument { id: String, reason: String },

    #[error("document store unavailable while resolving {id}: {reason}")]
    StoreUnavailable { id: String, reason: String },
}

impl KnowledgeError {
    pub fn not_in_catalog(id: impl Into<String>) -> Self {
        KnowledgeError::NotFound {
            id: id.into(),
            kind: NotFoundKind::NotInCatalog,
        }
    }

    pub fn missing_document(id: impl Into<String>) -> Self {
        KnowledgeError::NotFound {
            id: id.into(),
            kind: NotFoundKind::MissingDocument,
        }
    }

    pub fn corrupt(id: impl Into<String>, reason: impl Into<String>) -> Self {
        KnowledgeError::CorruptDocument {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn unavailable(id: impl Into<String>, reason: impl Into<String>) -> Self {
        KnowledgeError::StoreUnavailable {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// The SOP id the error refers to.
    pub fn id(&self) -> &str {
        match self {
            KnowledgeError::NotFound { id, .. }
            | KnowledgeError::CorruptDocument { id, .. }
            | KnowledgeError::StoreUnavailable { id, .. } => id,
        }
    }

    /// Machine-readable code used by the HTTP error contract.
    pub fn code(&self) -> &'static str {
        match self {
            KnowledgeError::NotFound { .. } => "not_found",
            KnowledgeError::CorruptDocument { .. } => "corrupt_document",
            KnowledgeError::StoreUnavailable { .. } => "store_unavailable",
        }
    }

    /// Transient failures are worth retrying; the others are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, KnowledgeError::StoreUnavailable { .. })
    }
}

/// Errors reported by a [`DocumentStore`](crate::store::DocumentStore) backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backend has no object for the requested key.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Transport, authentication, or backend failure. Never used for absence.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Map a store error for `id` onto the service taxonomy.
    pub fn into_knowledge(self, id: &str) -> KnowledgeError {
        match self {
            StoreError::NotFound(_) => KnowledgeError::missing_document(id),
            StoreError::Unavailable(reason) => KnowledgeError::unavailable(id, reason),
        }
    }
}

/// Non-fatal data-quality problems. Logged, never blocking resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataQualityWarning {
    /// The entry has no keywords and is unreachable by text search.
    EmptyKeywords { id: String },
    /// The fetched document lists no keywords.
    DocumentWithoutKeywords { id: String },
}

impl DataQualityWarning {
    pub fn id(&self) -> &str {
        match self {
            DataQualityWarning::EmptyKeywords { id }
            | DataQualityWarning::DocumentWithoutKeywords { id } => id,
        }
    }
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataQualityWarning::EmptyKeywords { id } => {
                write!(f, "catalog entry {} has no keywords (unreachable by search)", id)
            }
            DataQualityWarning::DocumentWithoutKeywords { id } => {
                write!(f, "stored document {} has no keywords", id)
            }
        }
    }
}
