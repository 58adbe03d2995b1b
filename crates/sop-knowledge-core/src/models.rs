//! Core data models.
//!
//! A [`StoredSop`] is what a store backend holds: its `images` are storage
//! locators. A [`Sop`] is what callers receive: the same document with every
//! locator replaced by a fetchable URL. [`TocEntry`] is the lightweight
//! projection kept in the table of contents.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DataQualityWarning, KnowledgeError};

/// Category used when a stored document does not name one.
pub const DEFAULT_CATEGORY: &str = "General";

/// Catalog projection of an SOP: everything needed for lookup, nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub id: String,
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl TocEntry {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        category: impl Into<String>,
        keywords: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category: category.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// An SOP exactly as persisted in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSop {
    pub id: String,
    pub title: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub content: String,
    /// Storage locators (`s3://bucket/key`, bare keys, or URLs).
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub last_updated: Option<NaiveDate>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// True when no keyword carries any text; blank strings count as missing.
pub fn keywords_blank(keywords: &[String]) -> bool {
    keywords.iter().all(|k| k.trim().is_empty())
}

impl StoredSop {
    /// Parse raw store bytes for `expected_id`.
    ///
    /// Fails with [`KnowledgeError::CorruptDocument`] on invalid UTF-8,
    /// invalid JSON, missing required fields, a malformed date, or a
    /// document whose `id` does not match the requested one.
    pub fn parse(expected_id: &str, bytes: &[u8]) -> Result<Self, KnowledgeError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| KnowledgeError::corrupt(expected_id, format!("not UTF-8: {}", e)))?;

        let stored: StoredSop = serde_json::from_str(text)
            .map_err(|e| KnowledgeError::corrupt(expected_id, e.to_string()))?;

        if stored.id != expected_id {
            return Err(KnowledgeError::corrupt(
                expected_id,
                format!("document declares id '{}'", stored.id),
            ));
        }
        if stored.title.trim().is_empty() {
            return Err(KnowledgeError::corrupt(expected_id, "title is empty"));
        }

        Ok(stored)
    }

    /// Warning to record when the document has only blank keywords.
    pub fn keyword_warning(&self) -> Option<DataQualityWarning> {
        keywords_blank(&self.keywords).then(|| DataQualityWarning::DocumentWithoutKeywords {
            id: self.id.clone(),
        })
    }

    /// Attach resolved image URLs, producing the caller-facing [`Sop`].
    ///
    /// `urls` must be in the same order as `self.images`.
    pub fn into_resolved(self, urls: Vec<String>) -> Sop {
        debug_assert_eq!(urls.len(), self.images.len());
        Sop {
            id: self.id,
            title: self.title,
            category: self.category,
            keywords: self.keywords,
            content: self.content,
            images: urls,
            last_updated: self.last_updated,
        }
    }
}

/// A fully resolved SOP. `images` holds fetchable URLs only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sop {
    pub id: String,
    pub title: String,
    pub category: String,
    pub keywords: Vec<String>,
    pub content: String,
    pub images: Vec<String>,
    pub last_updated: Option<NaiveDate>,
}

impl Sop {
    pub fn toc_entry(&self) -> TocEntry {
        TocEntry {
            id: self.id.clone(),
            title: self.title.clone(),
            category: self.category.clone(),
            keywords: self.keywords.clone(),
        }
    }
}
