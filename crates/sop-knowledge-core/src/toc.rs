//! Table of contents index with deterministic lexical search.
//!
//! The index is a pure function of its input [`Catalog`]: it is built once,
//! never mutated, and can be shared across threads without locking.
//!
//! # Scoring
//!
//! 1. Lowercase the query and split it on whitespace.
//! 2. Trim punctuation from token edges; drop empty tokens and stopwords;
//!    deduplicate, keeping first occurrence.
//! 3. For each entry: `score = KEYWORD_WEIGHT × keyword hits + TITLE_WEIGHT × title hits`.
//!    A keyword hit is a token equal to a keyword (or to one word of a
//!    multi-word keyword). A title hit is a token contained in the title.
//! 4. Drop entries scoring 0; stable-sort by score descending, so equal
//!    scores keep catalog order.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::error::{DataQualityWarning, KnowledgeError};
use crate::models::{keywords_blank, TocEntry};

/// Weight of a query token that matches a keyword exactly.
pub const KEYWORD_WEIGHT: f64 = 1.0;
/// Weight of a query token found inside the title.
pub const TITLE_WEIGHT: f64 = 0.5;

/// Words ignored by the matcher.
pub const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "can", "do", "does", "for", "how", "i", "in", "is", "it", "me",
    "my", "of", "on", "or", "should", "the", "to", "what", "when", "where", "which", "why",
    "with", "you", "your",
];

/// Ordered catalog definition the index is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub entries: Vec<TocEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<TocEntry>) -> Self {
        Self { entries }
    }
}

/// Catalog definitions that cannot form an index.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate SOP id in catalog: {0}")]
    DuplicateId(String),
    #[error("catalog entry #{0} has an empty id")]
    EmptyId(usize),
}

/// A TOC entry paired with its match score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredEntry<'a> {
    pub entry: &'a TocEntry,
    pub score: f64,
}

/// Immutable, id-keyed view over a catalog.
#[derive(Debug, Clone)]
pub struct TocIndex {
    entries: Vec<TocEntry>,
    by_id: HashMap<String, usize>,
    /// Lowercased keyword words per entry, parallel to `entries`.
    keyword_terms: Vec<Vec<String>>,
    /// Lowercased titles, parallel to `entries`.
    titles_lower: Vec<String>,
    warnings: Vec<DataQualityWarning>,
}

impl TocIndex {
    /// Build the index, rejecting duplicate or empty ids.
    ///
    /// Entries without keywords are kept but recorded as
    /// [`DataQualityWarning::EmptyKeywords`] and logged.
    pub fn new(catalog: Catalog) -> Result<Self, CatalogError> {
        let mut by_id = HashMap::with_capacity(catalog.entries.len());
        let mut warnings = Vec::new();

        for (idx, entry) in catalog.entries.iter().enumerate() {
            if entry.id.trim().is_empty() {
                return Err(CatalogError::EmptyId(idx));
            }
            if by_id.insert(entry.id.clone(), idx).is_some() {
                return Err(CatalogError::DuplicateId(entry.id.clone()));
            }
            if keywords_blank(&entry.keywords) {
                let warning = DataQualityWarning::EmptyKeywords {
                    id: entry.id.clone(),
                };
                tracing::warn!(sop_id = %entry.id, "{}", warning);
                warnings.push(warning);
            }
        }

        let keyword_terms = catalog
            .entries
            .iter()
            .map(|e| {
                let mut terms: Vec<String> = Vec::new();
                for kw in &e.keywords {
                    let kw = kw.trim().to_lowercase();
                    if kw.is_empty() {
                        continue;
                    }
                    terms.extend(kw.split_whitespace().map(str::to_string));
                    terms.push(kw);
                }
                terms
            })
            .collect();
        let titles_lower = catalog
            .entries
            .iter()
            .map(|e| e.title.to_lowercase())
            .collect();

        Ok(Self {
            entries: catalog.entries,
            by_id,
            keyword_terms,
            titles_lower,
            warnings,
        })
    }

    /// All entries in catalog insertion order.
    pub fn all_entries(&self) -> &[TocEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Look up an entry by id.
    pub fn get(&self, id: &str) -> Result<&TocEntry, KnowledgeError> {
        self.by_id
            .get(id)
            .map(|&idx| &self.entries[idx])
            .ok_or_else(|| KnowledgeError::not_in_catalog(id))
    }

    /// Data-quality warnings found while building the index.
    pub fn warnings(&self) -> &[DataQualityWarning] {
        &self.warnings
    }

    /// Distinct categories in order of first appearance.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !seen.contains(&entry.category.as_str()) {
                seen.push(entry.category.as_str());
            }
        }
        seen
    }

    pub fn entries_in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a TocEntry> {
        self.entries.iter().filter(move |e| e.category == category)
    }

    /// Rank entries against `query_text`. Never errors; an empty or
    /// all-stopword query yields an empty result.
    pub fn search(&self, query_text: &str) -> Vec<ScoredEntry<'_>> {
        let tokens = tokenize(query_text);
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<ScoredEntry<'_>> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(idx, entry)| {
                let terms = &self.keyword_terms[idx];
                let title = &self.titles_lower[idx];

                let keyword_hits = tokens.iter().filter(|t| terms.contains(t)).count();
                let title_hits = tokens.iter().filter(|t| title.contains(t.as_str())).count();

                let score = KEYWORD_WEIGHT * keyword_hits as f64 + TITLE_WEIGHT * title_hits as f64;
                if score > 0.0 {
                    Some(ScoredEntry { entry, score })
                } else {
                    None
                }
            })
            .collect();

        // Stable: ties keep catalog order.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored
    }
}

/// Normalize a query into deduplicated, lowercased, non-stopword tokens.
pub fn tokenize(query_text: &str) -> Vec<String> {
    let lower = query_text.to_lowercase();
    let mut tokens: Vec<String> = Vec::new();
    for raw in lower.split_whitespace() {
        let token = raw.trim_matches(|c: char| !c.is_alphanumeric());
        if token.is_empty() || STOPWORDS.contains(&token) {
            continue;
        }
        if !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }
    tokens
}
