//! SOP resolution: ids and free-text queries into fully materialized SOPs.
//!
//! # Pipeline
//!
//! ```text
//! id ──▶ TOC lookup ──▶ cache? ──▶ fetch_raw (timeout) ──▶ parse ──▶ resolve images (concurrent) ──▶ Sop
//!
//! query ──▶ TOC search ──▶ top N ──▶ resolve each (concurrent, failures skipped) ──▶ Vec<Sop>
//! ```
//!
//! Single-id lookups propagate every failure as a typed
//! [`KnowledgeError`]. Query resolution is best-effort: a candidate that
//! fails to resolve is logged and dropped, and the remaining candidates
//! keep their score order.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use sop_knowledge_core::{DocumentStore, KnowledgeError, Sop, StoreError, StoredSop, TocIndex};

use crate::cache::SopCache;

pub struct SopResolver {
    index: Arc<TocIndex>,
    store: Arc<dyn DocumentStore>,
    cache: Option<SopCache>,
    timeout: Duration,
}

impl SopResolver {
    /// `timeout` bounds each individual store call when the caller supplies none.
    pub fn new(index: Arc<TocIndex>, store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self {
            index,
            store,
            cache: None,
            timeout,
        }
    }

    pub fn with_cache(mut self, cache: SopCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn index(&self) -> &TocIndex {
        &self.index
    }

    pub fn store_kind(&self) -> &str {
        self.store.kind()
    }

    pub fn default_timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn resolve_by_id(&self, id: &str) -> Result<Sop, KnowledgeError> {
        self.resolve_by_id_within(id, self.timeout).await
    }

    /// Resolve one SOP, bounding every store call by `timeout`.
    pub async fn resolve_by_id_within(
        &self,
        id: &str,
        timeout: Duration,
    ) -> Result<Sop, KnowledgeError> {
        self.index.get(id)?;

        match self.cache {
            // A waiter on someone else's in-flight load is bounded by its own timeout.
            Some(ref cache) => {
                match tokio::time::timeout(
                    timeout,
                    cache.get_or_try_load(id, || self.load(id, timeout)),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(timed_out(id, "cache wait", timeout)),
                }
            }
            None => self.load(id, timeout).await,
        }
    }

    pub async fn resolve_by_query(&self, text: &str, limit: usize) -> Vec<Sop> {
        self.resolve_by_query_within(text, limit, self.timeout).await
    }

    /// Resolve the top `limit` matches for `text`, skipping failures.
    pub async fn resolve_by_query_within(
        &self,
        text: &str,
        limit: usize,
        timeout: Duration,
    ) -> Vec<Sop> {
        if limit == 0 {
            return Vec::new();
        }

        let candidates: Vec<&str> = self
            .index
            .search(text)
            .into_iter()
            .take(limit)
            .map(|scored| scored.entry.id.as_str())
            .collect();

        if candidates.is_empty() {
            tracing::debug!(query = text, "no catalog matches");
            return Vec::new();
        }

        let outcomes = join_all(
            candidates
                .iter()
                .map(|id| self.resolve_by_id_within(id, timeout)),
        )
        .await;

        let mut results = Vec::with_capacity(outcomes.len());
        for (id, outcome) in candidates.iter().zip(outcomes) {
            match outcome {
                Ok(sop) => results.push(sop),
                Err(e) => {
                    tracing::warn!(id, code = e.code(), error = %e, "skipping search candidate")
                }
            }
        }
        results
    }

    async fn load(&self, id: &str, timeout: Duration) -> Result<Sop, KnowledgeError> {
        tracing::info!(id, store = self.store.kind(), "fetching SOP");

        let raw = match tokio::time::timeout(timeout, self.store.fetch_raw(id)).await {
            Ok(result) => result.map_err(|e| e.into_knowledge(id))?,
            Err(_) => return Err(timed_out(id, "document fetch", timeout)),
        };

        let stored = StoredSop::parse(id, &raw).map_err(|e| {
            tracing::error!(id, error = %e, "stored SOP failed to parse");
            e
        })?;

        if let Some(warning) = stored.keyword_warning() {
            tracing::warn!(id, "{}", warning);
        }

        let urls = self.resolve_images(id, &stored.images, timeout).await?;
        Ok(stored.into_resolved(urls))
    }

    /// Resolve every locator concurrently; output order matches input order.
    async fn resolve_images(
        &self,
        id: &str,
        locators: &[String],
        timeout: Duration,
    ) -> Result<Vec<String>, KnowledgeError> {
        let resolutions = locators.iter().map(|locator| async move {
            match tokio::time::timeout(timeout, self.store.resolve_image(locator)).await {
                Ok(Ok(url)) => Ok(url),
                Ok(Err(StoreError::NotFound(what))) | Ok(Err(StoreError::Unavailable(what))) => {
                    Err(KnowledgeError::unavailable(
                        id,
                        format!("image '{}' could not be resolved: {}", locator, what),
                    ))
                }
                Err(_) => Err(timed_out(id, "image resolution", timeout)),
            }
        });

        join_all(resolutions).await.into_iter().collect()
    }
}

fn timed_out(id: &str, what: &str, timeout: Duration) -> KnowledgeError {
    KnowledgeError::unavailable(
        id,
        format!("{} timed out after {} ms", what, timeout.as_millis()),
    )
}
