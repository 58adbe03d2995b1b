//! In-memory [`DocumentStore`] for tests and embedding.
//!
//! Documents live in a `HashMap` behind `std::sync::RwLock`. Every
//! `fetch_raw` call is counted so callers can assert how often the backend
//! was hit. Images resolve to `memory://<locator>`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::StoredSop;

use super::{is_web_url, DocumentStore};

/// In-memory store keyed by SOP id.
pub struct InMemoryStore {
    docs: RwLock<HashMap<String, Vec<u8>>>,
    unavailable: RwLock<HashSet<String>>,
    fetches: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            unavailable: RwLock::new(HashSet::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Store raw bytes under `id`, whether or not they parse.
    pub fn insert_raw(&self, id: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.docs.write().unwrap().insert(id.into(), bytes.into());
    }

    /// Serialize and store a document under its own id.
    pub fn insert(&self, sop: &StoredSop) {
        let bytes = serde_json::to_vec(sop).expect("StoredSop always serializes");
        self.insert_raw(sop.id.clone(), bytes);
    }

    /// Make every fetch of `id` fail with [`StoreError::Unavailable`].
    pub fn mark_unavailable(&self, id: impl Into<String>) {
        self.unavailable.write().unwrap().insert(id.into());
    }

    /// Number of `fetch_raw` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    fn kind(&self) -> &str {
        "memory"
    }

    async fn fetch_raw(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.read().unwrap().contains(id) {
            return Err(StoreError::Unavailable(format!(
                "memory store marked {} unavailable",
                id
            )));
        }
        self.docs
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn resolve_image(&self, locator: &str) -> Result<String, StoreError> {
        if is_web_url(locator) || locator.starts_with("memory://") {
            return Ok(locator.to_string());
        }
        Ok(format!("memory://{}", locator.trim_start_matches("s3://")))
    }
}
