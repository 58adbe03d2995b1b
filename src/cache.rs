//! Single-flight TTL cache of resolved SOPs.
//!
//! Each id owns a slot holding a [`tokio::sync::OnceCell`]. The first caller
//! for an id runs the loader; concurrent callers for the same id wait on the
//! cell and receive the same result instead of fetching again. A failed load
//! leaves the cell empty, so the next caller retries. Values become visible
//! only once the loader has returned a complete [`Sop`].
//!
//! Entries expire after the configured TTL, which should stay below the
//! pre-signed URL expiry so cached image URLs are never handed out stale.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, OnceCell};

use sop_knowledge_core::{KnowledgeError, Sop};

#[derive(Debug)]
struct CacheEntry {
    sop: Sop,
    inserted: Instant,
}

type Slot = Arc<OnceCell<CacheEntry>>;

#[derive(Debug)]
pub struct SopCache {
    ttl: Duration,
    slots: Mutex<HashMap<String, Slot>>,
}

impl SopCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached SOP for `id`, or run `load` to produce it.
    ///
    /// At most one `load` runs per id at a time.
    pub async fn get_or_try_load<F, Fut>(&self, id: &str, load: F) -> Result<Sop, KnowledgeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Sop, KnowledgeError>>,
    {
        let slot = self.slot(id).await;

        if let Some(entry) = slot.get() {
            tracing::debug!(id, "cache hit");
            return Ok(entry.sop.clone());
        }

        let entry = slot
            .get_or_try_init(|| async {
                let sop = load().await?;
                Ok::<_, KnowledgeError>(CacheEntry {
                    sop,
                    inserted: Instant::now(),
                })
            })
            .await?;
        Ok(entry.sop.clone())
    }

    /// Fetch the slot for `id`, replacing it when its entry has expired.
    async fn slot(&self, id: &str) -> Slot {
        let mut slots = self.slots.lock().await;
        let expired = slots
            .get(id)
            .and_then(|slot| slot.get())
            .map(|entry| entry.inserted.elapsed() > self.ttl)
            .unwrap_or(false);
        if expired {
            tracing::debug!(id, "cache entry expired");
            slots.remove(id);
        }
        slots
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Number of ids holding a completed entry, expired or not.
    pub async fn len(&self) -> usize {
        let slots = self.slots.lock().await;
        slots.values().filter(|slot| slot.initialized()).count()
    }
}
