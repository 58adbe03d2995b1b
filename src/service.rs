//! Knowledge service facade.
//!
//! [`KnowledgeService`] is what the CLI and the HTTP server talk to. It owns
//! the resolver (and through it the TOC index, the store, and the optional
//! cache), applies the configured result limits, and guarantees that every
//! failure leaving it is a [`KnowledgeError`].

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;

use sop_knowledge_core::render::format_toc;
use sop_knowledge_core::{DataQualityWarning, DocumentStore, KnowledgeError, Sop, TocIndex};

use crate::cache::SopCache;
use crate::catalog::build_index;
use crate::config::{BackendKind, Config, RetrievalConfig};
use crate::resolver::SopResolver;
use crate::store_fs::LocalStore;
use crate::store_s3::{AwsCredentials, S3Store};

/// Entries resolved in parallel by [`KnowledgeService::check_catalog`].
const CHECK_CONCURRENCY: usize = 8;

pub struct KnowledgeService {
    resolver: SopResolver,
    retrieval: RetrievalConfig,
}

impl KnowledgeService {
    pub fn new(resolver: SopResolver, retrieval: RetrievalConfig) -> Self {
        Self {
            resolver,
            retrieval,
        }
    }

    /// Build the catalog index, the configured store backend, and the cache.
    pub fn from_config(config: &Config) -> Result<Self> {
        let index = Arc::new(build_index(config)?);
        let store = build_store(config)?;

        let mut resolver = SopResolver::new(index, store, config.retrieval.fetch_timeout());
        if config.cache.enabled {
            let cache = SopCache::new(Duration::from_secs(config.cache.ttl_secs));
            tracing::info!(ttl_secs = cache.ttl().as_secs(), "SOP cache enabled");
            resolver = resolver.with_cache(cache);
        }

        Ok(Self::new(resolver, config.retrieval.clone()))
    }

    pub async fn get_sop(&self, id: &str) -> Result<Sop, KnowledgeError> {
        self.resolver.resolve_by_id(id).await
    }

    pub async fn get_sop_within(&self, id: &str, timeout: Duration) -> Result<Sop, KnowledgeError> {
        self.resolver.resolve_by_id_within(id, timeout).await
    }

    /// Best-effort search. `limit` is clamped to the configured maximum;
    /// a limit of 0 returns nothing.
    pub async fn find_sops(&self, query: &str, limit: usize) -> Vec<Sop> {
        self.find_sops_within(query, limit, self.resolver.default_timeout())
            .await
    }

    pub async fn find_sops_within(&self, query: &str, limit: usize, timeout: Duration) -> Vec<Sop> {
        let limit = self.clamp_limit(limit);
        self.resolver
            .resolve_by_query_within(query, limit, timeout)
            .await
    }

    pub fn toc(&self) -> &TocIndex {
        self.resolver.index()
    }

    pub fn formatted_toc(&self) -> String {
        format_toc(self.toc())
    }

    pub fn default_limit(&self) -> usize {
        self.retrieval.default_limit
    }

    pub fn store_kind(&self) -> &str {
        self.resolver.store_kind()
    }

    fn clamp_limit(&self, limit: usize) -> usize {
        limit.min(self.retrieval.max_limit)
    }

    /// Resolve every catalog entry and report the outcome of each.
    pub async fn check_catalog(&self) -> CatalogReport {
        let ids: Vec<&str> = self
            .toc()
            .all_entries()
            .iter()
            .map(|e| e.id.as_str())
            .collect();

        let entries: Vec<EntryCheck> = stream::iter(ids)
            .map(|id| async move {
                let status = match self.get_sop(id).await {
                    Ok(_) => CheckStatus::Ok,
                    Err(e) => CheckStatus::from_error(&e),
                };
                EntryCheck {
                    id: id.to_string(),
                    status,
                }
            })
            .buffered(CHECK_CONCURRENCY)
            .collect()
            .await;

        CatalogReport {
            entries,
            warnings: self.toc().warnings().to_vec(),
        }
    }
}

/// Construct the store selected by `store.backend`.
pub fn build_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    match config.store.backend {
        BackendKind::Local => {
            let local = config
                .store
                .local
                .as_ref()
                .context("[store.local] is required for the local backend")?;
            tracing::info!(root = %local.root.display(), "using local document store");
            Ok(Arc::new(LocalStore::new(local)))
        }
        BackendKind::S3 => {
            let s3 = config
                .store
                .s3
                .clone()
                .context("[store.s3] is required for the s3 backend")?;
            let creds = AwsCredentials::from_env()?;
            tracing::info!(
                sop_bucket = %s3.sop_bucket,
                images_bucket = %s3.images_bucket,
                region = %s3.region,
                "using S3 document store"
            );
            Ok(Arc::new(S3Store::new(s3, creds)))
        }
    }
}

/// Outcome of resolving one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    NotFound(String),
    Corrupt(String),
    Unavailable(String),
}

impl CheckStatus {
    fn from_error(err: &KnowledgeError) -> Self {
        match err {
            KnowledgeError::NotFound { kind, .. } => CheckStatus::NotFound(kind.to_string()),
            KnowledgeError::CorruptDocument { reason, .. } => CheckStatus::Corrupt(reason.clone()),
            KnowledgeError::StoreUnavailable { reason, .. } => {
                CheckStatus::Unavailable(reason.clone())
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, CheckStatus::Ok)
    }

    pub fn label(&self) -> &'static str {
        match self {
            CheckStatus::Ok => "ok",
            CheckStatus::NotFound(_) => "not_found",
            CheckStatus::Corrupt(_) => "corrupt_document",
            CheckStatus::Unavailable(_) => "store_unavailable",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            CheckStatus::Ok => None,
            CheckStatus::NotFound(d) | CheckStatus::Corrupt(d) | CheckStatus::Unavailable(d) => {
                Some(d)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct EntryCheck {
    pub id: String,
    pub status: CheckStatus,
}

#[derive(Debug, Clone)]
pub struct CatalogReport {
    /// One check per catalog entry, in catalog order.
    pub entries: Vec<EntryCheck>,
    pub warnings: Vec<DataQualityWarning>,
}

impl CatalogReport {
    pub fn failures(&self) -> impl Iterator<Item = &EntryCheck> {
        self.entries.iter().filter(|e| !e.status.is_ok())
    }

    pub fn is_healthy(&self) -> bool {
        self.failures().next().is_none()
    }
}
