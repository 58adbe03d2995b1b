//! Storage abstraction for SOP documents and image assets.
//!
//! The [`DocumentStore`] trait is the whole contract a backend has to
//! meet: fetch the raw bytes of a document by id, and turn an image
//! locator into a URL a browser can load. Backends are read-only and keep
//! no cache.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;

/// Read-only access to stored SOP documents.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`fetch_raw`](DocumentStore::fetch_raw) | Raw JSON bytes for an SOP id |
/// | [`resolve_image`](DocumentStore::resolve_image) | Storage locator to fetchable URL |
///
/// Backends must report absence as [`StoreError::NotFound`] and every
/// other failure as [`StoreError::Unavailable`]; the two are never
/// conflated.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend label for logs and status output (e.g. `"s3"`).
    fn kind(&self) -> &str;

    /// Fetch the raw stored representation of SOP `id`.
    async fn fetch_raw(&self, id: &str) -> Result<Vec<u8>, StoreError>;

    /// Resolve an image locator to a fetchable URL.
    ///
    /// Must be idempotent: a locator that is already an `http(s)` URL
    /// resolves to itself.
    async fn resolve_image(&self, locator: &str) -> Result<String, StoreError>;
}

/// True when `locator` is already a fetchable web URL.
pub fn is_web_url(locator: &str) -> bool {
    locator.starts_with("https://") || locator.starts_with("http://")
}

/// Rejects ids that could escape a key prefix or directory.
pub fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && !id.contains('/')
        && !id.contains('\\')
        && !id.contains("..")
        && !id.chars().any(|c| c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_urls_are_detected() {
        assert!(is_web_url("https://bucket.s3.amazonaws.com/a.png"));
        assert!(is_web_url("http://localhost/a.png"));
        assert!(!is_web_url("s3://bucket/a.png"));
        assert!(!is_web_url("images/a.png"));
    }

    #[test]
    fn unsafe_ids_are_rejected() {
        assert!(is_safe_id("sop-handling-returns"));
        assert!(!is_safe_id(""));
        assert!(!is_safe_id("../etc/passwd"));
        assert!(!is_safe_id("nested/id"));
        assert!(!is_safe_id("a\\b"));
    }
}
