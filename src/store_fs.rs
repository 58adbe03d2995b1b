//! Local filesystem document store.
//!
//! Reads `<root>/<id>.json`. Intended for offline operation and tests:
//! image locators are not resolved against real storage but mapped onto a
//! placeholder URL template, where `{name}` is replaced by the locator's
//! file name.
//!
//! # Configuration
//!
//! ```toml
//! [store.local]
//! root = "./sops"
//! image_placeholder = "https://placehold.co/800x600?text={name}"
//! ```

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sop_knowledge_core::store::{is_safe_id, is_web_url, DocumentStore};
use sop_knowledge_core::StoreError;

use crate::config::LocalStoreConfig;

pub struct LocalStore {
    root: PathBuf,
    image_placeholder: String,
}

impl LocalStore {
    pub fn new(config: &LocalStoreConfig) -> Self {
        Self {
            root: config.root.clone(),
            image_placeholder: config.image_placeholder.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    fn kind(&self) -> &str {
        "local"
    }

    async fn fetch_raw(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        if !is_safe_id(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let path = self.document_path(id);
        tracing::debug!(path = %path.display(), "reading SOP from disk");

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(StoreError::Unavailable(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn resolve_image(&self, locator: &str) -> Result<String, StoreError> {
        if is_web_url(locator) {
            return Ok(locator.to_string());
        }
        let name = placeholder_name(locator);
        Ok(self
            .image_placeholder
            .replace("{name}", &encode_component(&name)))
    }
}

/// File name of a locator, without directories or bucket.
fn placeholder_name(locator: &str) -> String {
    let without_scheme = locator.trim_start_matches("s3://");
    without_scheme
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(without_scheme)
        .to_string()
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
