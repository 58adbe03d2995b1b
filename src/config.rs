//! TOML configuration parsing, environment overrides, and validation.
//!
//! # Example
//!
//! ```toml
//! [catalog]
//! path = "config/sop_toc.json"
//!
//! [store]
//! backend = "s3"
//!
//! [store.s3]
//! sop_bucket = "seller-sops"
//! images_bucket = "seller-sop-images"
//! region = "us-east-2"
//!
//! [retrieval]
//! fetch_timeout_ms = 5000
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```
//!
//! # Environment Overrides
//!
//! Applied after the file is parsed (a `.env` file is honoured by the binary).
//! Relative `catalog.path` and `store.local.root` values, including
//! `SOP_LOCAL_ROOT`, are taken relative to the config file's directory.
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `SOP_STORE_BACKEND` | `store.backend` |
//! | `SOP_BUCKET` | `store.s3.sop_bucket` |
//! | `IMAGES_BUCKET` | `store.s3.images_bucket` |
//! | `AWS_REGION` | `store.s3.region` |
//! | `SOP_KEY_PREFIX` | `store.s3.prefix` |
//! | `SOP_S3_ENDPOINT` | `store.s3.endpoint_url` |
//! | `SOP_LOCAL_ROOT` | `store.local.root` |

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sop_knowledge_core::TocEntry;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogConfig {
    /// Grouped TOC file (`{"categories": {...}}`). Relative paths resolve
    /// against the config file's directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Inline entries, used when no `path` is given.
    #[serde(default)]
    pub entries: Vec<TocEntry>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Local,
    S3,
}

impl BackendKind {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "s3" => Ok(BackendKind::S3),
            other => bail!("Unknown store backend: '{}'. Must be local or s3.", other),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: BackendKind,
    #[serde(default)]
    pub local: Option<LocalStoreConfig>,
    #[serde(default)]
    pub s3: Option<S3StoreConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocalStoreConfig {
    pub root: PathBuf,
    #[serde(default = "default_image_placeholder")]
    pub image_placeholder: String,
}

fn default_image_placeholder() -> String {
    "https://placehold.co/800x600?text={name}".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct S3StoreConfig {
    pub sop_bucket: String,
    pub images_bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Prepended to `<id>.json` to form the object key.
    #[serde(default)]
    pub prefix: String,
    /// Custom endpoint for S3-compatible services; uses path-style addressing.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default = "default_presign_expiry")]
    pub presign_expiry_secs: u64,
}

fn default_region() -> String {
    "us-east-2".to_string()
}
fn default_presign_expiry() -> u64 {
    3600
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: default_fetch_timeout_ms(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl RetrievalConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

fn default_fetch_timeout_ms() -> u64 {
    5000
}
fn default_limit() -> usize {
    3
}
fn default_max_limit() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}
fn default_cache_ttl() -> u64 {
    900
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

/// Read, override from the environment, and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    if let Some(dir) = path.parent() {
        resolve_relative_paths(&mut config, dir);
    }

    validate(&config)?;
    Ok(config)
}

/// Anchor relative catalog and local store paths at `base`, the config file's directory.
pub fn resolve_relative_paths(config: &mut Config, base: &Path) {
    if let Some(ref mut catalog_path) = config.catalog.path {
        if catalog_path.is_relative() {
            *catalog_path = base.join(&*catalog_path);
        }
    }
    if let Some(ref mut local) = config.store.local {
        if local.root.is_relative() {
            local.root = base.join(&local.root);
        }
    }
}

/// Apply environment overrides using `lookup` as the variable source.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(backend) = lookup("SOP_STORE_BACKEND") {
        config.store.backend = BackendKind::parse(&backend)?;
    }

    if let Some(root) = lookup("SOP_LOCAL_ROOT") {
        match config.store.local {
            Some(ref mut local) => local.root = PathBuf::from(root),
            None => {
                config.store.local = Some(LocalStoreConfig {
                    root: PathBuf::from(root),
                    image_placeholder: default_image_placeholder(),
                })
            }
        }
    }

    let sop_bucket = lookup("SOP_BUCKET");
    let images_bucket = lookup("IMAGES_BUCKET");
    if config.store.s3.is_none() {
        if let (Some(sop), Some(images)) = (sop_bucket.clone(), images_bucket.clone()) {
            config.store.s3 = Some(S3StoreConfig {
                sop_bucket: sop,
                images_bucket: images,
                region: default_region(),
                prefix: String::new(),
                endpoint_url: None,
                presign_expiry_secs: default_presign_expiry(),
            });
        }
    }
    if let Some(ref mut s3) = config.store.s3 {
        if let Some(bucket) = sop_bucket {
            s3.sop_bucket = bucket;
        }
        if let Some(bucket) = images_bucket {
            s3.images_bucket = bucket;
        }
        if let Some(region) = lookup("AWS_REGION") {
            s3.region = region;
        }
        if let Some(prefix) = lookup("SOP_KEY_PREFIX") {
            s3.prefix = prefix;
        }
        if let Some(endpoint) = lookup("SOP_S3_ENDPOINT") {
            s3.endpoint_url = Some(endpoint);
        }
    }

    Ok(())
}

/// Check cross-field constraints that serde cannot express.
pub fn validate(config: &Config) -> Result<()> {
    if config.catalog.path.is_none() && config.catalog.entries.is_empty() {
        bail!("catalog must set `path` or list `entries`");
    }

    match config.store.backend {
        BackendKind::Local => {
            if config.store.local.is_none() {
                bail!("store.backend is 'local' but [store.local] is missing");
            }
        }
        BackendKind::S3 => {
            let s3 = config
                .store
                .s3
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("store.backend is 's3' but [store.s3] is missing"))?;
            if s3.sop_bucket.trim().is_empty() || s3.images_bucket.trim().is_empty() {
                bail!("store.s3.sop_bucket and store.s3.images_bucket must not be empty");
            }
            if !(1..=604_800).contains(&s3.presign_expiry_secs) {
                bail!("store.s3.presign_expiry_secs must be in [1, 604800]");
            }
        }
    }

    if config.retrieval.fetch_timeout_ms == 0 {
        bail!("retrieval.fetch_timeout_ms must be > 0");
    }
    if config.retrieval.default_limit == 0 {
        bail!("retrieval.default_limit must be >= 1");
    }
    if config.retrieval.default_limit > config.retrieval.max_limit {
        bail!("retrieval.default_limit must not exceed retrieval.max_limit");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(toml_src: &str) -> Config {
        toml::from_str(toml_src).unwrap()
    }

    const LOCAL: &str = r#"
[catalog]
path = "sop_toc.json"

[store]
backend = "local"

[store.local]
root = "./sops"
"#;

    #[test]
    fn defaults_are_applied() {
        let cfg = parse(LOCAL);
        assert_eq!(cfg.retrieval.fetch_timeout_ms, 5000);
        assert_eq!(cfg.retrieval.default_limit, 3);
        assert!(cfg.cache.enabled);
        assert_eq!(cfg.server.bind, "127.0.0.1:7341");
        assert!(cfg
            .store
            .local
            .as_ref()
            .unwrap()
            .image_placeholder
            .contains("{name}"));
        validate(&cfg).unwrap();
    }

    #[test]
    fn s3_backend_requires_section() {
        let mut cfg = parse(LOCAL);
        cfg.store.backend = BackendKind::S3;
        let err = validate(&cfg).unwrap_err().to_string();
        assert!(err.contains("[store.s3]"), "{}", err);
    }

    #[test]
    fn env_overrides_build_s3_section() {
        let mut cfg = parse(LOCAL);
        let env: HashMap<&str, &str> = [
            ("SOP_STORE_BACKEND", "s3"),
            ("SOP_BUCKET", "env-sops"),
            ("IMAGES_BUCKET", "env-images"),
            ("AWS_REGION", "eu-west-1"),
        ]
        .into_iter()
        .collect();
        apply_env_overrides(&mut cfg, |k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(cfg.store.backend, BackendKind::S3);
        let s3 = cfg.store.s3.as_ref().unwrap();
        assert_eq!(s3.sop_bucket, "env-sops");
        assert_eq!(s3.images_bucket, "env-images");
        assert_eq!(s3.region, "eu-west-1");
        validate(&cfg).unwrap();
    }

    #[test]
    fn unknown_backend_override_is_rejected() {
        let mut cfg = parse(LOCAL);
        let err = apply_env_overrides(&mut cfg, |k| {
            (k == "SOP_STORE_BACKEND").then(|| "ftp".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("ftp"));
    }

    #[test]
    fn limits_are_checked() {
        let mut cfg = parse(LOCAL);
        cfg.retrieval.default_limit = 20;
        assert!(validate(&cfg).is_err());
        cfg.retrieval.default_limit = 0;
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn catalog_source_is_required() {
        let cfg = parse(
            r#"
[catalog]

[store]
backend = "local"

[store.local]
root = "./sops"
"#,
        );
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn inline_catalog_entries_parse() {
        let cfg = parse(
            r#"
[[catalog.entries]]
id = "sop-fba-prep"
title = "FBA Prep"
category = "Fulfillment"
keywords = ["fba", "prep"]

[store]
backend = "local"

[store.local]
root = "./sops"
"#,
        );
        assert_eq!(cfg.catalog.entries.len(), 1);
        assert_eq!(cfg.catalog.entries[0].keywords, vec!["fba", "prep"]);
    }

    #[test]
    fn relative_paths_follow_the_config_dir() {
        let mut cfg = parse(LOCAL);
        resolve_relative_paths(&mut cfg, Path::new("/etc/sopkb"));
        assert_eq!(
            cfg.catalog.path,
            Some(PathBuf::from("/etc/sopkb/sop_toc.json"))
        );
        assert_eq!(
            cfg.store.local.unwrap().root,
            PathBuf::from("/etc/sopkb/./sops")
        );

        let mut cfg = parse(LOCAL);
        cfg.store.local.as_mut().unwrap().root = PathBuf::from("/srv/sops");
        resolve_relative_paths(&mut cfg, Path::new("/etc/sopkb"));
        assert_eq!(cfg.store.local.unwrap().root, PathBuf::from("/srv/sops"));
    }

    #[test]
    fn load_config_anchors_local_root() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("sopkb.toml");
        std::fs::write(&config_path, LOCAL).unwrap();

        let cfg = load_config(&config_path).unwrap();
        assert_eq!(cfg.catalog.path, Some(tmp.path().join("sop_toc.json")));
        assert_eq!(cfg.store.local.unwrap().root, tmp.path().join("./sops"));
    }
}
