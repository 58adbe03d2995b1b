//! Catalog loading and the `sopkb toc` command.
//!
//! The catalog is read once at startup and injected into the
//! [`TocIndex`]. Two sources are supported:
//!
//! - a grouped TOC file, with categories and entries kept in file order:
//!
//!   ```json
//!   { "categories": {
//!       "Customer Service": [
//!         { "id": "sop-handling-returns", "title": "Handling Returns", "keywords": ["returns"] }
//!       ] } }
//!   ```
//!
//! - inline `[[catalog.entries]]` tables in the TOML config.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use sop_knowledge_core::render::format_toc;
use sop_knowledge_core::{Catalog, TocEntry, TocIndex};

use crate::config::Config;

#[derive(Debug, Deserialize)]
struct GroupedEntry {
    id: String,
    title: String,
    #[serde(default)]
    keywords: Vec<String>,
}

/// Parse the grouped TOC format.
///
/// Requires `serde_json`'s `preserve_order` feature so that category order
/// in the file becomes catalog order.
pub fn parse_grouped_toc(json: &str) -> Result<Catalog> {
    let root: Value = serde_json::from_str(json).context("TOC file is not valid JSON")?;

    let categories = match root.get("categories") {
        Some(Value::Object(map)) => map,
        Some(_) => bail!("TOC file: `categories` must be an object"),
        None => bail!("TOC file: missing `categories` object"),
    };

    let mut entries = Vec::new();
    for (category, list) in categories {
        let grouped: Vec<GroupedEntry> = serde_json::from_value(list.clone())
            .with_context(|| format!("TOC file: invalid entries in category '{}'", category))?;
        for entry in grouped {
            entries.push(TocEntry {
                id: entry.id,
                title: entry.title,
                category: category.clone(),
                keywords: entry.keywords,
            });
        }
    }

    Ok(Catalog::new(entries))
}

/// Load the catalog described by the config.
pub fn load_catalog(config: &Config) -> Result<Catalog> {
    match config.catalog.path {
        Some(ref path) => load_grouped_toc(path),
        None => Ok(Catalog::new(config.catalog.entries.clone())),
    }
}

pub fn load_grouped_toc(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read TOC file: {}", path.display()))?;
    parse_grouped_toc(&content).with_context(|| format!("Invalid TOC file: {}", path.display()))
}

/// Load the catalog and build the index, failing on duplicate ids.
pub fn build_index(config: &Config) -> Result<TocIndex> {
    let catalog = load_catalog(config)?;
    let index = TocIndex::new(catalog)?;
    tracing::info!(
        entries = index.len(),
        warnings = index.warnings().len(),
        "catalog loaded"
    );
    Ok(index)
}

/// CLI entry point for `sopkb toc`.
pub fn run_toc(config: &Config, json: bool) -> Result<()> {
    let index = build_index(config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(index.all_entries())?);
    } else {
        println!("{}", format_toc(&index));
    }
    Ok(())
}
