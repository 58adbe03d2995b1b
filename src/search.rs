//! Free-text SOP search.
//!
//! Ranks catalog entries lexically and resolves the best matches. Used by
//! the `sopkb search` CLI command; the HTTP endpoints call
//! [`KnowledgeService::find_sops`] directly.

use anyhow::Result;
use serde::Serialize;

use sop_knowledge_core::Sop;

use crate::config::Config;
use crate::service::KnowledgeService;

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<Sop>,
}

/// CLI entry point for `sopkb search`.
pub async fn run_search(
    config: &Config,
    query: &str,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let service = KnowledgeService::from_config(config)?;
    let limit = limit.unwrap_or_else(|| service.default_limit());

    let results = service.find_sops(query, limit).await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&SearchResponse { results })?
        );
        return Ok(());
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, sop) in results.iter().enumerate() {
        println!("{}. {} / {}", i + 1, sop.category, sop.title);
        println!("    id: {}", sop.id);
        if !sop.keywords.is_empty() {
            println!("    keywords: {}", sop.keywords.join(", "));
        }
        if let Some(date) = sop.last_updated {
            println!("    updated: {}", date);
        }
        println!("    images: {}", sop.images.len());
        println!();
    }

    Ok(())
}
