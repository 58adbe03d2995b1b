//! SOP retrieval by id.
//!
//! Used by both the `sopkb get` CLI command and the `POST /tools/get_sop`
//! HTTP endpoint.

use anyhow::Result;
use serde::Serialize;

use sop_knowledge_core::render::copy_text;
use sop_knowledge_core::Sop;

use crate::config::Config;
use crate::service::KnowledgeService;

/// Tool-call view of an SOP, as handed to the conversational layer.
#[derive(Debug, Clone, Serialize)]
pub struct SopToolResponse {
    pub sop_id: String,
    pub title: String,
    pub category: String,
    pub content: String,
    pub image_urls: Vec<String>,
    pub image_count: usize,
}

impl From<Sop> for SopToolResponse {
    fn from(sop: Sop) -> Self {
        Self {
            image_count: sop.images.len(),
            sop_id: sop.id,
            title: sop.title,
            category: sop.category,
            content: sop.content,
            image_urls: sop.images,
        }
    }
}

/// CLI entry point for `sopkb get`.
pub async fn run_get(config: &Config, id: &str, json: bool) -> Result<()> {
    let service = KnowledgeService::from_config(config)?;

    let sop = match service.get_sop(id).await {
        Ok(sop) => sop,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&sop)?);
        return Ok(());
    }

    println!("--- {} ---", sop.id);
    println!("{}", copy_text(&sop));
    if !sop.images.is_empty() {
        println!();
        for (i, url) in sop.images.iter().enumerate() {
            println!("image {}: {}", i + 1, url);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_response_counts_images() {
        let sop = Sop {
            id: "sop-a".into(),
            title: "A".into(),
            category: "General".into(),
            keywords: vec![],
            content: "body".into(),
            images: vec!["u1".into(), "u2".into()],
            last_updated: None,
        };
        let resp = SopToolResponse::from(sop);
        assert_eq!(resp.sop_id, "sop-a");
        assert_eq!(resp.image_count, 2);
        assert_eq!(resp.image_urls, vec!["u1", "u2"]);
    }
}
