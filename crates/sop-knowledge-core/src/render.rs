//! Plain-text renderings handed to the conversational layer.
//!
//! [`format_toc`] produces the markdown table of contents injected into
//! the assistant's instructions; [`copy_text`] is the fallback text shown
//! when a rich SOP card cannot be rendered.

use crate::models::Sop;
use crate::toc::TocIndex;

/// Heading of the formatted table of contents.
pub const TOC_HEADING: &str = "# Amazon Seller Assistant - SOP Library";

/// Render the index as markdown, grouped by category in catalog order.
pub fn format_toc(index: &TocIndex) -> String {
    let mut lines = vec![format!("{}\n", TOC_HEADING)];

    for category in index.categories() {
        lines.push(format!("\n## {}", category));
        for entry in index.entries_in_category(category) {
            lines.push(format!("- **{}**: {}", entry.id, entry.title));
            if !entry.keywords.is_empty() {
                lines.push(format!("  - Keywords: {}", entry.keywords.join(", ")));
            }
        }
    }

    lines.join("\n")
}

/// Human-readable text version of a resolved SOP.
pub fn copy_text(sop: &Sop) -> String {
    let mut segments = vec![
        format!("SOP: {}", sop.title),
        format!("Category: {}", sop.category),
    ];

    if let Some(date) = sop.last_updated {
        segments.push(format!("Last updated: {}", date.format("%Y-%m-%d")));
    }

    segments.push(format!("\n{}", sop.content));

    if !sop.images.is_empty() {
        segments.push(format!(
            "\n{} reference image(s) attached.",
            sop.images.len()
        ));
    }

    if !sop.keywords.is_empty() {
        segments.push(format!("Keywords: {}", sop.keywords.join(", ")));
    }

    segments.join("\n").trim().to_string()
}
