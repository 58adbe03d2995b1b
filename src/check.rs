//! `sopkb check`: verify that every catalog entry resolves.
//!
//! Prints one line per entry and the catalog's data-quality warnings, then
//! exits with status 1 if any entry failed.

use anyhow::Result;

use crate::config::Config;
use crate::service::{CatalogReport, KnowledgeService};

pub async fn run_check(config: &Config) -> Result<()> {
    let service = KnowledgeService::from_config(config)?;
    let report = service.check_catalog().await;

    print!("{}", render_report(&report, service.store_kind()));

    if !report.is_healthy() {
        std::process::exit(1);
    }
    Ok(())
}

fn render_report(report: &CatalogReport, store_kind: &str) -> String {
    let mut out = format!("Checking {} SOPs ({} store)\n", report.entries.len(), store_kind);

    for entry in &report.entries {
        match entry.status.detail() {
            Some(detail) => out.push_str(&format!(
                "  {:<18} {}: {}\n",
                entry.status.label(),
                entry.id,
                detail
            )),
            None => out.push_str(&format!("  {:<18} {}\n", entry.status.label(), entry.id)),
        }
    }

    if !report.warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for warning in &report.warnings {
            out.push_str(&format!("  {}\n", warning));
        }
    }

    let failed = report.failures().count();
    out.push_str(&format!(
        "\n{} ok, {} failed\n",
        report.entries.len() - failed,
        failed
    ));
    out
}
