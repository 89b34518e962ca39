//! `apply`: write repaired booking URLs back to the store.
//!
//! Catalog rows are located by the canonical form of the broken URL, falling
//! back to name and city when exactly one row carries them. Updates always
//! target a store id.

use std::path::Path;

use anyhow::Context;
use courtdb_core::{
    canonicalize, AppConfig, CatalogSnapshot, RepairReport, RepairedLink, StoredVenue,
};

use crate::catalog;

/// One booking URL change bound to a catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlannedUpdate<'a> {
    pub id: i64,
    pub link: &'a RepairedLink,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ApplyPlan<'a> {
    pub updates: Vec<PlannedUpdate<'a>>,
    /// Rows already holding the new URL.
    pub current: usize,
    pub unmatched: Vec<&'a RepairedLink>,
}

/// Read a repair report written by `repair`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a repair report.
pub(crate) fn read_repair_report(path: &Path) -> anyhow::Result<RepairReport> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a repair report", path.display()))
}

/// Match every repaired link to a catalog row.
pub(crate) fn plan_updates<'a>(snapshot: &CatalogSnapshot, report: &'a RepairReport) -> ApplyPlan<'a> {
    let mut plan = ApplyPlan::default();

    for link in &report.updated {
        let Some(stored) = locate(snapshot, link) else {
            plan.unmatched.push(link);
            continue;
        };
        if canonicalize(&stored.venue.booking_url) == canonicalize(&link.new_url) {
            plan.current += 1;
            continue;
        }
        plan.updates.push(PlannedUpdate {
            id: stored.id,
            link,
        });
    }

    plan
}

fn locate<'s>(snapshot: &'s CatalogSnapshot, link: &RepairedLink) -> Option<&'s StoredVenue> {
    if let Some(stored) = snapshot.find_by_url(&link.original_url) {
        return Some(stored);
    }
    // Several rows share the name: only the broken URL could tell them apart.
    match snapshot.find_all_by_name_city(&link.name, &link.city).as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

/// Run the apply job.
///
/// # Errors
///
/// Returns an error if the report is unreadable or the store is unavailable.
/// Per-row update failures are logged and counted.
pub(crate) async fn run_apply(config: &AppConfig, fixes: &Path, dry_run: bool) -> anyhow::Result<()> {
    let report = read_repair_report(fixes)?;
    let store = catalog::connect_store(config).await?;
    let venues = store.list_venues().await.context("failed to read catalog")?;
    let snapshot = CatalogSnapshot::new(venues);

    let plan = plan_updates(&snapshot, &report);
    for link in &plan.unmatched {
        tracing::warn!(name = %link.name, city = %link.city, url = %link.original_url, "no catalog row for repaired link");
    }

    if dry_run {
        for update in &plan.updates {
            println!(
                "dry-run: id {} ({}, {}): {} -> {}",
                update.id,
                update.link.name,
                update.link.city,
                update.link.original_url,
                update.link.new_url
            );
        }
        println!(
            "apply: {} would be updated, {} already current, {} unmatched (dry run)",
            plan.updates.len(),
            plan.current,
            plan.unmatched.len()
        );
        return Ok(());
    }

    let mut updated = 0usize;
    let mut failed = 0usize;
    for update in &plan.updates {
        match store.update_booking_url(update.id, &update.link.new_url).await {
            Ok(()) => updated += 1,
            Err(e) => {
                tracing::warn!(
                    id = update.id,
                    name = %update.link.name,
                    city = %update.link.city,
                    error = %e,
                    "failed to update booking URL"
                );
                failed += 1;
            }
        }
    }

    println!(
        "apply: {updated} updated, {} already current, {} unmatched, {failed} failed",
        plan.current,
        plan.unmatched.len()
    );
    Ok(())
}
