//! `import`: insert venues from a tabular file.

use std::path::Path;

use anyhow::Context;
use courtdb_core::{assemble, AppConfig, CatalogSnapshot, VenueRecord};

use crate::catalog;

/// Columns an import file must carry for its rows to be insertable.
const IMPORT_COLUMNS: &[&str] = &["name", "address", "booking_url"];

/// Read venues from `input`, drop duplicates of the catalog and of each
/// other, and upsert the rest.
///
/// # Errors
///
/// Returns an error if the input cannot be read, or the store is needed
/// and unavailable. Per-record upsert failures are logged and counted.
pub(crate) async fn run_import(
    config: &AppConfig,
    input: &Path,
    batch_size: usize,
    dry_run: bool,
) -> anyhow::Result<()> {
    let (_, rows) = catalog::read_rows(input, IMPORT_COLUMNS)?;
    let records: Vec<VenueRecord> = rows.iter().map(VenueRecord::from_row).collect();
    let read = records.len();

    // A dry run still dedupes against the catalog when credentials exist.
    let store = if dry_run && config.store_credentials().is_err() {
        None
    } else {
        Some(catalog::connect_store(config).await?)
    };

    let existing = match &store {
        Some(store) => store.list_venues().await.context("failed to read catalog")?,
        None => Vec::new(),
    };
    let snapshot = CatalogSnapshot::new(existing);
    let assembly = assemble(&snapshot, records);
    catalog::log_skipped(&assembly);

    if dry_run {
        for record in &assembly.accepted {
            println!("dry-run: would insert {} ({})", record.name, record.city);
        }
        println!(
            "import: {read} read, {} would be inserted, {} skipped, {} coordinate backfills (dry run)",
            assembly.accepted.len(),
            assembly.skipped.len(),
            assembly.backfills.len()
        );
        return Ok(());
    }

    // Only the dry-run path leaves `store` empty.
    let Some(store) = store else {
        anyhow::bail!("store client unavailable");
    };

    catalog::warn_unknown_sports(&store, &assembly.accepted).await;
    let totals = catalog::write_assembly(&store, &assembly, batch_size).await;

    println!(
        "import: {read} read, {} inserted, {} skipped, {} backfilled, {} failed",
        totals.inserted,
        assembly.skipped.len(),
        totals.backfilled,
        totals.failed
    );
    Ok(())
}
