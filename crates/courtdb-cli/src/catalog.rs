//! Store-facing helpers shared by the command handlers, plus the `export`
//! and `dedupe` commands.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use anyhow::Context;
use courtdb_core::tabular::{self, Row};
use courtdb_core::{find_catalog_duplicates, AppConfig, Assembly, VenueRecord, VENUE_COLUMNS};
use courtdb_store::StoreClient;

/// Totals from writing one [`Assembly`] to the store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WriteTotals {
    pub inserted: usize,
    pub failed: usize,
    pub backfilled: usize,
}

/// Build a store client and confirm the store answers.
///
/// # Errors
///
/// Returns an error if credentials are missing, the client cannot be built,
/// or the ping fails.
pub(crate) async fn connect_store(config: &AppConfig) -> anyhow::Result<StoreClient> {
    let (url, api_key) = config.store_credentials()?;
    let store = StoreClient::new(url, api_key, config.scraper_request_timeout_secs)
        .context("failed to build store client")?;
    store.ping().await.context("store is unreachable")?;
    Ok(store)
}

/// Tab-separated for `.tsv` files, comma-separated otherwise.
pub(crate) fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => tabular::TSV,
        _ => tabular::CSV,
    }
}

/// Read a tabular file into its header and keyed rows.
///
/// # Errors
///
/// Returns an error if the file cannot be read, has no header, or its header
/// lacks any of the `required` columns.
pub(crate) fn read_rows(
    path: &Path,
    required: &[&str],
) -> anyhow::Result<(Vec<String>, Vec<Row>)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let (header, rows) = tabular::parse_delimited(&text, delimiter_for(path));
    if header.is_empty() {
        anyhow::bail!("{} has no header row", path.display());
    }
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|column| !header.iter().any(|h| h == column))
        .collect();
    if !missing.is_empty() {
        anyhow::bail!(
            "{} is missing required column(s): {}",
            path.display(),
            missing.join(", ")
        );
    }
    Ok((header, rows))
}

/// Write rows under `header` to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub(crate) fn write_rows(path: &Path, rows: &[Row], header: &[&str]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let body = tabular::serialize_delimited(rows, header, delimiter_for(path))
        .with_context(|| format!("failed to encode {}", path.display()))?;
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))
}

/// Sport tokens used by `records` that the reference table does not list.
pub(crate) fn unknown_sports<'a, I>(known: &HashSet<String>, records: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a VenueRecord>,
{
    records
        .into_iter()
        .flat_map(|r| r.sports.iter())
        .filter(|s| !known.contains(*s))
        .cloned()
        .collect()
}

/// Warn about sport tokens the store's `sports` table does not know.
///
/// A failed lookup is logged and otherwise ignored.
pub(crate) async fn warn_unknown_sports(store: &StoreClient, records: &[VenueRecord]) {
    let known = match store.list_sports().await {
        Ok(names) => names
            .iter()
            .filter_map(|n| courtdb_core::sports::normalize_sport(n))
            .collect::<HashSet<_>>(),
        Err(e) => {
            tracing::warn!(error = %e, "could not read sports reference table");
            return;
        }
    };

    let unknown = unknown_sports(&known, records);
    if !unknown.is_empty() {
        let list: Vec<&str> = unknown.iter().map(String::as_str).collect();
        tracing::warn!(sports = %list.join(", "), "sport tokens missing from reference table");
    }
}

/// Log every skipped record at debug level.
pub(crate) fn log_skipped(assembly: &Assembly) {
    for skipped in &assembly.skipped {
        tracing::debug!(
            name = %skipped.venue.name,
            city = %skipped.venue.city,
            reason = ?skipped.reason,
            "venue skipped"
        );
    }
}

/// Upsert accepted records and apply coordinate backfills.
///
/// Per-record failures are logged and counted; they never abort the run.
pub(crate) async fn write_assembly(
    store: &StoreClient,
    assembly: &Assembly,
    progress_every: usize,
) -> WriteTotals {
    let mut totals = WriteTotals::default();
    let progress_every = progress_every.max(1);

    for (i, record) in assembly.accepted.iter().enumerate() {
        match store.upsert_venue(record).await {
            Ok(()) => totals.inserted += 1,
            Err(e) => {
                tracing::warn!(
                    name = %record.name,
                    city = %record.city,
                    error = %e,
                    "failed to upsert venue"
                );
                totals.failed += 1;
            }
        }
        if (i + 1) % progress_every == 0 {
            tracing::info!(done = i + 1, total = assembly.accepted.len(), "upsert progress");
        }
    }

    for backfill in &assembly.backfills {
        match store
            .update_coordinates(backfill.id, backfill.latitude, backfill.longitude)
            .await
        {
            Ok(()) => totals.backfilled += 1,
            Err(e) => {
                tracing::warn!(id = backfill.id, error = %e, "failed to backfill coordinates");
                totals.failed += 1;
            }
        }
    }

    totals
}

/// Export the whole catalog to a tabular file.
///
/// # Errors
///
/// Returns an error if the store is unavailable or the file cannot be
/// written.
pub(crate) async fn run_export(config: &AppConfig, output: &Path) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let venues = store.list_venues().await.context("failed to read catalog")?;

    let rows: Vec<Row> = venues.iter().map(courtdb_core::StoredVenue::to_row).collect();
    write_rows(output, &rows, VENUE_COLUMNS)?;

    println!("export: {} venues written to {}", rows.len(), output.display());
    Ok(())
}

/// Remove catalog rows sharing a canonical booking URL, keeping the lowest id.
///
/// Without `apply` the groups are only listed.
///
/// # Errors
///
/// Returns an error if the store is unavailable. Individual delete failures
/// are logged and counted.
pub(crate) async fn run_dedupe(config: &AppConfig, apply: bool) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let venues = store.list_venues().await.context("failed to read catalog")?;
    let groups = find_catalog_duplicates(&venues);
    let duplicate_count: usize = groups.iter().map(|g| g.remove_ids.len()).sum();

    if !apply {
        for group in &groups {
            println!(
                "dry-run: {} keeps id {}, would delete {:?}",
                group.key.as_str(),
                group.keep_id,
                group.remove_ids
            );
        }
        println!(
            "dedupe: {} groups, {duplicate_count} duplicates (dry run; pass --apply to delete)",
            groups.len()
        );
        return Ok(());
    }

    let mut deleted = 0usize;
    let mut failed = 0usize;
    for group in &groups {
        for &id in &group.remove_ids {
            match store.delete_venue(id).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    tracing::warn!(id, keep_id = group.keep_id, error = %e, "failed to delete duplicate");
                    failed += 1;
                }
            }
        }
    }

    println!(
        "dedupe: {} groups, {deleted} deleted, {failed} failed",
        groups.len()
    );
    Ok(())
}

/// Configuration with no store credentials and unroutable endpoints.
#[cfg(test)]
pub(crate) fn offline_config() -> AppConfig {
    AppConfig {
        log_level: "info".to_string(),
        places_path: std::path::PathBuf::from("./config/places.yaml"),
        store_url: None,
        store_api_key: None,
        geocoder_url: "http://127.0.0.1:9".to_string(),
        overpass_url: "http://127.0.0.1:9".to_string(),
        search_url: "http://127.0.0.1:9".to_string(),
        scraper_request_timeout_secs: 1,
        scraper_user_agent: "courtdb-test".to_string(),
        discovery_concurrency: 1,
        validation_concurrency: 1,
        probe_delay_ms: 0,
        geo_query_delay_ms: 0,
    }
}
