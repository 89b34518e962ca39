//! `repair`: look for replacement booking pages for failed links.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use courtdb_core::tabular::{self, Row};
use courtdb_core::{
    load_places, write_new_file, write_report, AppConfig, PlacesFile, RepairReport,
    RepairedLink, ValidationOutcome, ValidationReport,
};
use courtdb_scraper::{
    run_bounded, BookingDiscoverer, Fetcher, ProviderHosts, RepairQuery, TaskOutcome,
};

const FIXED_LINK_COLUMNS: &[&str] = &["id", "name", "city", "original_url", "new_url", "method"];

/// Fetches one repair may make, including the search fallback.
const FETCH_BUDGET_PER_REPAIR: u32 = 16;

/// Read a validation report written by `validate`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a validation report.
pub(crate) fn read_validation_report(path: &Path) -> anyhow::Result<ValidationReport> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not a validation report", path.display()))
}

/// State for `city`, taken from a configured place with the same locality.
fn state_for_city(places: Option<&PlacesFile>, city: &str) -> Option<String> {
    places?
        .places
        .iter()
        .find(|p| p.locality().eq_ignore_ascii_case(city.trim()))
        .and_then(|p| p.state.clone())
}

fn repair_query(failure: &ValidationOutcome, places: Option<&PlacesFile>) -> RepairQuery {
    RepairQuery {
        name: failure.name.clone(),
        city: failure.city.clone(),
        state: state_for_city(places, &failure.city),
        original_url: failure.original_url.clone(),
    }
}

fn fixed_link_row(link: &RepairedLink) -> Row {
    let mut row = Row::new();
    row.insert("id".to_string(), link.record_id.clone());
    row.insert("name".to_string(), link.name.clone());
    row.insert("city".to_string(), link.city.clone());
    row.insert("original_url".to_string(), link.original_url.clone());
    row.insert("new_url".to_string(), link.new_url.clone());
    row.insert("method".to_string(), link.method.clone());
    row
}

/// Run the repair job over the failures in `report_path`.
///
/// # Errors
///
/// Returns an error if the report is unreadable, the discoverer cannot be
/// built, or an artifact cannot be written. Per-venue failures are logged
/// and counted.
pub(crate) async fn run_repair(
    config: &AppConfig,
    report_path: &Path,
    output_dir: &Path,
    concurrency: Option<usize>,
) -> anyhow::Result<()> {
    let report = read_validation_report(report_path)?;

    // The places file only adds states and extra provider hosts here.
    let places = match load_places(&config.places_path) {
        Ok(places) => Some(places),
        Err(e) => {
            tracing::debug!(error = %e, "places file unavailable; repairing without it");
            None
        }
    };
    let providers = places
        .as_ref()
        .map_or_else(ProviderHosts::default, |p| {
            ProviderHosts::new(&p.extra_provider_hosts)
        });

    let timeout = Duration::from_secs(config.scraper_request_timeout_secs);
    let fetcher =
        Fetcher::new(&config.scraper_user_agent, timeout).context("failed to build fetcher")?;
    let discoverer = BookingDiscoverer::new(fetcher, providers)
        .with_probe_delay(Duration::from_millis(config.probe_delay_ms))
        .with_search_url(&config.search_url);

    let queries: Vec<RepairQuery> = report
        .failures
        .iter()
        .map(|f| repair_query(f, places.as_ref()))
        .collect();
    let concurrency = concurrency.unwrap_or(config.discovery_concurrency);
    let per_repair_timeout = timeout
        .saturating_add(Duration::from_millis(config.probe_delay_ms))
        .saturating_mul(FETCH_BUDGET_PER_REPAIR);

    tracing::info!(failures = queries.len(), concurrency, "repairing booking links");
    let results = run_bounded(&queries, concurrency, per_repair_timeout, |query| {
        let discoverer = &discoverer;
        async move { discoverer.repair(query).await }
    })
    .await;

    let mut updated: Vec<RepairedLink> = Vec::new();
    let mut unresolved = 0usize;
    for ((_, result), failure) in results.into_iter().zip(&report.failures) {
        let attempt = match result {
            TaskOutcome::Completed(attempt) => attempt,
            TaskOutcome::TimedOut | TaskOutcome::Panicked(_) => {
                tracing::warn!(name = %failure.name, city = %failure.city, "repair did not finish");
                unresolved += 1;
                continue;
            }
        };
        match attempt.found() {
            Some((url, method)) => {
                tracing::info!(name = %failure.name, city = %failure.city, %url, %method, "replacement found");
                updated.push(RepairedLink {
                    record_id: failure.record_id.clone(),
                    name: failure.name.clone(),
                    city: failure.city.clone(),
                    original_url: failure.original_url.clone(),
                    new_url: url.to_string(),
                    method: method.as_str().to_string(),
                });
            }
            None => {
                tracing::debug!(name = %failure.name, city = %failure.city, "no replacement found");
                unresolved += 1;
            }
        }
    }

    let rows: Vec<Row> = updated.iter().map(fixed_link_row).collect();
    let body =
        tabular::serialize(&rows, FIXED_LINK_COLUMNS).context("failed to encode fixed links")?;
    let fixed_path = write_new_file(output_dir, "fixed-links", "csv", body.as_bytes())
        .with_context(|| format!("failed to write fixed links under {}", output_dir.display()))?;

    let repair_report = RepairReport::new(report.failures.len(), updated);
    let repair_path = write_report(output_dir, "repair", &repair_report)
        .with_context(|| format!("failed to write repair report under {}", output_dir.display()))?;

    println!(
        "repair: {} attempted, {} fixed, {unresolved} unresolved; fixes {}, report {}",
        repair_report.attempted,
        repair_report.fixed_count,
        fixed_path.display(),
        repair_path.display()
    );
    Ok(())
}
