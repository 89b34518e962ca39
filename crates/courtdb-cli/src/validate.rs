//! `validate`: resolve every booking URL and report the failures.
//!
//! The store is never written here. Results land in a new report file and
//! a corrected export; `apply` is the only path back into the store.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use courtdb_core::tabular::{self, Row};
use courtdb_core::{
    write_new_file, write_report, AppConfig, ValidationOutcome, ValidationReport, VENUE_COLUMNS,
};
use courtdb_scraper::{run_bounded, LinkResolver, TaskOutcome};

use crate::catalog;

/// One link to check, with enough context to report on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LinkToCheck {
    pub record_id: String,
    pub name: String,
    pub city: String,
    pub url: String,
}

impl LinkToCheck {
    /// `record_id` is `row:<n>` with `n` counted from 1 after the header.
    fn from_tabular(index: usize, row: &Row) -> Self {
        let cell = |name: &str| row.get(name).map(|v| v.trim().to_string()).unwrap_or_default();
        Self {
            record_id: format!("row:{}", index + 1),
            name: cell("name"),
            city: cell("city"),
            url: row.get("booking_url").cloned().unwrap_or_default(),
        }
    }

    fn failed(&self, error: String) -> ValidationOutcome {
        ValidationOutcome {
            record_id: self.record_id.clone(),
            name: self.name.clone(),
            city: self.city.clone(),
            original_url: self.url.clone(),
            normalized_url: courtdb_scraper::normalize_link(&self.url).0,
            resolved_url: None,
            http_status: None,
            error: Some(error),
            changed: false,
        }
    }
}

/// Copy `rows` with each booking URL replaced by its corrected form.
///
/// `outcomes` is index-aligned with `rows`.
pub(crate) fn corrected_rows(rows: &[Row], outcomes: &[ValidationOutcome]) -> (Vec<Row>, usize) {
    let mut corrected = 0usize;
    let rows = rows
        .iter()
        .zip(outcomes)
        .map(|(row, outcome)| {
            let mut row = row.clone();
            if let Some(url) = outcome.corrected_url() {
                row.insert("booking_url".to_string(), url.to_string());
                corrected += 1;
            }
            row
        })
        .collect();
    (rows, corrected)
}

/// Run the validation job over the store catalog or a tabular file.
///
/// # Errors
///
/// Returns an error if the input is unreadable, the store is needed and
/// unavailable, or an artifact cannot be written. Per-link failures are
/// reported, never raised.
pub(crate) async fn run_validate(
    config: &AppConfig,
    input: Option<&Path>,
    output_dir: &Path,
    concurrency: Option<usize>,
) -> anyhow::Result<()> {
    let (header, rows, links, extension) = match input {
        Some(path) => {
            let (header, rows) = catalog::read_rows(path, &["booking_url"])?;
            let links: Vec<LinkToCheck> = rows
                .iter()
                .enumerate()
                .map(|(i, row)| LinkToCheck::from_tabular(i, row))
                .collect();
            let extension = if catalog::delimiter_for(path) == tabular::TSV {
                "tsv"
            } else {
                "csv"
            };
            (header, rows, links, extension)
        }
        None => {
            let store = catalog::connect_store(config).await?;
            let venues = store.list_venues().await.context("failed to read catalog")?;
            let links: Vec<LinkToCheck> = venues
                .iter()
                .map(|v| LinkToCheck {
                    record_id: v.id.to_string(),
                    name: v.venue.name.clone(),
                    city: v.venue.city.clone(),
                    url: v.venue.booking_url.clone(),
                })
                .collect();
            let rows: Vec<Row> = venues.iter().map(courtdb_core::StoredVenue::to_row).collect();
            let header: Vec<String> = VENUE_COLUMNS.iter().map(|c| (*c).to_string()).collect();
            (header, rows, links, "csv")
        }
    };

    let timeout = Duration::from_secs(config.scraper_request_timeout_secs);
    let resolver = LinkResolver::new(&config.scraper_user_agent, timeout)
        .context("failed to build link resolver")?;
    let concurrency = concurrency.unwrap_or(config.validation_concurrency);

    tracing::info!(links = links.len(), concurrency, "validating booking links");
    // HEAD plus a GET retry, each bounded by the request timeout.
    let results = run_bounded(&links, concurrency, timeout.saturating_mul(3), |link| {
        let resolver = &resolver;
        async move { resolver.resolve(&link.url).await }
    })
    .await;

    let outcomes: Vec<ValidationOutcome> = results
        .into_iter()
        .zip(&links)
        .map(|((_, result), link)| match result {
            TaskOutcome::Completed(resolution) => {
                resolution.into_outcome(link.record_id.clone(), link.name.clone(), link.city.clone())
            }
            TaskOutcome::TimedOut => link.failed("validation timed out".to_string()),
            TaskOutcome::Panicked(message) => link.failed(format!("validation panicked: {message}")),
        })
        .collect();

    for outcome in outcomes.iter().filter(|o| o.is_failure()) {
        tracing::warn!(
            record_id = %outcome.record_id,
            name = %outcome.name,
            city = %outcome.city,
            url = %outcome.original_url,
            error = outcome.error.as_deref().unwrap_or_default(),
            "booking link failed"
        );
    }

    let report = ValidationReport::from_outcomes(&outcomes);
    let report_path = write_report(output_dir, "validation", &report)
        .with_context(|| format!("failed to write report under {}", output_dir.display()))?;

    let (export_rows, corrected) = corrected_rows(&rows, &outcomes);
    let header_refs: Vec<&str> = header.iter().map(String::as_str).collect();
    let delimiter = if extension == "tsv" { tabular::TSV } else { tabular::CSV };
    let body = tabular::serialize_delimited(&export_rows, &header_refs, delimiter)
        .context("failed to encode corrected export")?;
    let export_path = write_new_file(output_dir, "corrected", extension, body.as_bytes())
        .with_context(|| format!("failed to write export under {}", output_dir.display()))?;

    println!(
        "validate: {} checked, {} failed, {corrected} corrected; report {}, export {}",
        report.total,
        report.failed_count,
        report_path.display(),
        export_path.display()
    );
    Ok(())
}
