//! `discover`: scan configured places for venues and find their booking
//! pages.
//!
//! Places are scanned one after another with a courtesy delay between
//! geographic queries; site crawls then run concurrently under the
//! configured ceiling.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use courtdb_core::tabular::Row;
use courtdb_core::{
    assemble, load_places, AppConfig, CatalogSnapshot, PlaceConfig, VenueCandidate, VenueRecord,
    VENUE_COLUMNS,
};
use courtdb_geo::GeoClient;
use courtdb_scraper::{run_bounded, BookingDiscoverer, Fetcher, ProviderHosts, TaskOutcome};

use crate::catalog;

/// Fetches one site crawl may make: homepage, every probe path and slack.
const FETCH_BUDGET_PER_SITE: u32 = 14;

#[derive(Debug)]
pub(crate) struct DiscoverArgs {
    pub places: Vec<String>,
    pub output: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub limit: Option<usize>,
    pub dry_run: bool,
}

/// A geographic candidate with a website, ready to crawl.
#[derive(Debug, Clone)]
struct CrawlTarget {
    candidate: VenueCandidate,
    website: String,
    locality: String,
}

#[derive(Debug, Default)]
struct CrawlTotals {
    found: usize,
    not_found: usize,
    timed_out: usize,
    panicked: usize,
}

/// Select the places named in `filter` (all places when empty).
///
/// A filter entry matches a place's full name or its locality,
/// case-insensitively.
///
/// # Errors
///
/// Returns an error naming the first filter entry that matches nothing.
pub(crate) fn select_places<'a>(
    places: &'a [PlaceConfig],
    filter: &[String],
) -> anyhow::Result<Vec<&'a PlaceConfig>> {
    if filter.is_empty() {
        return Ok(places.iter().collect());
    }

    let mut selected = Vec::new();
    for wanted in filter {
        let wanted = wanted.trim();
        let matches: Vec<&PlaceConfig> = places
            .iter()
            .filter(|p| p.name.eq_ignore_ascii_case(wanted) || p.locality().eq_ignore_ascii_case(wanted))
            .collect();
        if matches.is_empty() {
            anyhow::bail!("place '{wanted}' is not in the places file");
        }
        for place in matches {
            if !selected.iter().any(|s: &&PlaceConfig| s.name == place.name) {
                selected.push(place);
            }
        }
    }
    Ok(selected)
}

/// Keep candidates with a website, dropping repeats of the same source
/// element seen from overlapping places.
fn crawl_targets(
    candidates: Vec<(VenueCandidate, String)>,
    limit: Option<usize>,
) -> Vec<CrawlTarget> {
    let mut seen_places: HashSet<String> = HashSet::new();
    let mut targets = Vec::new();

    for (candidate, locality) in candidates {
        if let Some(place_id) = &candidate.place_id {
            if !seen_places.insert(place_id.clone()) {
                continue;
            }
        }
        let Some(website) = candidate.website() else {
            tracing::debug!(name = %candidate.name, city = %locality, "no website tag; skipping");
            continue;
        };
        targets.push(CrawlTarget {
            candidate,
            website,
            locality,
        });
        if limit.is_some_and(|limit| targets.len() >= limit) {
            break;
        }
    }

    targets
}

/// Run the discovery job.
///
/// # Errors
///
/// Returns an error if the places file is unusable, a required client
/// cannot be built, or the store is needed and unavailable. Per-place and
/// per-venue failures are logged and counted.
pub(crate) async fn run_discover(config: &AppConfig, args: &DiscoverArgs) -> anyhow::Result<()> {
    let places_file = load_places(&config.places_path)
        .with_context(|| format!("failed to load {}", config.places_path.display()))?;
    let places = select_places(&places_file.places, &args.places)?;

    // The store is needed to write; otherwise it only sharpens dedup.
    let writes_store = !args.dry_run && args.output.is_none();
    let store = if writes_store || config.store_credentials().is_ok() {
        Some(catalog::connect_store(config).await?)
    } else {
        None
    };
    let existing = match &store {
        Some(store) => store.list_venues().await.context("failed to read catalog")?,
        None => Vec::new(),
    };
    let snapshot = CatalogSnapshot::new(existing);

    let geo = GeoClient::with_base_urls(
        &config.geocoder_url,
        &config.overpass_url,
        &config.scraper_user_agent,
        config.scraper_request_timeout_secs,
    )
    .context("failed to build geographic client")?;

    let timeout = Duration::from_secs(config.scraper_request_timeout_secs);
    let fetcher =
        Fetcher::new(&config.scraper_user_agent, timeout).context("failed to build fetcher")?;
    let discoverer = BookingDiscoverer::new(
        fetcher,
        ProviderHosts::new(&places_file.extra_provider_hosts),
    )
    .with_probe_delay(Duration::from_millis(config.probe_delay_ms));

    let mut candidates: Vec<(VenueCandidate, String)> = Vec::new();
    let mut failed_places = 0usize;
    let geo_delay = Duration::from_millis(config.geo_query_delay_ms);

    for (i, place) in places.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(geo_delay).await;
        }
        let bbox = match geo.resolve_bounds(&place.name).await {
            Ok(bbox) => bbox,
            Err(e) => {
                tracing::warn!(place = %place.name, error = %e, "failed to resolve place");
                failed_places += 1;
                continue;
            }
        };
        tokio::time::sleep(geo_delay).await;
        match geo.query_elements(&bbox, places_file.sports_pattern()).await {
            Ok(found) => {
                tracing::info!(place = %place.name, candidates = found.len(), "venues found");
                let locality = place.locality().to_string();
                candidates.extend(found.into_iter().map(|c| (c, locality.clone())));
            }
            Err(e) => {
                tracing::warn!(place = %place.name, error = %e, "venue query failed");
                failed_places += 1;
            }
        }
    }

    let candidate_count = candidates.len();
    let targets = crawl_targets(candidates, args.limit);
    let concurrency = args.concurrency.unwrap_or(config.discovery_concurrency);
    let per_site_timeout = timeout
        .saturating_add(Duration::from_millis(config.probe_delay_ms))
        .saturating_mul(FETCH_BUDGET_PER_SITE);

    tracing::info!(sites = targets.len(), concurrency, "crawling venue websites");
    let outcomes = run_bounded(&targets, concurrency, per_site_timeout, |target| {
        let discoverer = &discoverer;
        async move { discoverer.discover(&target.website).await }
    })
    .await;

    let mut totals = CrawlTotals::default();
    let mut records: Vec<VenueRecord> = Vec::new();
    for (idx, outcome) in outcomes {
        let Some(target) = targets.get(idx) else {
            continue;
        };
        let attempt = match outcome {
            TaskOutcome::Completed(attempt) => attempt,
            TaskOutcome::TimedOut => {
                tracing::warn!(name = %target.candidate.name, city = %target.locality, "site crawl timed out");
                totals.timed_out += 1;
                continue;
            }
            TaskOutcome::Panicked(message) => {
                tracing::warn!(name = %target.candidate.name, city = %target.locality, %message, "site crawl panicked");
                totals.panicked += 1;
                continue;
            }
        };
        let Some((url, method)) = attempt.found() else {
            tracing::debug!(name = %target.candidate.name, website = %target.website, "no booking page found");
            totals.not_found += 1;
            continue;
        };
        totals.found += 1;
        tracing::debug!(name = %target.candidate.name, %url, %method, "booking page found");
        if let Some(record) = target.candidate.clone().into_record(url, &target.locality) {
            records.push(record);
        }
    }

    let assembly = assemble(&snapshot, records);
    catalog::log_skipped(&assembly);
    if let Some(store) = &store {
        catalog::warn_unknown_sports(store, &assembly.accepted).await;
    }

    let failed = failed_places + totals.timed_out + totals.panicked;
    let summary_head = format!(
        "discover: {candidate_count} candidates, {} crawled, {} booking pages found, {} not found",
        targets.len(),
        totals.found,
        totals.not_found
    );

    if let Some(output) = &args.output {
        let rows: Vec<Row> = assembly.accepted.iter().map(|r| r.to_row(None)).collect();
        catalog::write_rows(output, &rows, VENUE_COLUMNS)?;
        println!(
            "{summary_head}, {} written to {}, {} skipped, {failed} failed",
            rows.len(),
            output.display(),
            assembly.skipped.len()
        );
        return Ok(());
    }

    if args.dry_run {
        for record in &assembly.accepted {
            println!(
                "dry-run: would insert {} ({}) -> {}",
                record.name, record.city, record.booking_url
            );
        }
        println!(
            "{summary_head}, {} would be inserted, {} skipped, {failed} failed (dry run)",
            assembly.accepted.len(),
            assembly.skipped.len()
        );
        return Ok(());
    }

    let Some(store) = &store else {
        anyhow::bail!("store client unavailable");
    };
    let writes = catalog::write_assembly(store, &assembly, 50).await;
    println!(
        "{summary_head}, {} inserted, {} skipped, {} backfilled, {} failed",
        writes.inserted,
        assembly.skipped.len(),
        writes.backfilled,
        failed + writes.failed
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use courtdb_core::AddressParts;

    use super::*;

    fn place(name: &str) -> PlaceConfig {
        PlaceConfig {
            name: name.to_string(),
            state: None,
        }
    }

    fn candidate(id: u32, website: Option<&str>) -> VenueCandidate {
        let mut raw_tags = BTreeMap::new();
        if let Some(site) = website {
            raw_tags.insert("website".to_string(), site.to_string());
        }
        VenueCandidate {
            name: format!("Venue {id}"),
            raw_tags,
            latitude: -37.8,
            longitude: 144.9,
            address: AddressParts::default(),
            place_id: Some(format!("osm:node/{id}")),
        }
    }

    #[test]
    fn empty_filter_selects_every_place() {
        let places = vec![place("Fitzroy, Victoria"), place("Carlton, Victoria")];
        assert_eq!(select_places(&places, &[]).unwrap().len(), 2);
    }

    #[test]
    fn filter_matches_name_or_locality_ignoring_case() {
        let places = vec![place("Fitzroy, Victoria"), place("Carlton, Victoria")];
        let selected = select_places(&places, &["carlton".to_string()]).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "Carlton, Victoria");

        let selected = select_places(
            &places,
            &["FITZROY, VICTORIA".to_string(), "Fitzroy".to_string()],
        )
        .unwrap();
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn unknown_place_is_an_error() {
        let places = vec![place("Fitzroy, Victoria")];
        let err = select_places(&places, &["Hobart".to_string()]).unwrap_err();
        assert!(err.to_string().contains("Hobart"));
    }

    #[test]
    fn targets_need_a_website_and_skip_repeated_elements() {
        let candidates = vec![
            (candidate(1, Some("club1.example.com")), "Fitzroy".to_string()),
            (candidate(2, None), "Fitzroy".to_string()),
            (candidate(1, Some("club1.example.com")), "Carlton".to_string()),
            (candidate(3, Some("https://club3.example.com")), "Carlton".to_string()),
        ];
        let targets = crawl_targets(candidates, None);
        let sites: Vec<&str> = targets.iter().map(|t| t.website.as_str()).collect();
        assert_eq!(
            sites,
            vec!["https://club1.example.com", "https://club3.example.com"]
        );
        assert_eq!(targets[0].locality, "Fitzroy");
    }

    #[test]
    fn limit_caps_crawl_targets() {
        let candidates = (1..=5)
            .map(|i| (candidate(i, Some("https://club.example.com")), "Fitzroy".to_string()))
            .collect();
        assert_eq!(crawl_targets(candidates, Some(2)).len(), 2);
    }

    #[tokio::test]
    async fn catalog_is_read_before_any_geo_query() {
        use wiremock::matchers::{any, method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let store = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/venues"))
            .and(query_param("select", "id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&store)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/venues"))
            .and(query_param("order", "id.asc"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .expect(1)
            .mount(&store)
            .await;

        let geo = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&geo)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let places_path = dir.path().join("places.yaml");
        std::fs::write(&places_path, "places:\n  - name: \"Fitzroy, Victoria, Australia\"\n")
            .expect("write places");
        let output = dir.path().join("found.csv");

        let mut config = crate::catalog::offline_config();
        config.places_path = places_path;
        config.store_url = Some(format!("{}/rest/v1", store.uri()));
        config.store_api_key = Some("anon-key".to_string());
        config.geocoder_url = geo.uri();
        config.overpass_url = geo.uri();

        let args = DiscoverArgs {
            places: Vec::new(),
            output: Some(output.clone()),
            concurrency: None,
            limit: None,
            dry_run: false,
        };
        let err = run_discover(&config, &args)
            .await
            .expect_err("an unreadable catalog is fatal");

        assert!(err.to_string().contains("failed to read catalog"), "got: {err}");
        assert!(!output.exists());
    }
}

