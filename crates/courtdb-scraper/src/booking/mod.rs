//! Booking-page discovery.
//!
//! Tries strategies in priority order and stops at the first hit:
//! provider-host links on the homepage, keyword-scored homepage links,
//! common booking paths, and (repair only) a web-search fallback. Every
//! strategy swallows its own fetch failures, so discovery always yields a
//! [`DiscoveryAttempt`].

mod probe;
mod score;
mod search;

use std::time::Duration;

use courtdb_core::CanonicalUrlKey;

use crate::fetch::Fetcher;
use crate::links::{extract_links, origin_of};
use crate::providers::ProviderHosts;

pub use probe::{probe_urls, PROBE_PATHS};
pub use score::{best_link, has_intent, score_link, score_links, ScoredLink, ACCEPT_THRESHOLD};
pub use search::{build_queries, extract_result_links, rank_results, search_page_url};

const DEFAULT_PROBE_DELAY: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMethod {
    ProviderHost,
    KeywordAnchor,
    PathProbe,
    SearchFallback,
}

impl DiscoveryMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DiscoveryMethod::ProviderHost => "provider_host",
            DiscoveryMethod::KeywordAnchor => "keyword_anchor",
            DiscoveryMethod::PathProbe => "path_probe",
            DiscoveryMethod::SearchFallback => "search_fallback",
        }
    }
}

impl std::fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    Found { url: String, method: DiscoveryMethod },
    NotFound,
}

/// Scored homepage links plus the terminal outcome of one discovery run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryAttempt {
    pub candidates: Vec<ScoredLink>,
    pub outcome: DiscoveryOutcome,
}

impl DiscoveryAttempt {
    #[must_use]
    pub fn found(&self) -> Option<(&str, DiscoveryMethod)> {
        match &self.outcome {
            DiscoveryOutcome::Found { url, method } => Some((url.as_str(), *method)),
            DiscoveryOutcome::NotFound => None,
        }
    }
}

/// What is known about a venue whose stored booking URL failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairQuery {
    pub name: String,
    pub city: String,
    pub state: Option<String>,
    pub original_url: String,
}

pub struct BookingDiscoverer {
    fetcher: Fetcher,
    providers: ProviderHosts,
    probe_delay: Duration,
    search_url: Option<String>,
}

impl BookingDiscoverer {
    #[must_use]
    pub fn new(fetcher: Fetcher, providers: ProviderHosts) -> Self {
        Self {
            fetcher,
            providers,
            probe_delay: DEFAULT_PROBE_DELAY,
            search_url: None,
        }
    }

    /// Pause between consecutive probe and search requests.
    #[must_use]
    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = delay;
        self
    }

    /// Enable the search fallback in [`BookingDiscoverer::repair`].
    #[must_use]
    pub fn with_search_url(mut self, search_url: &str) -> Self {
        self.search_url = Some(search_url.to_string());
        self
    }

    #[must_use]
    pub fn providers(&self) -> &ProviderHosts {
        &self.providers
    }

    /// Find the booking page of a venue website.
    ///
    /// A website that is itself on a provider host is its own booking page.
    pub async fn discover(&self, website: &str) -> DiscoveryAttempt {
        if self.providers.matches_url(website) {
            return DiscoveryAttempt {
                candidates: Vec::new(),
                outcome: DiscoveryOutcome::Found {
                    url: website.to_string(),
                    method: DiscoveryMethod::ProviderHost,
                },
            };
        }

        let (candidates, found) = self.discover_on_site(website, None).await;
        DiscoveryAttempt {
            candidates,
            outcome: found.map_or(DiscoveryOutcome::NotFound, |(url, method)| {
                DiscoveryOutcome::Found { url, method }
            }),
        }
    }

    /// Find a replacement for a broken booking URL.
    ///
    /// Runs the site strategies on the original URL's origin, then falls
    /// back to web search when a search endpoint is configured. Origins on a
    /// provider host go straight to search. The original URL is never
    /// proposed as its own replacement.
    pub async fn repair(&self, query: &RepairQuery) -> DiscoveryAttempt {
        let original = query.original_url.trim();
        let with_scheme = if original.contains("://") {
            original.to_string()
        } else {
            format!("https://{original}")
        };

        let exclude = CanonicalUrlKey::from_raw(original);
        let mut candidates = Vec::new();
        let origin = origin_of(&with_scheme).filter(|o| !self.providers.matches_url(o));
        if let Some(origin) = origin {
            let (scored, found) = self.discover_on_site(&origin, Some(&exclude)).await;
            candidates = scored;
            if let Some((url, method)) = found {
                return DiscoveryAttempt {
                    candidates,
                    outcome: DiscoveryOutcome::Found { url, method },
                };
            }
        }

        let outcome = match self.search(query).await {
            Some(url) => DiscoveryOutcome::Found {
                url,
                method: DiscoveryMethod::SearchFallback,
            },
            None => DiscoveryOutcome::NotFound,
        };
        DiscoveryAttempt {
            candidates,
            outcome,
        }
    }

    async fn discover_on_site(
        &self,
        website: &str,
        exclude: Option<&CanonicalUrlKey>,
    ) -> (Vec<ScoredLink>, Option<(String, DiscoveryMethod)>) {
        let is_excluded =
            |url: &str| exclude.is_some_and(|key| CanonicalUrlKey::from_raw(url) == *key);

        let mut scored = Vec::new();
        match self.fetcher.fetch_html(website).await {
            Ok(page) => {
                let mut links = extract_links(&page.body, &page.final_url);
                links.retain(|l| !is_excluded(&l.url));

                if let Some(link) = links.iter().find(|l| self.providers.matches_url(&l.url)) {
                    tracing::debug!(website, url = %link.url, "provider link on homepage");
                    let found = (link.url.clone(), DiscoveryMethod::ProviderHost);
                    return (score_links(&links, &self.providers), Some(found));
                }

                scored = score_links(&links, &self.providers);
                if let Some(best) = best_link(&scored) {
                    tracing::debug!(website, url = %best.url, score = best.score, "keyword link accepted");
                    let found = (best.url.clone(), DiscoveryMethod::KeywordAnchor);
                    return (scored, Some(found));
                }
            }
            Err(err) => {
                tracing::debug!(website, error = %err, "homepage fetch failed; probing paths");
            }
        }

        let probed =
            probe::probe_common_paths(&self.fetcher, website, &self.providers, self.probe_delay)
                .await
                .filter(|url| !is_excluded(url));
        (scored, probed.map(|url| (url, DiscoveryMethod::PathProbe)))
    }

    async fn search(&self, query: &RepairQuery) -> Option<String> {
        let search_url = self.search_url.as_deref()?;

        for (i, q) in build_queries(query).iter().enumerate() {
            if i > 0 {
                probe::pause(self.probe_delay).await;
            }
            let page_url = search_page_url(search_url, q);
            let page = match self.fetcher.fetch_html(&page_url).await {
                Ok(page) => page,
                Err(err) => {
                    tracing::debug!(query = %q, error = %err, "search request failed");
                    continue;
                }
            };
            let results = extract_result_links(&page.body, &page_url);
            if let Some(url) = rank_results(&results, &query.original_url) {
                tracing::debug!(query = %q, url, "search fallback hit");
                return Some(url);
            }
        }
        None
    }
}
