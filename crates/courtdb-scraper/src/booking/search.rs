//! Web-search fallback for repair mode.
//!
//! Scrapes a public HTML results page, so it breaks whenever the engine
//! changes its markup. Callers treat an empty result as normal.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::Url;

use courtdb_core::canonicalize;

use super::RepairQuery;
use crate::links::{extract_links, registrable_domain_of};

const INTENT_SUBSTRINGS: &[&str] = &["book", "reserv", "hire", "court"];

/// Search queries for a venue, most specific first.
#[must_use]
pub fn build_queries(query: &RepairQuery) -> Vec<String> {
    let name = query.name.trim();
    let city = query.city.trim();
    let mut queries = vec![format!("{name} {city} booking")];
    if let Some(state) = query.state.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        queries.push(format!("{name} {city} {state} booking"));
    }
    queries.push(format!("{name} court booking"));
    queries
}

/// Results-page URL for `query` under the configured search endpoint.
#[must_use]
pub fn search_page_url(search_url: &str, query: &str) -> String {
    let encoded = utf8_percent_encode(query, NON_ALPHANUMERIC).to_string();
    let separator = if search_url.contains('?') { '&' } else { '?' };
    format!("{search_url}{separator}q={encoded}")
}

/// Result links from a search page, with redirect wrappers unwrapped.
///
/// Links back into the search engine itself are dropped.
#[must_use]
pub fn extract_result_links(html: &str, page_url: &str) -> Vec<String> {
    let engine_domain = registrable_domain_of(page_url);
    let mut results: Vec<String> = Vec::new();

    for link in extract_links(html, page_url) {
        let target = unwrap_redirect(&link.url).unwrap_or(link.url);
        let domain = registrable_domain_of(&target);
        if domain.is_none() || domain == engine_domain {
            continue;
        }
        if !results.contains(&target) {
            results.push(target);
        }
    }

    results
}

/// Target of a `...?uddg=<encoded>` style redirect link.
fn unwrap_redirect(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let target = parsed
        .query_pairs()
        .find(|(k, _)| k == "uddg" || k == "u" || k == "url")
        .map(|(_, v)| v.into_owned())?;
    let target = Url::parse(&target).ok()?;
    matches!(target.scheme(), "http" | "https").then(|| target.to_string())
}

/// Pick the most plausible booking page among search results.
///
/// Same registrable domain as the original URL beats a booking-looking URL,
/// which beats the first result. The original URL itself is never returned.
#[must_use]
pub fn rank_results(results: &[String], original_url: &str) -> Option<String> {
    let original_key = canonicalize(original_url);
    let candidates: Vec<&String> = results
        .iter()
        .filter(|r| canonicalize(r) != original_key)
        .collect();

    let original_domain = registrable_domain_of(&normalize_scheme(original_url));
    if let Some(domain) = original_domain {
        if let Some(hit) = candidates
            .iter()
            .find(|r| registrable_domain_of(r).as_deref() == Some(domain.as_str()))
        {
            return Some((*hit).clone());
        }
    }

    if let Some(hit) = candidates.iter().find(|r| {
        let lowered = r.to_ascii_lowercase();
        INTENT_SUBSTRINGS.iter().any(|s| lowered.contains(s))
    }) {
        return Some((*hit).clone());
    }

    candidates.first().map(|r| (*r).clone())
}

fn normalize_scheme(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(state: Option<&str>) -> RepairQuery {
        RepairQuery {
            name: "Fitzroy Tennis Club".to_string(),
            city: "Fitzroy".to_string(),
            state: state.map(str::to_string),
            original_url: "https://fitzroytc.com.au/old-booking".to_string(),
        }
    }

    #[test]
    fn queries_include_state_when_known() {
        assert_eq!(build_queries(&query(None)).len(), 2);
        let queries = build_queries(&query(Some("VIC")));
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[1], "Fitzroy Tennis Club Fitzroy VIC booking");
        assert!(queries.iter().all(|q| q.contains("booking")));
    }

    #[test]
    fn search_url_is_percent_encoded() {
        assert_eq!(
            search_page_url("https://html.duckduckgo.com/html/", "a b&c"),
            "https://html.duckduckgo.com/html/?q=a%20b%26c"
        );
        assert!(search_page_url("https://s.example/search?kl=au-en", "x").ends_with("&q=x"));
    }

    #[test]
    fn unwraps_uddg_redirects_and_drops_engine_links() {
        let html = r#"
            <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fplay.tennis.com.au%2Ffitzroytc&amp;rut=abc">Fitzroy TC</a>
            <a href="https://duckduckgo.com/settings">Settings</a>
            <a class="result__a" href="https://www.fitzroytc.com.au/courts">Courts</a>
            <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fplay.tennis.com.au%2Ffitzroytc&amp;rut=def">dup</a>
        "#;
        let results = extract_result_links(html, "https://html.duckduckgo.com/html/?q=x");
        assert_eq!(
            results,
            vec![
                "https://play.tennis.com.au/fitzroytc".to_string(),
                "https://www.fitzroytc.com.au/courts".to_string(),
            ]
        );
    }

    #[test]
    fn ranking_prefers_same_domain_then_intent_then_first() {
        let results = vec![
            "https://news.example.org/story".to_string(),
            "https://play.example.net/book/fitzroy".to_string(),
            "https://www.fitzroytc.com.au/courts".to_string(),
        ];
        assert_eq!(
            rank_results(&results, "https://fitzroytc.com.au/old-booking").as_deref(),
            Some("https://www.fitzroytc.com.au/courts")
        );
        assert_eq!(
            rank_results(&results, "https://gone.example.com/").as_deref(),
            Some("https://play.example.net/book/fitzroy")
        );
        assert_eq!(
            rank_results(&results[..1], "https://gone.example.com/").as_deref(),
            Some("https://news.example.org/story")
        );
        assert_eq!(rank_results(&[], "https://gone.example.com/"), None);
    }

    #[test]
    fn ranking_never_returns_the_original() {
        let results = vec!["http://fitzroytc.com.au/old-booking/".to_string()];
        assert_eq!(rank_results(&results, "fitzroytc.com.au/old-booking"), None);
    }
}
