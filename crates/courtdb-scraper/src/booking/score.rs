//! Booking-intent scoring of homepage links.

use std::sync::LazyLock;

use regex::Regex;

use crate::links::Link;
use crate::providers::ProviderHosts;

/// Booking intent at a word start: "Book now", "Reservations", "Court hire".
static INTENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(book|reserv|hire|court|facilit|venue|enrol|register)")
        .expect("valid intent regex")
});
static NARROW_INTENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(court|hire|reserv)").expect("valid narrow regex"));

const INTENT_POINTS: u32 = 2;
const NARROW_INTENT_POINTS: u32 = 1;
const PROVIDER_POINTS: u32 = 3;

/// Minimum score for a keyword-scored link to be accepted.
pub const ACCEPT_THRESHOLD: u32 = 2;

/// A homepage link with its booking score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredLink {
    pub url: String,
    pub text: String,
    pub score: u32,
}

#[must_use]
pub fn has_intent(text: &str) -> bool {
    INTENT_RE.is_match(text)
}

#[must_use]
pub fn score_link(link: &Link, providers: &ProviderHosts) -> u32 {
    let label = match &link.title {
        Some(title) => format!("{} {title}", link.text),
        None => link.text.clone(),
    };

    let mut score = 0;
    if INTENT_RE.is_match(&label) {
        score += INTENT_POINTS;
    }
    if NARROW_INTENT_RE.is_match(&label) {
        score += NARROW_INTENT_POINTS;
    }
    if providers.matches_url(&link.url) {
        score += PROVIDER_POINTS;
    }
    score
}

/// Score every link, keeping document order.
#[must_use]
pub fn score_links(links: &[Link], providers: &ProviderHosts) -> Vec<ScoredLink> {
    links
        .iter()
        .map(|link| ScoredLink {
            url: link.url.clone(),
            text: link.text.clone(),
            score: score_link(link, providers),
        })
        .collect()
}

/// Highest-scoring link at or above the threshold; earliest wins ties.
#[must_use]
pub fn best_link(scored: &[ScoredLink]) -> Option<&ScoredLink> {
    scored
        .iter()
        .filter(|s| s.score >= ACCEPT_THRESHOLD)
        .fold(None, |best: Option<&ScoredLink>, candidate| match best {
            Some(b) if b.score >= candidate.score => Some(b),
            _ => Some(candidate),
        })
}

/// Whether a probed page looks like a booking page.
#[must_use]
pub fn page_looks_bookable(body: &str, providers: &ProviderHosts) -> bool {
    providers.mentioned_in(body) || INTENT_RE.is_match(&crate::links::clean_text(body))
}
