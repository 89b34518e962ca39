//! Common booking-path probing.

use std::time::Duration;

use reqwest::Url;

use super::score::page_looks_bookable;
use crate::fetch::Fetcher;
use crate::providers::ProviderHosts;

pub const PROBE_PATHS: &[&str] = &[
    "/book",
    "/booking",
    "/bookings",
    "/book-now",
    "/bookonline",
    "/book-online",
    "/court-hire",
    "/court-bookings",
    "/venue-hire",
    "/facility-hire",
    "/hire",
];

/// Candidate probe URLs relative to the site origin.
#[must_use]
pub fn probe_urls(homepage: &str) -> Vec<String> {
    let Ok(base) = Url::parse(homepage) else {
        return Vec::new();
    };
    PROBE_PATHS
        .iter()
        .filter_map(|path| base.join(path).ok())
        .map(|u| u.to_string())
        .collect()
}

/// GET each common path in turn and return the first page that looks like a
/// booking page.
pub(crate) async fn probe_common_paths(
    fetcher: &Fetcher,
    homepage: &str,
    providers: &ProviderHosts,
    delay: Duration,
) -> Option<String> {
    for (i, url) in probe_urls(homepage).into_iter().enumerate() {
        if i > 0 {
            pause(delay).await;
        }
        match fetcher.fetch_html(&url).await {
            Ok(page) if page_looks_bookable(&page.body, providers) => {
                tracing::debug!(url, final_url = %page.final_url, "probe hit");
                return Some(url);
            }
            Ok(_) => tracing::debug!(url, "probe page has no booking intent"),
            Err(err) => tracing::debug!(url, error = %err, "probe failed"),
        }
    }
    None
}

/// Sleep for `delay` with ±25% jitter.
pub(crate) async fn pause(delay: Duration) {
    if delay.is_zero() {
        return;
    }
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered_ms = (delay.as_millis() as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
    tokio::time::sleep(Duration::from_millis(jittered_ms)).await;
}
