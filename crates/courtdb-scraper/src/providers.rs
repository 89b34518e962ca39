//! Booking-platform host allowlist.

use reqwest::Url;

/// Host markers of booking-platform operators, matched as substrings of
/// the lower-cased host.
pub const BUILTIN_PROVIDER_MARKERS: &[&str] = &[
    "clubspark",
    "playtomic",
    "courtreserve",
    "skedda",
    "bookeo",
    "simplybook",
    "setmore",
    "calendly",
    "acuityscheduling",
    "bookwhen",
    "matchi",
    "playbypoint",
    "teamup",
    "mindbodyonline",
    "bookable",
    "hellocourts",
    "tennisbookings",
    "sportlomo",
    "activecarrot",
];

#[derive(Debug, Clone)]
pub struct ProviderHosts {
    markers: Vec<String>,
}

impl Default for ProviderHosts {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl ProviderHosts {
    /// Built-in markers plus any configured extra hosts.
    #[must_use]
    pub fn new(extra_hosts: &[String]) -> Self {
        let mut markers: Vec<String> = BUILTIN_PROVIDER_MARKERS
            .iter()
            .map(|m| (*m).to_string())
            .collect();
        for host in extra_hosts {
            let host = host.trim().to_lowercase();
            if !host.is_empty() && !markers.contains(&host) {
                markers.push(host);
            }
        }
        Self { markers }
    }

    #[must_use]
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.markers.iter().any(|m| host.contains(m.as_str()))
    }

    /// Whether an absolute http(s) URL points at a provider host.
    #[must_use]
    pub fn matches_url(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .and_then(|u| u.host_str().map(|h| self.matches_host(h)))
            .unwrap_or(false)
    }

    /// Whether a page body references any provider host.
    #[must_use]
    pub fn mentioned_in(&self, body: &str) -> bool {
        let lowered = body.to_ascii_lowercase();
        self.markers.iter().any(|m| lowered.contains(m.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_marker_matches_subdomain() {
        let hosts = ProviderHosts::default();
        assert!(hosts.matches_url("https://clubspark.lta.org.uk/FitzroyTC/Booking"));
        assert!(hosts.matches_url("https://app.Playtomic.io/club/x"));
    }

    #[test]
    fn unrelated_and_relative_urls_do_not_match() {
        let hosts = ProviderHosts::default();
        assert!(!hosts.matches_url("https://fitzroytennis.example.com/book"));
        assert!(!hosts.matches_url("/clubspark/book"));
        assert!(!hosts.matches_url("mailto:clubspark@example.com"));
    }

    #[test]
    fn extra_hosts_extend_the_allowlist() {
        let hosts = ProviderHosts::new(&["Bookings.Council.example".to_string()]);
        assert!(hosts.matches_host("bookings.council.example"));
        assert!(hosts.matches_url("https://bookings.council.example/venues/12"));
    }

    #[test]
    fn body_mentions() {
        let hosts = ProviderHosts::default();
        assert!(hosts.mentioned_in("<iframe src=\"https://widget.bookwhen.com/x\">"));
        assert!(!hosts.mentioned_in("<p>Call us to book</p>"));
    }
}
