//! HTML page fetching for the discovery engine.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, StatusCode};

use crate::error::ScraperError;

const BROWSER_FALLBACK_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// A fetched HTML document and the URL it was finally served from.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub final_url: String,
    pub body: String,
}

/// Shared HTTP client for page fetches, with a per-request timeout.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    user_agent: String,
}

impl Fetcher {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()?;
        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Fetch an HTML page.
    ///
    /// Tries the configured user agent first; a 403 or a bot-challenge page
    /// is retried once with a browser user agent.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::Http`] on network failure or timeout.
    /// - [`ScraperError::UnexpectedStatus`] on a non-2xx final status.
    /// - [`ScraperError::UnusableBody`] for non-HTML, empty or challenge pages.
    pub async fn fetch_html(&self, url: &str) -> Result<FetchedPage, ScraperError> {
        match self.fetch_html_as(url, &self.user_agent).await {
            Err(err) if is_blocked(&err) && self.user_agent != BROWSER_FALLBACK_UA => {
                tracing::debug!(url, error = %err, "retrying with browser user agent");
                self.fetch_html_as(url, BROWSER_FALLBACK_UA).await
            }
            other => other,
        }
    }

    async fn fetch_html_as(&self, url: &str, user_agent: &str) -> Result<FetchedPage, ScraperError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase);
        if let Some(content_type) = content_type.filter(|ct| !ct.contains("html")) {
            return Err(ScraperError::UnusableBody {
                url: url.to_owned(),
                reason: format!("content type {content_type}"),
            });
        }

        let final_url = response.url().to_string();
        let body = response.text().await?;
        if !is_usable_html(&body) {
            return Err(ScraperError::UnusableBody {
                url: url.to_owned(),
                reason: "empty or bot-challenge page".to_string(),
            });
        }

        Ok(FetchedPage { final_url, body })
    }
}

fn is_blocked(err: &ScraperError) -> bool {
    match err {
        ScraperError::UnexpectedStatus { status, .. } => *status == StatusCode::FORBIDDEN.as_u16(),
        ScraperError::UnusableBody { reason, .. } => reason.contains("challenge"),
        _ => false,
    }
}

pub(crate) fn is_usable_html(body: &str) -> bool {
    let trimmed = body.trim();
    !trimmed.is_empty() && !looks_like_bot_challenge(trimmed)
}

fn looks_like_bot_challenge(body: &str) -> bool {
    let lowered = body.to_ascii_lowercase();
    let has_cloudflare_banner = lowered.contains("attention required! | cloudflare");
    let has_challenge_platform = lowered.contains("/cdn-cgi/challenge-platform/");
    let has_just_a_moment = lowered.contains("just a moment...");
    let has_cookie_gate = lowered.contains("please enable cookies");
    let has_cf_chl = lowered.contains("cf-chl-");

    has_cloudflare_banner
        || has_challenge_platform
        || (has_just_a_moment && has_cookie_gate)
        || (has_just_a_moment && has_cf_chl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_page_is_usable() {
        assert!(is_usable_html("<html><body><a href='/book'>Book</a></body></html>"));
    }

    #[test]
    fn empty_page_is_not_usable() {
        assert!(!is_usable_html("   \n"));
    }

    #[test]
    fn cloudflare_challenge_is_not_usable() {
        let body = "<title>Just a moment...</title><script src=\"/cdn-cgi/challenge-platform/h/b\"></script>";
        assert!(!is_usable_html(body));
    }

    #[test]
    fn just_a_moment_alone_is_usable() {
        assert!(is_usable_html("<p>Just a moment... we are updating our timetable</p>"));
    }

    #[test]
    fn forbidden_counts_as_blocked() {
        let err = ScraperError::UnexpectedStatus {
            status: 403,
            url: "https://x.example".to_string(),
        };
        assert!(is_blocked(&err));
        let err = ScraperError::UnexpectedStatus {
            status: 404,
            url: "https://x.example".to_string(),
        };
        assert!(!is_blocked(&err));
    }
}
