//! Live resolution of stored booking links.

use std::time::Duration;

use courtdb_core::ValidationOutcome;
use reqwest::{Client, Response, StatusCode, Url};

use crate::error::ScraperError;

/// Statuses on which a HEAD is retried as GET.
const HEAD_REJECTED: [StatusCode; 3] = [
    StatusCode::METHOD_NOT_ALLOWED,
    StatusCode::FORBIDDEN,
    StatusCode::NOT_IMPLEMENTED,
];

/// Result of resolving one link. Never an error: failures are described in
/// `error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub original_url: String,
    pub normalized_url: String,
    pub scheme_added: bool,
    pub resolved_url: Option<String>,
    pub http_status: Option<u16>,
    pub error: Option<String>,
}

impl Resolution {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Whether the stored spelling differs from what should be stored.
    #[must_use]
    pub fn changed(&self) -> bool {
        if self.scheme_added || self.normalized_url != self.original_url.trim() {
            return true;
        }
        let Some(resolved) = self.resolved_url.as_deref() else {
            return false;
        };
        match (Url::parse(&self.normalized_url), Url::parse(resolved)) {
            (Ok(a), Ok(b)) => a != b,
            _ => resolved != self.normalized_url,
        }
    }

    #[must_use]
    pub fn into_outcome(self, record_id: String, name: String, city: String) -> ValidationOutcome {
        let changed = self.changed();
        ValidationOutcome {
            record_id,
            name,
            city,
            original_url: self.original_url,
            normalized_url: self.normalized_url,
            resolved_url: self.resolved_url,
            http_status: self.http_status,
            error: self.error,
            changed,
        }
    }
}

/// Trim, unwrap quotes and angle brackets, and default the scheme to https.
///
/// Returns the normalized URL and whether a scheme was added.
#[must_use]
pub fn normalize_link(raw: &str) -> (String, bool) {
    let mut s = raw.trim();
    loop {
        let unwrapped = s
            .strip_prefix('"')
            .and_then(|r| r.strip_suffix('"'))
            .or_else(|| s.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')))
            .or_else(|| s.strip_prefix('<').and_then(|r| r.strip_suffix('>')));
        match unwrapped {
            Some(inner) => s = inner.trim(),
            None => break,
        }
    }

    if s.is_empty() {
        return (String::new(), false);
    }
    if s.contains("://") {
        return (s.to_string(), false);
    }
    (format!("https://{}", s.trim_start_matches('/')), true)
}

/// HEAD-first link checker.
#[derive(Debug, Clone)]
pub struct LinkResolver {
    client: Client,
}

impl LinkResolver {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Resolve a stored link, following redirects.
    ///
    /// Any 2xx final status is a success.
    pub async fn resolve(&self, raw: &str) -> Resolution {
        let (normalized_url, scheme_added) = normalize_link(raw);
        let mut resolution = Resolution {
            original_url: raw.to_string(),
            normalized_url,
            scheme_added,
            resolved_url: None,
            http_status: None,
            error: None,
        };

        if resolution.normalized_url.is_empty() {
            resolution.error = Some("empty URL".to_string());
            return resolution;
        }
        let url = match Url::parse(&resolution.normalized_url) {
            Ok(url) if url.host_str().is_some() => url,
            Ok(_) => {
                resolution.error = Some("invalid URL: missing host".to_string());
                return resolution;
            }
            Err(e) => {
                resolution.error = Some(format!("invalid URL: {e}"));
                return resolution;
            }
        };

        match self.head_then_get(url).await {
            Ok(response) => {
                let status = response.status();
                resolution.http_status = Some(status.as_u16());
                resolution.resolved_url = Some(response.url().to_string());
                if !status.is_success() {
                    resolution.error = Some(format!("HTTP {}", status.as_u16()));
                }
            }
            Err(e) => {
                resolution.error = Some(describe_error(&e));
            }
        }

        resolution
    }

    async fn head_then_get(&self, url: Url) -> Result<Response, reqwest::Error> {
        let head = self.client.head(url.clone()).send().await?;
        if HEAD_REJECTED.contains(&head.status()) {
            tracing::debug!(%url, status = head.status().as_u16(), "HEAD rejected; retrying with GET");
            return self.client.get(url).send().await;
        }
        Ok(head)
    }
}

fn describe_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else if err.is_redirect() {
        "too many redirects".to_string()
    } else {
        err.to_string()
    }
}
