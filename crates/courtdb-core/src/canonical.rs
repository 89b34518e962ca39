//! Booking URL canonicalization for deduplication.
//!
//! The canonical form is a comparison key only, never a navigable URL: the
//! scheme is dropped so `http://` and `https://` spellings of the same
//! booking page collapse together.

use serde::Serialize;
use url::Url;

/// A canonicalized booking URL used as an index key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CanonicalUrlKey(String);

impl CanonicalUrlKey {
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        Self(canonicalize(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for CanonicalUrlKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalize a raw URL into a scheme-less dedup key.
///
/// Never fails: input that does not parse as a URL with a host falls back
/// to its trimmed, lower-cased form with trailing slashes removed.
#[must_use]
pub fn canonicalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let candidate = if !trimmed.contains("://") && looks_like_bare_host(trimmed) {
        format!("https://{trimmed}")
    } else {
        trimmed.to_string()
    };

    match Url::parse(&candidate) {
        Ok(url) if url.host_str().is_some_and(|h| !h.is_empty()) => canonical_key(&url),
        _ => fallback_key(trimmed),
    }
}

fn canonical_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    let mut key = host;

    // Web ports are dropped for either scheme since the key is scheme-less.
    if let Some(port) = url.port().filter(|p| *p != 80 && *p != 443) {
        key.push(':');
        key.push_str(&port.to_string());
    }

    let path = url.path().to_lowercase();
    key.push_str(path.trim_end_matches('/'));

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if !pairs.is_empty() {
        pairs.sort();
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish();
        key.push('?');
        key.push_str(&encoded);
    }

    key
}

fn fallback_key(trimmed: &str) -> String {
    trimmed.to_lowercase().trim_end_matches('/').to_string()
}

/// `example.com/book` style input: a dotted host made of host characters,
/// with an optional numeric port, optionally followed by a path.
fn looks_like_bare_host(s: &str) -> bool {
    let authority = s.split(['/', '?', '#']).next().unwrap_or_default();
    let host = match authority.split_once(':') {
        Some((host, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            host
        }
        Some(_) => return false,
        None => authority,
    };
    host.contains('.')
        && !host.starts_with('.')
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}
