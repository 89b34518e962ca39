//! Hyperlink extraction and URL helpers.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a>").expect("valid anchor regex"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<[^>]+>").expect("valid tags regex"));
static HREF_RE: LazyLock<Regex> = LazyLock::new(|| attr_regex("href"));
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| attr_regex("title"));

/// Second-level labels under which registrations happen one level deeper
/// (`club.com.au`, `council.gov.uk`).
const SECOND_LEVEL_LABELS: &[&str] = &["co", "com", "org", "net", "gov", "edu", "ac", "asn", "id"];

/// One hyperlink found on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Absolute http(s) target.
    pub url: String,
    /// Visible anchor text, tags stripped and whitespace collapsed.
    pub text: String,
    pub title: Option<String>,
}

/// Extract anchors from `html`, resolving relative targets against `base`.
///
/// Fragments, `mailto:`, `tel:` and `javascript:` targets are skipped, as
/// is anything that does not resolve to http(s). Document order is kept.
#[must_use]
pub fn extract_links(html: &str, base: &str) -> Vec<Link> {
    let Ok(base) = Url::parse(base) else {
        return Vec::new();
    };

    ANCHOR_RE
        .captures_iter(html)
        .filter_map(|cap| {
            let attrs = cap.get(1)?.as_str();
            let href = extract_attr(&HREF_RE, attrs)?;
            let url = absolutize(&base, &href)?;
            let text = clean_text(cap.get(2).map_or("", |m| m.as_str()));
            let title = extract_attr(&TITLE_RE, attrs).map(|t| clean_text(&t));
            Some(Link { url, text, title })
        })
        .collect()
}

fn absolutize(base: &Url, href: &str) -> Option<String> {
    let href = decode_entities(href.trim());
    let lowered = href.to_ascii_lowercase();
    if href.is_empty()
        || href.starts_with('#')
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("javascript:")
    {
        return None;
    }

    let mut url = base.join(&href).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

/// Matches `name=` only as a whole attribute, so `data-href` is not `href`.
/// Each quote style is captured on its own; the third group is unquoted.
fn attr_regex(name: &str) -> Regex {
    let pattern = format!(
        r#"(?is)(?:^|\s){}\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#,
        regex::escape(name)
    );
    Regex::new(&pattern).expect("valid attribute regex")
}

fn extract_attr(re: &Regex, attrs: &str) -> Option<String> {
    let caps = re.captures(attrs)?;
    let value = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
    Some(value.as_str().trim().to_string())
}

pub(crate) fn clean_text(input: &str) -> String {
    let no_tags = TAG_RE.replace_all(input, " ");
    decode_entities(&no_tags)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(input: &str) -> String {
    input
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Scheme, host and port of a URL: `https://example.com`.
#[must_use]
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str()?;
    Some(parsed.origin().ascii_serialization())
}

/// Approximate registrable domain of a host: the last two labels, or three
/// under common second-level labels of two-letter country domains.
#[must_use]
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host.parse::<std::net::IpAddr>().is_ok() {
        return host;
    }
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    let n = labels.len();
    if n <= 2 {
        return labels.join(".");
    }
    let tld = labels[n - 1];
    let second = labels[n - 2];
    let keep = if tld.len() == 2 && SECOND_LEVEL_LABELS.contains(&second) {
        3
    } else {
        2
    };
    labels[n - keep..].join(".")
}

/// Registrable domain of an absolute URL.
#[must_use]
pub fn registrable_domain_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(registrable_domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_links_in_document_order() {
        let html = r#"
            <a href="/about">About us</a>
            <a class="btn" href='book-now.html' title="Court hire">Book <b>now</b></a>
            <a href="https://clubspark.example.com/book#top">Courts</a>
        "#;
        let links = extract_links(html, "https://club.example.com/home/");
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].url, "https://club.example.com/about");
        assert_eq!(links[1].url, "https://club.example.com/home/book-now.html");
        assert_eq!(links[1].text, "Book now");
        assert_eq!(links[1].title.as_deref(), Some("Court hire"));
        assert_eq!(links[2].url, "https://clubspark.example.com/book");
    }

    #[test]
    fn skips_non_navigational_targets() {
        let html = r##"
            <a href="#main">Skip</a>
            <a href="mailto:info@club.example.com">Email</a>
            <a href="tel:+61300000000">Call</a>
            <a href="javascript:void(0)">Menu</a>
            <a href="ftp://files.example.com/x">Files</a>
            <a name="anchor-only">No href</a>
        "##;
        assert!(extract_links(html, "https://club.example.com").is_empty());
    }

    #[test]
    fn decodes_ampersand_entities_in_href() {
        let html = r#"<a href="/book?a=1&amp;b=2">Book</a>"#;
        let links = extract_links(html, "https://club.example.com");
        assert_eq!(links[0].url, "https://club.example.com/book?a=1&b=2");
    }

    #[test]
    fn apostrophe_inside_double_quoted_href_is_kept() {
        let html = r#"<a href="/st-mary's-courts" title='Mary "St" courts'>Book a court</a>"#;
        let links = extract_links(html, "https://club.example.com/");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://club.example.com/st-mary's-courts");
        assert_eq!(links[0].title.as_deref(), Some("Mary \"St\" courts"));
    }

    #[test]
    fn data_attributes_do_not_shadow_href() {
        let html = r#"<a data-href="/tracking" href="/book">Book now</a>
            <a data-title="x" href=/unquoted>Courts</a>"#;
        let urls: Vec<String> = extract_links(html, "https://club.example.com/")
            .into_iter()
            .map(|l| l.url)
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://club.example.com/book",
                "https://club.example.com/unquoted"
            ]
        );
    }

    #[test]
    fn invalid_base_yields_nothing() {
        assert!(extract_links("<a href=\"/x\">x</a>", "not a url").is_empty());
    }

    #[test]
    fn origin_strips_path() {
        assert_eq!(
            origin_of("https://club.example.com/old/book?x=1").as_deref(),
            Some("https://club.example.com")
        );
        assert_eq!(
            origin_of("http://club.example.com:8080/x").as_deref(),
            Some("http://club.example.com:8080")
        );
        assert_eq!(origin_of("garbage"), None);
    }

    #[test]
    fn registrable_domains() {
        assert_eq!(registrable_domain("www.club.example.com"), "example.com");
        assert_eq!(registrable_domain("bookings.fitzroytc.com.au"), "fitzroytc.com.au");
        assert_eq!(registrable_domain("courts.council.gov.uk"), "council.gov.uk");
        assert_eq!(registrable_domain("example.io"), "example.io");
        assert_eq!(registrable_domain("localhost"), "localhost");
        assert_eq!(registrable_domain("127.0.0.1"), "127.0.0.1");
        assert_eq!(
            registrable_domain_of("https://www.fitzroytc.com.au/book").as_deref(),
            Some("fitzroytc.com.au")
        );
    }
}
