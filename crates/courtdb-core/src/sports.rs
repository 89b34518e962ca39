//! Sport token normalization.
//!
//! Geographic tags, tabular exports and the store's `sports[]` column all
//! spell sports differently (`football`, `association_football`,
//! `Table Tennis`). Everything funnels through [`normalize_sport`] so a
//! venue's sport set compares equal regardless of where it came from.

use std::collections::BTreeSet;

/// Tokens that carry no sport information on their own.
const IGNORED_TOKENS: &[&str] = &["multi", "yes", "no", "other", "sports"];

/// Normalize a single sport token.
///
/// Lower-cases, maps known synonyms, and joins words with `-`. Returns
/// `None` for empty or non-informative tokens.
#[must_use]
pub fn normalize_sport(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    let dashed = lowered
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if dashed.is_empty() || IGNORED_TOKENS.contains(&dashed.as_str()) {
        return None;
    }

    let canonical = match dashed.as_str() {
        "football" | "association-football" | "soccer" | "5-a-side" | "7-a-side" => "soccer",
        "basket" | "basketball" | "streetball" => "basketball",
        "tennis" | "lawn-tennis" => "tennis",
        "table-tennis" | "ping-pong" | "pingpong" => "table-tennis",
        "beachvolleyball" | "beach-volleyball" => "beach-volleyball",
        "volleyball" | "volley" => "volleyball",
        "pickle-ball" | "pickleball" => "pickleball",
        "futsal" | "indoor-soccer" => "futsal",
        other => other,
    };

    Some(canonical.to_string())
}

/// Normalize a collection of tokens into a de-duplicated, ordered set.
#[must_use]
pub fn normalize_sports<'a, I>(tokens: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    tokens.into_iter().filter_map(normalize_sport).collect()
}

/// Parse a sports cell from a tabular file or an OSM `sport` tag.
///
/// Accepts `;`, `,` and `|` separators and tolerates a Postgres array literal
/// (`{tennis,basketball}`) as exported by the store.
#[must_use]
pub fn parse_sports_cell(cell: &str) -> BTreeSet<String> {
    let inner = cell
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}');
    normalize_sports(
        inner
            .split([';', ',', '|'])
            .map(|token| token.trim().trim_matches('"')),
    )
}

/// Render a sport set as a `;`-joined cell.
#[must_use]
pub fn format_sports_cell(sports: &BTreeSet<String>) -> String {
    sports.iter().map(String::as_str).collect::<Vec<_>>().join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn football_is_soccer() {
        assert_eq!(normalize_sport("football").as_deref(), Some("soccer"));
        assert_eq!(
            normalize_sport("association_football").as_deref(),
            Some("soccer")
        );
        assert_eq!(normalize_sport("Soccer").as_deref(), Some("soccer"));
    }

    #[test]
    fn separators_become_dashes() {
        assert_eq!(
            normalize_sport("Table Tennis").as_deref(),
            Some("table-tennis")
        );
        assert_eq!(
            normalize_sport("table_tennis").as_deref(),
            Some("table-tennis")
        );
    }

    #[test]
    fn unknown_sport_is_kept_lowercased() {
        assert_eq!(normalize_sport("Croquet").as_deref(), Some("croquet"));
    }

    #[test]
    fn ignored_and_empty_tokens_drop_out() {
        assert_eq!(normalize_sport(""), None);
        assert_eq!(normalize_sport("  "), None);
        assert_eq!(normalize_sport("multi"), None);
    }

    #[test]
    fn duplicates_collapse() {
        let set = normalize_sports(["football", "soccer", "Tennis", "tennis"]);
        assert_eq!(
            set.into_iter().collect::<Vec<_>>(),
            vec!["soccer".to_string(), "tennis".to_string()]
        );
    }

    #[test]
    fn parses_osm_semicolon_list() {
        let set = parse_sports_cell("tennis;basketball;multi");
        assert_eq!(format_sports_cell(&set), "basketball;tennis");
    }

    #[test]
    fn parses_postgres_array_literal() {
        let set = parse_sports_cell("{tennis,\"table tennis\"}");
        assert!(set.contains("tennis"));
        assert!(set.contains("table-tennis"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn empty_cell_is_empty_set() {
        assert!(parse_sports_cell("").is_empty());
        assert!(parse_sports_cell("{}").is_empty());
    }
}
