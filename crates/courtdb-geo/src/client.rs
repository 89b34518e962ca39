//! HTTP client for the geocoder and the Overpass interpreter.

use std::time::Duration;

use courtdb_core::VenueCandidate;
use reqwest::{Client, Url};

use crate::error::GeoError;
use crate::normalize::element_to_candidate;
use crate::types::{BoundingBox, GeocodeResult, OverpassResponse};

/// Leisure values that count as a venue when they also carry a `sport` tag.
const LEISURE_PATTERN: &str = "^(sports_centre|pitch|sports_hall|fitness_centre)$";

/// Overpass server-side timeout, in seconds.
const OVERPASS_QUERY_TIMEOUT_SECS: u64 = 60;

/// Client for place lookup and POI queries.
///
/// Endpoints come from configuration, which lets tests point at mock servers.
pub struct GeoClient {
    client: Client,
    geocoder_url: Url,
    overpass_url: Url,
}

impl GeoClient {
    /// Creates a client against custom geocoder and Overpass endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Http`] if the `reqwest::Client` cannot be built, or
    /// [`GeoError::InvalidResponse`] if either URL does not parse.
    pub fn with_base_urls(
        geocoder_url: &str,
        overpass_url: &str,
        user_agent: &str,
        timeout_secs: u64,
    ) -> Result<Self, GeoError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let geocoder_url = parse_base(geocoder_url)?;
        let overpass_url = Url::parse(overpass_url).map_err(|e| {
            GeoError::InvalidResponse(format!("invalid overpass URL '{overpass_url}': {e}"))
        })?;

        Ok(Self {
            client,
            geocoder_url,
            overpass_url,
        })
    }

    /// Resolve a free-text place name to its bounding box.
    ///
    /// # Errors
    ///
    /// - [`GeoError::PlaceNotFound`] if the geocoder returns no results.
    /// - [`GeoError::Http`] on network failure or non-2xx status.
    /// - [`GeoError::Deserialize`] / [`GeoError::InvalidResponse`] if the
    ///   body is not the expected shape.
    pub async fn resolve_bounds(&self, place: &str) -> Result<BoundingBox, GeoError> {
        let url = self.search_url(place);
        tracing::debug!(place, %url, "geocoding place");

        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let results: Vec<GeocodeResult> =
            serde_json::from_str(&body).map_err(|e| GeoError::Deserialize {
                context: format!("geocode(place={place})"),
                source: e,
            })?;

        let first = results
            .into_iter()
            .next()
            .ok_or_else(|| GeoError::PlaceNotFound(place.to_string()))?;

        BoundingBox::from_geocoder(&first.boundingbox)
    }

    /// Fetch sports POIs inside `bbox`, mapped to venue candidates.
    ///
    /// Elements that cannot become a candidate are dropped.
    ///
    /// # Errors
    ///
    /// - [`GeoError::Http`] on network failure or non-2xx status.
    /// - [`GeoError::Deserialize`] if the body is not an Overpass JSON
    ///   response.
    pub async fn query_elements(
        &self,
        bbox: &BoundingBox,
        sports_pattern: &str,
    ) -> Result<Vec<VenueCandidate>, GeoError> {
        let query = build_overpass_query(bbox, sports_pattern);

        let body = self
            .client
            .post(self.overpass_url.clone())
            .form(&[("data", query.as_str())])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let response: OverpassResponse =
            serde_json::from_str(&body).map_err(|e| GeoError::Deserialize {
                context: format!("overpass(bbox={})", bbox.to_overpass()),
                source: e,
            })?;

        let total = response.elements.len();
        let candidates: Vec<VenueCandidate> = response
            .elements
            .into_iter()
            .filter_map(element_to_candidate)
            .collect();

        tracing::debug!(total, kept = candidates.len(), "overpass elements mapped");
        Ok(candidates)
    }

    fn search_url(&self, place: &str) -> Url {
        let mut url = self.geocoder_url.clone();
        url.set_path(&format!("{}search", url.path()));
        url.query_pairs_mut()
            .append_pair("q", place)
            .append_pair("format", "json")
            .append_pair("limit", "1");
        url
    }
}

fn parse_base(base_url: &str) -> Result<Url, GeoError> {
    // A trailing slash keeps the base path when `search` is appended.
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalised)
        .map_err(|e| GeoError::InvalidResponse(format!("invalid geocoder URL '{base_url}': {e}")))
}

/// Overpass QL selecting sport-tagged POIs within `bbox`.
pub(crate) fn build_overpass_query(bbox: &BoundingBox, sports_pattern: &str) -> String {
    let bbox = bbox.to_overpass();
    let pattern = sports_pattern.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        "[out:json][timeout:{OVERPASS_QUERY_TIMEOUT_SECS}];\n\
         (\n\
         \x20 nwr[\"sport\"~\"{pattern}\",i]({bbox});\n\
         \x20 nwr[\"leisure\"~\"{LEISURE_PATTERN}\"][\"sport\"]({bbox});\n\
         );\n\
         out center tags;\n"
    )
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
