//! HTTP client for the catalog's PostgREST endpoint.
//!
//! Every call authenticates with both the `apikey` header and a bearer
//! token carrying the same key.

use std::time::Duration;

use courtdb_core::{StoredVenue, VenueRecord};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use crate::error::StoreError;
use crate::types::{BookingUrlPatch, CoordinatesPatch, SportRow, VenueRow, VENUE_SELECT};

const VENUES: &str = "venues";
const SPORTS: &str = "sports";
/// Tables whose rows reference a venue through `venue_id`.
const VENUE_DEPENDENTS: [&str; 3] = ["clicks", "favorites", "reports"];
const DEFAULT_PAGE_SIZE: usize = 1000;
const MAX_ERROR_BODY: usize = 300;

pub struct StoreClient {
    client: Client,
    base_url: Url,
    page_size: usize,
}

impl StoreClient {
    /// Creates a client for the REST endpoint at `base_url`
    /// (e.g. `https://<project>.example.co/rest/v1`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfig`] if the URL or key is unusable,
    /// or [`StoreError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key)
            .map_err(|e| StoreError::InvalidConfig(format!("API key is not a valid header: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| StoreError::InvalidConfig(format!("API key is not a valid header: {e}")))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .default_headers(headers)
            .build()?;

        // Trailing slash so table names join under the base path.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| StoreError::InvalidConfig(format!("invalid store URL '{base_url}': {e}")))?;

        Ok(Self {
            client,
            base_url,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Override the page size used by [`StoreClient::list_venues`].
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Cheap reachability and credential check.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be reached or rejects the key.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let url = self.table_url(VENUES, &[("select", "id"), ("limit", "1")])?;
        let response = self.client.get(url).send().await?;
        check_status(response, "ping").await?;
        Ok(())
    }

    /// Read the whole catalog, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on any failed page request or unparseable page.
    pub async fn list_venues(&self) -> Result<Vec<StoredVenue>, StoreError> {
        let mut venues = Vec::new();
        let limit = self.page_size.to_string();

        loop {
            let offset = venues.len().to_string();
            let url = self.table_url(
                VENUES,
                &[
                    ("select", VENUE_SELECT),
                    ("order", "id.asc"),
                    ("limit", limit.as_str()),
                    ("offset", offset.as_str()),
                ],
            )?;
            let page: Vec<VenueRow> = self
                .get_json(url, &format!("list_venues(offset={offset})"))
                .await?;
            let fetched = page.len();
            venues.extend(page.into_iter().map(StoredVenue::from));
            tracing::debug!(fetched, total = venues.len(), "venue page read");

            if fetched < self.page_size {
                break;
            }
        }

        Ok(venues)
    }

    /// Insert a venue, merging into an existing row with the same
    /// `(name, address)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store rejects the row.
    pub async fn upsert_venue(&self, venue: &VenueRecord) -> Result<(), StoreError> {
        let url = self.table_url(VENUES, &[("on_conflict", "name,address")])?;
        let request = self
            .client
            .post(url)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(venue);
        self.send(request, &format!("upsert_venue(name={})", venue.name))
            .await
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] if the store rejects the update.
    pub async fn update_booking_url(&self, id: i64, booking_url: &str) -> Result<(), StoreError> {
        let request = self.patch_venue(id)?.json(&BookingUrlPatch { booking_url });
        self.send(request, &format!("update_booking_url(id={id})"))
            .await
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] if the store rejects the update.
    pub async fn update_coordinates(
        &self,
        id: i64,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), StoreError> {
        let request = self.patch_venue(id)?.json(&CoordinatesPatch {
            latitude,
            longitude,
        });
        self.send(request, &format!("update_coordinates(id={id})"))
            .await
    }

    /// Delete a venue and the rows that reference it.
    ///
    /// Dependents go first; a failure part-way leaves the venue row in place.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on the first rejected delete.
    pub async fn delete_venue(&self, id: i64) -> Result<(), StoreError> {
        let venue_filter = format!("eq.{id}");

        for table in VENUE_DEPENDENTS {
            let url = self.table_url(table, &[("venue_id", venue_filter.as_str())])?;
            let request = self.client.delete(url).header("Prefer", "return=minimal");
            self.send(request, &format!("delete {table}(venue_id={id})"))
                .await?;
        }

        let url = self.table_url(VENUES, &[("id", venue_filter.as_str())])?;
        let request = self.client.delete(url).header("Prefer", "return=minimal");
        self.send(request, &format!("delete_venue(id={id})")).await
    }

    /// Sport names known to the reference table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the table cannot be read.
    pub async fn list_sports(&self) -> Result<Vec<String>, StoreError> {
        let url = self.table_url(SPORTS, &[("select", "name")])?;
        let rows: Vec<SportRow> = self.get_json(url, "list_sports").await?;
        Ok(rows.into_iter().map(|r| r.name).collect())
    }

    fn patch_venue(&self, id: i64) -> Result<RequestBuilder, StoreError> {
        let filter = format!("eq.{id}");
        let url = self.table_url(VENUES, &[("id", filter.as_str())])?;
        Ok(self.client.patch(url).header("Prefer", "return=minimal"))
    }

    fn table_url(&self, table: &str, params: &[(&str, &str)]) -> Result<Url, StoreError> {
        let mut url = self
            .base_url
            .join(table)
            .map_err(|e| StoreError::InvalidConfig(format!("invalid table '{table}': {e}")))?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, context: &str) -> Result<T, StoreError> {
        let response = self.client.get(url).send().await?;
        let body = check_status(response, context).await?.text().await?;
        serde_json::from_str(&body).map_err(|e| StoreError::Deserialize {
            context: context.to_string(),
            source: e,
        })
    }

    async fn send(&self, request: RequestBuilder, context: &str) -> Result<(), StoreError> {
        let response = request.send().await?;
        check_status(response, context).await?;
        Ok(())
    }
}

async fn check_status(response: Response, context: &str) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(MAX_ERROR_BODY).collect();
    Err(StoreError::UnexpectedStatus {
        status: status.as_u16(),
        context: context.to_string(),
        body,
    })
}
