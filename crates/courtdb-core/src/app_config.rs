use std::path::PathBuf;

use crate::ConfigError;

#[derive(Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub places_path: PathBuf,
    pub store_url: Option<String>,
    pub store_api_key: Option<String>,
    pub geocoder_url: String,
    pub overpass_url: String,
    pub search_url: String,
    pub scraper_request_timeout_secs: u64,
    pub scraper_user_agent: String,
    pub discovery_concurrency: usize,
    pub validation_concurrency: usize,
    pub probe_delay_ms: u64,
    pub geo_query_delay_ms: u64,
}

impl AppConfig {
    /// Store endpoint and API key, for commands that read or write the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] naming the first unset variable.
    pub fn store_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let url = self
            .store_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("COURTDB_STORE_URL".to_string()))?;
        let key = self
            .store_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("COURTDB_STORE_API_KEY".to_string()))?;
        Ok((url, key))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("log_level", &self.log_level)
            .field("places_path", &self.places_path)
            .field("store_url", &self.store_url)
            .field(
                "store_api_key",
                &self.store_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("geocoder_url", &self.geocoder_url)
            .field("overpass_url", &self.overpass_url)
            .field("search_url", &self.search_url)
            .field(
                "scraper_request_timeout_secs",
                &self.scraper_request_timeout_secs,
            )
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field("discovery_concurrency", &self.discovery_concurrency)
            .field("validation_concurrency", &self.validation_concurrency)
            .field("probe_delay_ms", &self.probe_delay_ms)
            .field("geo_query_delay_ms", &self.geo_query_delay_ms)
            .finish()
    }
}
