use crate::app_config::AppConfig;
use crate::ConfigError;

/// Upper bound for `COURTDB_SCRAPER_REQUEST_TIMEOUT_SECS`; per-task budgets
/// are multiples of it.
const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        let value = raw
            .parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })?;
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(value)
    };

    let log_level = or_default("COURTDB_LOG_LEVEL", "info");
    let places_path = PathBuf::from(or_default("COURTDB_PLACES_PATH", "./config/places.yaml"));

    let store_url = optional("COURTDB_STORE_URL");
    let store_api_key = optional("COURTDB_STORE_API_KEY");

    let geocoder_url = or_default(
        "COURTDB_GEOCODER_URL",
        "https://nominatim.openstreetmap.org",
    );
    let overpass_url = or_default(
        "COURTDB_OVERPASS_URL",
        "https://overpass-api.de/api/interpreter",
    );
    let search_url = or_default("COURTDB_SEARCH_URL", "https://html.duckduckgo.com/html/");

    let scraper_request_timeout_secs = parse_u64("COURTDB_SCRAPER_REQUEST_TIMEOUT_SECS", "12")?;
    if scraper_request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
        return Err(ConfigError::InvalidEnvVar {
            var: "COURTDB_SCRAPER_REQUEST_TIMEOUT_SECS".to_string(),
            reason: format!("must be at most {MAX_REQUEST_TIMEOUT_SECS}"),
        });
    }
    let scraper_user_agent = or_default(
        "COURTDB_SCRAPER_USER_AGENT",
        "courtdb/0.1 (venue-discovery)",
    );
    let discovery_concurrency = parse_usize("COURTDB_DISCOVERY_CONCURRENCY", "6")?;
    let validation_concurrency = parse_usize("COURTDB_VALIDATION_CONCURRENCY", "10")?;
    let probe_delay_ms = parse_u64("COURTDB_PROBE_DELAY_MS", "400")?;
    let geo_query_delay_ms = parse_u64("COURTDB_GEO_QUERY_DELAY_MS", "800")?;

    Ok(AppConfig {
        log_level,
        places_path,
        store_url,
        store_api_key,
        geocoder_url,
        overpass_url,
        search_url,
        scraper_request_timeout_secs,
        scraper_user_agent,
        discovery_concurrency,
        validation_concurrency,
        probe_delay_ms,
        geo_query_delay_ms,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
