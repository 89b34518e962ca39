use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Overpass regex over the `sport` tag used when the places file sets none.
pub const DEFAULT_SPORTS_PATTERN: &str = "tennis|basketball|soccer|futsal|netball|padel|pickleball|badminton|squash|volleyball|beachvolleyball|table_tennis|multi";

/// One locality to scan for venues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceConfig {
    /// Free-text place name handed to the geocoder, e.g. `"Fitzroy, Victoria, Australia"`.
    pub name: String,
    /// State or region, used to sharpen repair search queries.
    #[serde(default)]
    pub state: Option<String>,
}

impl PlaceConfig {
    /// The locality part of the place name (text before the first comma).
    #[must_use]
    pub fn locality(&self) -> &str {
        self.name.split(',').next().unwrap_or(&self.name).trim()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlacesFile {
    pub places: Vec<PlaceConfig>,
    #[serde(default)]
    pub sports_pattern: Option<String>,
    #[serde(default)]
    pub extra_provider_hosts: Vec<String>,
}

impl PlacesFile {
    #[must_use]
    pub fn sports_pattern(&self) -> &str {
        self.sports_pattern
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_SPORTS_PATTERN)
    }
}

/// Load and validate the places configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_places(path: &Path) -> Result<PlacesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::PlacesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_places(&content)
}

pub(crate) fn parse_places(content: &str) -> Result<PlacesFile, ConfigError> {
    let places_file: PlacesFile = serde_yaml::from_str(content)?;
    validate_places(&places_file)?;
    Ok(places_file)
}

fn validate_places(places_file: &PlacesFile) -> Result<(), ConfigError> {
    if places_file.places.is_empty() {
        return Err(ConfigError::Validation(
            "places file must list at least one place".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for place in &places_file.places {
        if place.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "place name must be non-empty".to_string(),
            ));
        }
        if !seen.insert(place.name.trim().to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate place name: '{}'",
                place.name
            )));
        }
    }

    for host in &places_file.extra_provider_hosts {
        if host.trim().is_empty() || host.contains('/') {
            return Err(ConfigError::Validation(format!(
                "extra provider host '{host}' must be a bare host name"
            )));
        }
    }

    Ok(())
}
