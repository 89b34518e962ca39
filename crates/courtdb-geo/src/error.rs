use thiserror::Error;

/// Errors returned by the geocoder and Overpass clients.
#[derive(Debug, Error)]
pub enum GeoError {
    /// Network or TLS failure, or a non-2xx status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The geocoder returned no match for the place name.
    #[error("place not found: {0}")]
    PlaceNotFound(String),

    /// A response parsed as JSON but carried unusable values.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
