pub mod app_config;
pub mod assemble;
pub mod canonical;
mod config;
pub mod places;
pub mod report;
pub mod sports;
pub mod tabular;
pub mod venues;

pub use app_config::AppConfig;
pub use assemble::{
    assemble, find_catalog_duplicates, Assembly, CatalogSnapshot, CoordinateBackfill,
    DuplicateGroup, MatchKind, SkipReason, SkippedVenue,
};
pub use canonical::{canonicalize, CanonicalUrlKey};
pub use config::{load_app_config, load_app_config_from_env};
pub use places::{load_places, PlaceConfig, PlacesFile, DEFAULT_SPORTS_PATTERN};
pub use report::{
    write_new_file, write_report, RepairReport, RepairedLink, ValidationOutcome,
    ValidationReport,
};
pub use venues::{AddressParts, StoredVenue, VenueCandidate, VenueRecord, VENUE_COLUMNS};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read places file {path}: {source}")]
    PlacesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse places file: {0}")]
    PlacesFileParse(#[from] serde_yaml::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
