//! Geographic open-data adapter: geocoder place lookup and Overpass POI
//! queries, mapped onto [`courtdb_core::VenueCandidate`].

pub mod client;
pub mod error;
pub mod normalize;
pub mod types;

pub use client::GeoClient;
pub use error::GeoError;
pub use normalize::element_to_candidate;
pub use types::{BoundingBox, GeocodeResult, OverpassElement, OverpassResponse};
