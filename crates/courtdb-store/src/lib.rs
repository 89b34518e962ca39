//! Client for the hosted catalog store (PostgREST dialect).

pub mod client;
pub mod error;
pub mod types;

pub use client::StoreClient;
pub use error::StoreError;
pub use types::VenueRow;
