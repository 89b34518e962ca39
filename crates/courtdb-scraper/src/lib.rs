//! Website crawling for booking-page discovery and stored-link validation.

pub mod booking;
pub mod crawl;
pub mod error;
pub mod fetch;
pub mod links;
pub mod providers;
pub mod resolve;

pub use booking::{
    BookingDiscoverer, DiscoveryAttempt, DiscoveryMethod, DiscoveryOutcome, RepairQuery,
    ScoredLink,
};
pub use crawl::{run_bounded, TaskOutcome};
pub use error::ScraperError;
pub use fetch::{FetchedPage, Fetcher};
pub use providers::ProviderHosts;
pub use resolve::{normalize_link, LinkResolver, Resolution};
