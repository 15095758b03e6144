pub mod barcode;
pub mod client;
pub mod error;
pub mod fetch;
pub mod race;
pub mod search;
pub mod types;

pub use client::OffClient;
pub use error::{FailureClass, OffError};
pub use fetch::{fetch_with_timeout, FetchOptions, DEFAULT_TIMEOUT};
pub use race::race_mirrors;
pub use search::{rank_by_relevance, SearchParams};
pub use types::{ProductLookup, RawSearchParams, SearchResults, SearchTier, UpstreamResponse};
