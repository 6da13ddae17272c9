//! Weather pipeline for pidash
//!
//! Resolves configured locations to NWS grid cells, fetches forecast and
//! hourly periods through a TTL disk cache, and condenses them into the
//! "current / today / week" payload served to the dashboard.

pub mod attire;
pub mod cache;
pub mod error;
pub mod fetcher;
pub mod grid;
pub mod periods;
pub mod provider;
pub mod retry;
pub mod types;

pub use attire::recommend;
pub use cache::{CacheStore, DiskCache, MemoryCache};
pub use error::WeatherError;
pub use fetcher::{FetcherOptions, TtlFetcher};
pub use grid::GridResolver;
pub use periods::{build_current, build_week, first_non_null};
pub use provider::{ProviderOptions, WeatherProvider};
pub use retry::RetryConfig;
pub use types::*;
