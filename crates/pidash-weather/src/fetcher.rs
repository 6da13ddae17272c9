//! Upstream GETs behind a TTL cache.

use std::sync::Arc;
use std::time::Duration;

use pidash_core::{NetworkError, ReqwestErrorExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use serde_json::Value;
use tracing::instrument;

use crate::cache::{is_fresh, now_unix, CacheStore};
use crate::error::WeatherError;
use crate::retry::{with_retry, RetryConfig};
use crate::types::CacheEntry;

const ACCEPT_GEO_JSON: &str = "application/geo+json";
const ERROR_BODY_LIMIT: usize = 200;

/// HTTP and cache behavior for a [`TtlFetcher`]
#[derive(Debug, Clone)]
pub struct FetcherOptions {
    /// Client identification required by the NWS usage policy
    pub user_agent: String,
    pub request_timeout: Duration,
    pub retry: RetryConfig,
    /// Fall back to an expired entry when the upstream fails
    pub serve_stale: bool,
}

impl Default for FetcherOptions {
    fn default() -> Self {
        Self {
            user_agent: format!("pidash/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: Duration::from_secs(15),
            retry: RetryConfig::default(),
            serve_stale: true,
        }
    }
}

/// Cache-first JSON fetcher. Cheap to clone.
#[derive(Clone)]
pub struct TtlFetcher {
    client: Arc<Client>,
    store: Arc<dyn CacheStore>,
    retry: RetryConfig,
    serve_stale: bool,
}

impl TtlFetcher {
    pub fn new(store: Arc<dyn CacheStore>, options: FetcherOptions) -> Result<Self, WeatherError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_GEO_JSON));

        let client = Client::builder()
            .timeout(options.request_timeout)
            .user_agent(options.user_agent)
            .default_headers(headers)
            .build()
            .map_err(|e| WeatherError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            store,
            retry: options.retry,
            serve_stale: options.serve_stale,
        })
    }

    /// Cached value for `cache_key` if younger than `ttl`, otherwise a
    /// fresh upstream fetch that replaces the entry.
    ///
    /// `parse` checks the body's shape. Only bodies it accepts are cached;
    /// a rejected body is reported as an upstream failure.
    #[instrument(skip(self, parse), level = "debug")]
    pub async fn get_fresh<T, F>(
        &self,
        url: &str,
        cache_key: &str,
        ttl: Duration,
        parse: F,
    ) -> Result<T, WeatherError>
    where
        F: Fn(&Value) -> Result<T, WeatherError>,
    {
        self.get(url, cache_key, ttl, false, parse).await
    }

    /// Like [`get_fresh`](Self::get_fresh), but an upstream failure falls
    /// back to an expired entry when stale serving is enabled.
    #[instrument(skip(self, parse), level = "debug")]
    pub async fn get_or_stale<T, F>(
        &self,
        url: &str,
        cache_key: &str,
        ttl: Duration,
        parse: F,
    ) -> Result<T, WeatherError>
    where
        F: Fn(&Value) -> Result<T, WeatherError>,
    {
        self.get(url, cache_key, ttl, self.serve_stale, parse).await
    }

    async fn get<T, F>(
        &self,
        url: &str,
        cache_key: &str,
        ttl: Duration,
        allow_stale: bool,
        parse: F,
    ) -> Result<T, WeatherError>
    where
        F: Fn(&Value) -> Result<T, WeatherError>,
    {
        let mut stale = None;
        if let Some(entry) = self.read_cache(cache_key).await {
            if is_fresh(entry.fetched_at, now_unix(), ttl) {
                match parse(&entry.payload) {
                    Ok(value) => {
                        tracing::debug!("Cache hit for {}", cache_key);
                        return Ok(value);
                    }
                    Err(e) => tracing::warn!("Ignoring cached {}: {}", cache_key, e),
                }
            } else {
                stale = Some(entry);
            }
        }

        let fetched = match self.fetch_remote(url).await {
            Ok(payload) => parse(&payload).map(|value| (value, payload)),
            Err(e) => Err(e),
        };

        match fetched {
            Ok((value, payload)) => {
                self.write_cache(cache_key, payload).await;
                Ok(value)
            }
            Err(e) => match stale {
                Some(entry) if allow_stale => match parse(&entry.payload) {
                    Ok(value) => {
                        tracing::warn!(
                            "Serving stale {} (age {}s): {}",
                            cache_key,
                            now_unix().saturating_sub(entry.fetched_at),
                            e
                        );
                        Ok(value)
                    }
                    Err(_) => Err(e),
                },
                _ => Err(e),
            },
        }
    }

    async fn read_cache(&self, cache_key: &str) -> Option<CacheEntry> {
        let store = self.store.clone();
        let key = cache_key.to_string();
        match tokio::task::spawn_blocking(move || store.read(&key)).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Cache read for {} failed: {}", cache_key, e);
                None
            }
        }
    }

    /// Persist `payload`; a failed write is only logged.
    async fn write_cache(&self, cache_key: &str, payload: Value) {
        let store = self.store.clone();
        let key = cache_key.to_string();

        match tokio::task::spawn_blocking(move || store.write(&key, &payload)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Not caching {}: {}", cache_key, e),
            Err(e) => tracing::warn!("Cache write for {} failed: {}", cache_key, e),
        }
    }

    async fn fetch_remote(&self, url: &str) -> Result<Value, WeatherError> {
        tracing::info!("Fetching {}", url);
        with_retry(&self.retry, move || self.fetch_once(url)).await
    }

    async fn fetch_once(&self, url: &str) -> Result<Value, WeatherError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.into_network_error())?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NetworkError::ServerError {
                status: status.as_u16(),
                message: body.chars().take(ERROR_BODY_LIMIT).collect(),
            }
            .into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| e.into_network_error())?;

        serde_json::from_slice(&bytes)
            .map_err(|e| WeatherError::UpstreamMalformed(format!("{}: {}", url, e)))
    }
}
