//! Multi-location orchestration.
//!
//! The first configured location is the primary and gets the full view
//! (week and attire). Every other location gets a summary. A location that
//! cannot be fetched is reported with null values instead of failing the
//! payload.

use std::sync::Arc;
use std::time::Duration;

use pidash_core::WeatherConfig;
use tracing::instrument;

use crate::attire;
use crate::cache::{now_unix, CacheStore};
use crate::error::WeatherError;
use crate::fetcher::{FetcherOptions, TtlFetcher};
use crate::grid::GridResolver;
use crate::periods::{build_current, build_week, first_non_null, periods_from_payload};
use crate::retry::RetryConfig;
use crate::types::{
    CurrentConditions, ForecastPeriod, Location, LocationWeather, TodaySummary, WeatherPayload,
    DEFAULT_TIME_ZONE, SOURCE,
};

/// Upstream endpoint and per-resource TTLs
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    pub base_url: String,
    pub fetcher: FetcherOptions,
    pub points_ttl: Duration,
    pub hourly_ttl: Duration,
    pub forecast_ttl: Duration,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self::from(&WeatherConfig::default())
    }
}

impl From<&WeatherConfig> for ProviderOptions {
    fn from(config: &WeatherConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            fetcher: FetcherOptions {
                user_agent: config.user_agent.clone(),
                request_timeout: config.request_timeout(),
                retry: RetryConfig {
                    max_retries: config.max_retries,
                    ..RetryConfig::default()
                },
                serve_stale: config.serve_stale,
            },
            points_ttl: config.points_ttl(),
            hourly_ttl: config.hourly_ttl(),
            forecast_ttl: config.forecast_ttl(),
        }
    }
}

/// Builds [`WeatherPayload`]s for a list of locations. Cheap to clone.
#[derive(Clone)]
pub struct WeatherProvider {
    fetcher: TtlFetcher,
    grid: GridResolver,
    base_url: String,
    hourly_ttl: Duration,
    forecast_ttl: Duration,
}

impl WeatherProvider {
    pub fn new(store: Arc<dyn CacheStore>, options: ProviderOptions) -> Result<Self, WeatherError> {
        let fetcher = TtlFetcher::new(store, options.fetcher)?;
        let grid = GridResolver::new(fetcher.clone(), options.base_url.clone(), options.points_ttl);

        Ok(Self {
            fetcher,
            grid,
            base_url: options.base_url,
            hourly_ttl: options.hourly_ttl,
            forecast_ttl: options.forecast_ttl,
        })
    }

    /// Weather for every location. Never fails; see the module docs.
    #[instrument(skip_all, fields(locations = locations.len()))]
    pub async fn build_payload(&self, locations: &[Location]) -> WeatherPayload {
        let Some((primary, others)) = locations.split_first() else {
            return WeatherPayload {
                primary: None,
                others: Vec::new(),
                updated_at: now_unix(),
                source: None,
            };
        };

        let handles: Vec<_> = others
            .iter()
            .cloned()
            .map(|location| {
                let provider = self.clone();
                tokio::spawn(async move { provider.location_weather(&location, false).await })
            })
            .collect();

        let primary = self.location_weather(primary, true).await;

        let mut summaries = Vec::with_capacity(handles.len());
        for (handle, location) in handles.into_iter().zip(others) {
            match handle.await {
                Ok(weather) => summaries.push(weather),
                Err(e) => {
                    tracing::warn!("Weather task for {} failed: {}", location.name, e);
                    summaries.push(LocationWeather::unavailable(
                        &location.name,
                        DEFAULT_TIME_ZONE,
                        false,
                    ));
                }
            }
        }

        WeatherPayload {
            primary: Some(primary),
            others: summaries,
            updated_at: now_unix(),
            source: Some(SOURCE.to_string()),
        }
    }

    /// Weather for one location; `detailed` adds the week and attire.
    #[instrument(skip(self, location), fields(location = %location.name))]
    pub async fn location_weather(&self, location: &Location, detailed: bool) -> LocationWeather {
        let grid = match self.grid.resolve(location.latitude, location.longitude).await {
            Ok(grid) => grid,
            Err(e) => {
                tracing::warn!("Grid lookup for {} failed: {}", location.name, e);
                return LocationWeather::unavailable(&location.name, DEFAULT_TIME_ZONE, detailed);
            }
        };

        let forecast_url = grid.forecast_url(&self.base_url);
        let forecast_key = grid.forecast_cache_key();
        let hourly_url = grid.hourly_url(&self.base_url);
        let hourly_key = grid.hourly_cache_key();

        let (forecast, hourly) = tokio::join!(
            self.periods(&forecast_url, &forecast_key, self.forecast_ttl),
            self.periods(&hourly_url, &hourly_key, self.hourly_ttl),
        );

        let (forecast, hourly) = match (forecast, hourly) {
            (Err(forecast_err), Err(hourly_err)) => {
                tracing::warn!(
                    "No forecast for {}: {}; hourly: {}",
                    location.name,
                    forecast_err,
                    hourly_err
                );
                return LocationWeather::unavailable(&location.name, &grid.time_zone, detailed);
            }
            (forecast, hourly) => (
                forecast.unwrap_or_else(|e| {
                    tracing::warn!("Forecast for {} unavailable: {}", location.name, e);
                    Vec::new()
                }),
                hourly.unwrap_or_else(|e| {
                    tracing::warn!("Hourly forecast for {} unavailable: {}", location.name, e);
                    Vec::new()
                }),
            ),
        };

        assemble(&location.name, &grid.time_zone, &forecast, &hourly, detailed)
    }

    async fn periods(
        &self,
        url: &str,
        cache_key: &str,
        ttl: Duration,
    ) -> Result<Vec<ForecastPeriod>, WeatherError> {
        self.fetcher
            .get_or_stale(url, cache_key, ttl, periods_from_payload)
            .await
    }
}

/// Combine forecast and hourly periods into one location's view.
pub fn assemble(
    name: &str,
    time_zone: &str,
    forecast: &[ForecastPeriod],
    hourly: &[ForecastPeriod],
    detailed: bool,
) -> LocationWeather {
    let week = build_week(forecast);
    let current = build_current(hourly);
    let today = week.first().cloned();

    let high_f = today.as_ref().and_then(|d| d.high_f);
    let low_f = today.as_ref().and_then(|d| d.low_f);
    let precip_pct = first_non_null([current.precip_pct, today.as_ref().and_then(|d| d.precip_pct)]);
    let icon = first_non_null([current.icon, today.as_ref().and_then(|d| d.icon.clone())]);
    let short_forecast = first_non_null([
        current.short_forecast,
        today.map(|d| d.short_forecast),
    ]);

    LocationWeather {
        name: name.to_string(),
        time_zone: time_zone.to_string(),
        current: CurrentConditions {
            temp_f: current.temp_f,
            icon,
            short_forecast,
        },
        today: TodaySummary {
            high_f,
            low_f,
            precip_pct,
            cloud_pct: current.cloud_pct,
            wind: current.wind,
        },
        attire: detailed.then(|| attire::recommend(high_f, low_f, precip_pct).to_string()),
        week: detailed.then_some(week),
    }
}

impl LocationWeather {
    /// All-null view for a location whose data could not be fetched.
    pub fn unavailable(name: &str, time_zone: &str, detailed: bool) -> Self {
        Self {
            name: name.to_string(),
            time_zone: time_zone.to_string(),
            current: CurrentConditions::default(),
            today: TodaySummary::default(),
            week: detailed.then(Vec::new),
            attire: detailed.then(|| attire::fallback().to_string()),
        }
    }
}
