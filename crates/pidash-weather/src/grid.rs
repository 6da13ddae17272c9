//! Point to NWS grid cell resolution.

use std::time::Duration;

use serde_json::Value;
use tracing::instrument;

use crate::error::WeatherError;
use crate::fetcher::TtlFetcher;
use crate::types::{GridCell, DEFAULT_TIME_ZONE};

/// Cache key for a `/points` lookup. Coordinates are fixed to 4 decimals.
pub fn points_cache_key(latitude: f64, longitude: f64) -> String {
    format!("nws_points_{:.4}_{:.4}", latitude, longitude)
}

pub fn points_url(base_url: &str, latitude: f64, longitude: f64) -> String {
    format!(
        "{}/points/{:.4},{:.4}",
        base_url.trim_end_matches('/'),
        latitude,
        longitude
    )
}

impl GridCell {
    pub fn forecast_url(&self, base_url: &str) -> String {
        format!(
            "{}/gridpoints/{}/{},{}/forecast",
            base_url.trim_end_matches('/'),
            self.grid_id,
            self.grid_x,
            self.grid_y
        )
    }

    pub fn hourly_url(&self, base_url: &str) -> String {
        format!("{}/hourly", self.forecast_url(base_url))
    }

    pub fn forecast_cache_key(&self) -> String {
        format!("nws_forecast_{}_{}_{}", self.grid_id, self.grid_x, self.grid_y)
    }

    pub fn hourly_cache_key(&self) -> String {
        format!("nws_hourly_{}_{}_{}", self.grid_id, self.grid_x, self.grid_y)
    }
}

/// Extract the grid cell from a `/points` response body.
pub fn parse_grid(payload: &Value) -> Result<GridCell, WeatherError> {
    let props = payload
        .get("properties")
        .ok_or_else(|| WeatherError::UpstreamMalformed("points response has no properties".into()))?;

    let grid_id = props
        .get("gridId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| WeatherError::UpstreamMalformed("points response has no gridId".into()))?;

    let time_zone = props
        .get("timeZone")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_TIME_ZONE);

    Ok(GridCell {
        grid_id: grid_id.to_string(),
        grid_x: grid_coordinate(props, "gridX")?,
        grid_y: grid_coordinate(props, "gridY")?,
        time_zone: time_zone.to_string(),
    })
}

/// Non-negative integer, given as a JSON number or a numeric string.
fn grid_coordinate(props: &Value, field: &str) -> Result<u32, WeatherError> {
    let parsed = match props.get(field) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    parsed
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| {
            WeatherError::UpstreamMalformed(format!(
                "points response has invalid {}: {}",
                field,
                props.get(field).unwrap_or(&Value::Null)
            ))
        })
}

/// Resolves coordinates to grid cells through the points cache.
#[derive(Clone)]
pub struct GridResolver {
    fetcher: TtlFetcher,
    base_url: String,
    ttl: Duration,
}

impl GridResolver {
    pub fn new(fetcher: TtlFetcher, base_url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            ttl,
        }
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn resolve(&self, latitude: f64, longitude: f64) -> Result<GridCell, WeatherError> {
        let grid = self
            .fetcher
            .get_or_stale(
                &points_url(&self.base_url, latitude, longitude),
                &points_cache_key(latitude, longitude),
                self.ttl,
                parse_grid,
            )
            .await?;

        tracing::debug!(
            "({:.4}, {:.4}) -> {} {},{} ({})",
            latitude,
            longitude,
            grid.grid_id,
            grid.grid_x,
            grid.grid_y,
            grid.time_zone
        );
        Ok(grid)
    }
}
