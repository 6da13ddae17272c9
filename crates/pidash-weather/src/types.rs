use serde::{Deserialize, Serialize};

pub use pidash_core::Location;

/// Time zone used when the upstream omits one
pub const DEFAULT_TIME_ZONE: &str = "UTC";

/// Attribution reported in every non-empty payload
pub const SOURCE: &str = "api.weather.gov";

/// NWS forecast grid cell for a point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCell {
    pub grid_id: String,
    pub grid_x: u32,
    pub grid_y: u32,
    pub time_zone: String,
}

/// One persisted cache record. The payload is the raw upstream JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    /// Unix timestamp (seconds) of the fetch
    pub fetched_at: i64,
    pub payload: serde_json::Value,
}

/// A single upstream period (day/night half or one hour), read leniently
/// from the cached JSON. Absent or mistyped fields are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastPeriod {
    pub is_daytime: bool,
    pub name: Option<String>,
    pub temperature: Option<i32>,
    pub short_forecast: Option<String>,
    pub icon: Option<String>,
    pub precipitation_probability: Option<i32>,
    /// Hourly feeds only
    pub cloud_cover: Option<i32>,
    /// Hourly feeds only, e.g. "5 to 10 mph"
    pub wind_speed: Option<String>,
}

/// One day rolled up from a daytime period and the night after it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub name: String,
    pub high_f: Option<i32>,
    pub low_f: Option<i32>,
    pub precip_pct: Option<i32>,
    pub icon: Option<String>,
    #[serde(rename = "shortForecast")]
    pub short_forecast: String,
}

/// Snapshot taken from the first hourly period
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrentSnapshot {
    pub temp_f: Option<i32>,
    pub icon: Option<String>,
    pub short_forecast: Option<String>,
    pub precip_pct: Option<i32>,
    pub cloud_pct: Option<i32>,
    pub wind: Option<String>,
}

/// Current conditions block of the API payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temp_f: Option<i32>,
    pub icon: Option<String>,
    #[serde(rename = "shortForecast")]
    pub short_forecast: Option<String>,
}

/// Today block of the API payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TodaySummary {
    pub high_f: Option<i32>,
    pub low_f: Option<i32>,
    pub precip_pct: Option<i32>,
    pub cloud_pct: Option<i32>,
    pub wind: Option<String>,
}

/// Weather for one location. `week` and `attire` are only present for the
/// primary location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationWeather {
    pub name: String,
    #[serde(rename = "timeZone")]
    pub time_zone: String,
    pub current: CurrentConditions,
    pub today: TodaySummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week: Option<Vec<DaySummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attire: Option<String>,
}

/// Response root of `/api/weather`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherPayload {
    pub primary: Option<LocationWeather>,
    pub others: Vec<LocationWeather>,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}
