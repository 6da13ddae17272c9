//! Forecast period parsing and day/night aggregation.

use serde_json::Value;

use crate::error::WeatherError;
use crate::types::{CurrentSnapshot, DaySummary, ForecastPeriod};

/// Longest week produced by [`build_week`]
pub const MAX_WEEK_DAYS: usize = 7;

const DEFAULT_DAY_NAME: &str = "Day";

/// First `Some` in `values`, in order.
pub fn first_non_null<T, I>(values: I) -> Option<T>
where
    I: IntoIterator<Item = Option<T>>,
{
    values.into_iter().flatten().next()
}

/// Whole-number percentage from a JSON number; anything else is `None`.
/// Halves round to even.
fn rounded(value: Option<&Value>) -> Option<i32> {
    value
        .and_then(Value::as_f64)
        .map(|v| v.round_ties_even() as i32)
}

fn string_field(period: &Value, field: &str) -> Option<String> {
    period.get(field).and_then(Value::as_str).map(str::to_string)
}

impl ForecastPeriod {
    /// Lenient read of one upstream period object.
    pub fn from_value(period: &Value) -> Self {
        Self {
            is_daytime: period.get("isDaytime").and_then(Value::as_bool) == Some(true),
            name: string_field(period, "name"),
            temperature: period
                .get("temperature")
                .and_then(Value::as_i64)
                .and_then(|t| i32::try_from(t).ok()),
            short_forecast: string_field(period, "shortForecast"),
            icon: string_field(period, "icon"),
            precipitation_probability: rounded(
                period
                    .get("probabilityOfPrecipitation")
                    .and_then(|pop| pop.get("value")),
            ),
            cloud_cover: rounded(period.get("cloudCover")),
            wind_speed: string_field(period, "windSpeed"),
        }
    }
}

/// `properties.periods` of a forecast or hourly response.
pub fn periods_from_payload(payload: &Value) -> Result<Vec<ForecastPeriod>, WeatherError> {
    payload
        .get("properties")
        .and_then(|props| props.get("periods"))
        .and_then(Value::as_array)
        .map(|periods| periods.iter().map(ForecastPeriod::from_value).collect())
        .ok_or_else(|| WeatherError::UpstreamMalformed("response has no properties.periods".into()))
}

/// Empty strings fall through to the next candidate.
fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}

/// Roll day/night periods up into at most [`MAX_WEEK_DAYS`] days.
///
/// A daytime period pairs with whatever period follows it. Periods before
/// the first daytime one are skipped.
pub fn build_week(periods: &[ForecastPeriod]) -> Vec<DaySummary> {
    let mut days = Vec::new();
    let mut i = 0;

    while i < periods.len() && days.len() < MAX_WEEK_DAYS {
        let day = &periods[i];
        if !day.is_daytime {
            i += 1;
            continue;
        }

        let night = periods.get(i + 1);
        days.push(DaySummary {
            name: non_empty(&day.name).unwrap_or_else(|| DEFAULT_DAY_NAME.to_string()),
            high_f: day.temperature,
            low_f: night.and_then(|n| n.temperature),
            precip_pct: first_non_null([
                day.precipitation_probability,
                night.and_then(|n| n.precipitation_probability),
            ]),
            icon: non_empty(&day.icon).or_else(|| night.and_then(|n| n.icon.clone())),
            short_forecast: non_empty(&day.short_forecast)
                .or_else(|| night.and_then(|n| n.short_forecast.clone()))
                .unwrap_or_default(),
        });
        i += 2;
    }

    days
}

/// Snapshot from the first hourly period; all `None` when there is none.
pub fn build_current(hourly: &[ForecastPeriod]) -> CurrentSnapshot {
    hourly
        .first()
        .map(|period| CurrentSnapshot {
            temp_f: period.temperature,
            icon: period.icon.clone(),
            short_forecast: period.short_forecast.clone(),
            precip_pct: period.precipitation_probability,
            cloud_pct: period.cloud_cover,
            wind: period.wind_speed.clone(),
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn period(is_daytime: bool, name: &str, temperature: i32, precip: Option<i32>) -> ForecastPeriod {
        ForecastPeriod {
            is_daytime,
            name: Some(name.to_string()),
            temperature: Some(temperature),
            short_forecast: Some(format!("{} forecast", name)),
            icon: Some(format!("https://icons/{}", name)),
            precipitation_probability: precip,
            ..ForecastPeriod::default()
        }
    }

    fn alternating(count: usize) -> Vec<ForecastPeriod> {
        (0..count)
            .map(|i| {
                let day = i % 2 == 0;
                period(day, &format!("P{}", i), 60 + i as i32, None)
            })
            .collect()
    }

    #[test]
    fn test_first_non_null() {
        assert_eq!(first_non_null([None, Some(3), Some(4)]), Some(3));
        assert_eq!(first_non_null::<i32, _>([None, None]), None);
        assert_eq!(first_non_null(Vec::<Option<i32>>::new()), None);
        assert_eq!(first_non_null([Some(String::new()), Some("x".into())]), Some(String::new()));
    }

    #[test]
    fn test_from_value_lenient() {
        let p = ForecastPeriod::from_value(&json!({
            "isDaytime": true,
            "name": "This Afternoon",
            "temperature": 71,
            "shortForecast": "Sunny",
            "probabilityOfPrecipitation": {"unitCode": "wmoUnit:percent", "value": 12.6},
            "cloudCover": 33.4,
            "windSpeed": "5 to 10 mph"
        }));
        assert!(p.is_daytime);
        assert_eq!(p.temperature, Some(71));
        assert_eq!(p.precipitation_probability, Some(13));
        assert_eq!(p.cloud_cover, Some(33));
        assert_eq!(p.wind_speed.as_deref(), Some("5 to 10 mph"));
        assert_eq!(p.icon, None);

        let p = ForecastPeriod::from_value(&json!({
            "isDaytime": "true",
            "temperature": 70.5,
            "probabilityOfPrecipitation": {"value": null},
            "cloudCover": "high"
        }));
        assert!(!p.is_daytime);
        assert_eq!(p.temperature, None);
        assert_eq!(p.precipitation_probability, None);
        assert_eq!(p.cloud_cover, None);
    }

    #[test]
    fn test_percentages_round_half_to_even() {
        let pct = |v: f64| {
            ForecastPeriod::from_value(&json!({"probabilityOfPrecipitation": {"value": v}}))
                .precipitation_probability
        };
        assert_eq!(pct(12.5), Some(12));
        assert_eq!(pct(13.5), Some(14));
        assert_eq!(pct(12.51), Some(13));
        assert_eq!(
            ForecastPeriod::from_value(&json!({"cloudCover": 0.5})).cloud_cover,
            Some(0)
        );
    }

    #[test]
    fn test_periods_from_payload() {
        let periods = periods_from_payload(&json!({
            "properties": {"periods": [{"isDaytime": true}, {"isDaytime": false}]}
        }))
        .unwrap();
        assert_eq!(periods.len(), 2);

        let err = periods_from_payload(&json!({"properties": {}})).unwrap_err();
        assert!(matches!(err, WeatherError::UpstreamMalformed(_)));
    }

    #[test]
    fn test_week_pairs_day_and_night() {
        let periods = vec![
            period(true, "Today", 72, Some(10)),
            period(false, "Tonight", 58, Some(40)),
        ];
        let week = build_week(&periods);

        assert_eq!(week.len(), 1);
        assert_eq!(week[0].name, "Today");
        assert_eq!(week[0].high_f, Some(72));
        assert_eq!(week[0].low_f, Some(58));
        assert_eq!(week[0].precip_pct, Some(10));
        assert_eq!(week[0].icon.as_deref(), Some("https://icons/Today"));
        assert_eq!(week[0].short_forecast, "Today forecast");
    }

    #[test]
    fn test_week_capped_at_seven() {
        let week = build_week(&alternating(14));
        assert_eq!(week.len(), 7);
        assert!(build_week(&alternating(20)).len() <= MAX_WEEK_DAYS);
        // Upstream order preserved
        let names: Vec<_> = week.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["P0", "P2", "P4", "P6", "P8", "P10", "P12"]);
    }

    #[test]
    fn test_week_skips_leading_night() {
        let mut periods = vec![period(false, "Tonight", 55, None)];
        periods.extend(alternating(4));
        let week = build_week(&periods);

        assert_eq!(week.len(), 2);
        assert_eq!(week[0].name, "P0");
        assert_eq!(week[0].low_f, Some(61));
    }

    #[test]
    fn test_week_trailing_day_has_null_low() {
        let week = build_week(&alternating(3));
        assert_eq!(week.len(), 2);
        assert_eq!(week[1].high_f, Some(62));
        assert_eq!(week[1].low_f, None);
    }

    #[test]
    fn test_week_only_nights_is_empty() {
        let periods = vec![period(false, "Tonight", 50, None), period(false, "Late", 48, None)];
        assert!(build_week(&periods).is_empty());
        assert!(build_week(&[]).is_empty());
    }

    #[test]
    fn test_week_falls_back_to_night_fields() {
        let day = ForecastPeriod {
            is_daytime: true,
            temperature: Some(66),
            short_forecast: Some(String::new()),
            ..ForecastPeriod::default()
        };
        let night = ForecastPeriod {
            temperature: None,
            icon: Some("night-icon".to_string()),
            short_forecast: Some("Patchy Fog".to_string()),
            precipitation_probability: Some(20),
            ..ForecastPeriod::default()
        };
        let week = build_week(&[day, night]);

        assert_eq!(week[0].name, "Day");
        assert_eq!(week[0].low_f, None);
        assert_eq!(week[0].precip_pct, Some(20));
        assert_eq!(week[0].icon.as_deref(), Some("night-icon"));
        assert_eq!(week[0].short_forecast, "Patchy Fog");
    }

    #[test]
    fn test_week_missing_short_forecast_is_empty_string() {
        let day = ForecastPeriod {
            is_daytime: true,
            ..ForecastPeriod::default()
        };
        assert_eq!(build_week(&[day])[0].short_forecast, "");
    }

    #[test]
    fn test_current_from_first_hourly() {
        let mut first = period(true, "Now", 68, Some(5));
        first.cloud_cover = Some(40);
        first.wind_speed = Some("10 mph".to_string());
        let hourly = vec![first, period(true, "Later", 75, Some(90))];

        let current = build_current(&hourly);
        assert_eq!(current.temp_f, Some(68));
        assert_eq!(current.precip_pct, Some(5));
        assert_eq!(current.cloud_pct, Some(40));
        assert_eq!(current.wind.as_deref(), Some("10 mph"));
        assert_eq!(current.short_forecast.as_deref(), Some("Now forecast"));
    }

    #[test]
    fn test_current_empty_hourly() {
        assert_eq!(build_current(&[]), CurrentSnapshot::default());
    }
}
