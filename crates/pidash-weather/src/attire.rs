//! What-to-wear hint from the day's temperatures and rain chance.

const NO_DATA: &str = "Bring a light layer just in case.";
const RAIN_LIKELY_COLD: &str = "Rain likely. Wear a warm waterproof jacket and shoes that can get wet.";
const RAIN_LIKELY: &str = "Rain likely. Bring a rain jacket or umbrella.";
const RAIN_CHANCE_COLD: &str = "Chance of rain. Bring a light rain shell and a warmer layer for later.";
const RAIN_CHANCE: &str = "Chance of rain. Consider a light rain shell.";
const HOT: &str = "Hot today. T-shirt and shorts, and hydrate.";
const CHILLY: &str = "Chilly. Bring a warm jacket or sweater.";
const COOL: &str = "Cool. A jacket or hoodie is a good idea.";
const COMFORTABLE: &str = "Comfortable. Light layers should be perfect.";

/// Rain chance (percent) at which rain is expected
pub const RAIN_LIKELY_PCT: i32 = 60;
/// Rain chance (percent) at which rain is possible
pub const RAIN_CHANCE_PCT: i32 = 30;

/// Recommendation for the given high, low and precipitation chance.
///
/// A missing temperature takes the other one's value; missing precipitation
/// counts as zero. The first matching rule wins.
pub fn recommend(high_f: Option<i32>, low_f: Option<i32>, precip_pct: Option<i32>) -> &'static str {
    let (high, low) = match (high_f, low_f) {
        (None, None) => return NO_DATA,
        (Some(high), Some(low)) => (high, low),
        (Some(t), None) | (None, Some(t)) => (t, t),
    };
    let precip = precip_pct.unwrap_or(0);

    if precip >= RAIN_LIKELY_PCT {
        return if high <= 50 { RAIN_LIKELY_COLD } else { RAIN_LIKELY };
    }
    if precip >= RAIN_CHANCE_PCT {
        return if low <= 40 { RAIN_CHANCE_COLD } else { RAIN_CHANCE };
    }

    if high >= 85 {
        HOT
    } else if low <= 40 {
        CHILLY
    } else if high <= 55 {
        COOL
    } else {
        COMFORTABLE
    }
}

/// Shown when no forecast could be fetched
pub fn fallback() -> &'static str {
    NO_DATA
}
