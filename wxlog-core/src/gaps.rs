use chrono::{DateTime, Duration, Timelike, Utc};

use crate::model::WeatherRecord;
use crate::store;

/// Truncate a timestamp to the start of its hour.
pub fn floor_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

/// Hourly timestamps in the trailing window that have no stored record.
///
/// Looks at `now - 1h` through `now - hours_back` hours, each floored to the
/// hour, and keeps the ones absent from `records`. Most recent candidate
/// first. Pure function of the loaded records and the injected `now`.
pub fn missing_hours(
    records: &[WeatherRecord],
    now: DateTime<Utc>,
    hours_back: u32,
) -> Vec<DateTime<Utc>> {
    let mut missing = Vec::new();

    for i in 1..=i64::from(hours_back) {
        let target = floor_to_hour(now - Duration::hours(i));
        if !store::contains_hour(records, target) {
            missing.push(target);
        }
    }

    missing
}
