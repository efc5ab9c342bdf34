use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One hourly observation, exactly as stored in a city's CSV file.
///
/// Immutable once written; the CSV column order matches the field order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
}

/// Geographic position of a city, resolved once per run and never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}
