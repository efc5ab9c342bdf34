use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::FetchError;
use crate::model::{Coordinates, WeatherRecord};

const GEOCODING_URL: &str = "http://api.openweathermap.org/geo/1.0/direct";
const TIMEMACHINE_URL: &str = "https://api.openweathermap.org/data/3.0/onecall/timemachine";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Upstream source of coordinates and hourly observations.
///
/// The backfill orchestrator only talks to this trait, so tests can
/// substitute a scripted implementation.
#[async_trait]
pub trait WeatherApi: Send + Sync {
    /// Resolve a geocoding query like "Cape Town,ZA" to coordinates.
    async fn resolve(&self, query: &str) -> Result<Coordinates, FetchError>;

    /// Fetch the observation for the hour starting at `hour_start`.
    ///
    /// `Ok(None)` means the upstream has no entry for that hour; it is not
    /// an error and the hour stays missing.
    async fn fetch_hour(
        &self,
        coords: Coordinates,
        hour_start: DateTime<Utc>,
    ) -> Result<Option<WeatherRecord>, FetchError>;
}

/// Client for the OpenWeather geocoding and One Call timemachine endpoints.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            http: Client::new(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let res = self
            .http
            .get(url)
            .timeout(REQUEST_TIMEOUT)
            .query(query)
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|source| FetchError::Network {
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status,
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GeoMatch {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct TimemachineResponse {
    #[serde(default)]
    data: Vec<HourEntry>,
}

#[derive(Debug, Deserialize)]
struct HourEntry {
    dt: i64,
    temp: f64,
    humidity: f64,
}

#[async_trait]
impl WeatherApi for OpenWeatherClient {
    async fn resolve(&self, query: &str) -> Result<Coordinates, FetchError> {
        let params = [
            ("q", query.to_string()),
            ("limit", "1".to_string()),
            ("appid", self.api_key.clone()),
        ];

        let matches: Vec<GeoMatch> = self.get_json(GEOCODING_URL, &params).await?;

        let first = matches
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::NotFound(query.to_string()))?;

        Ok(Coordinates {
            latitude: first.lat,
            longitude: first.lon,
        })
    }

    async fn fetch_hour(
        &self,
        coords: Coordinates,
        hour_start: DateTime<Utc>,
    ) -> Result<Option<WeatherRecord>, FetchError> {
        let params = [
            ("lat", coords.latitude.to_string()),
            ("lon", coords.longitude.to_string()),
            ("dt", hour_start.timestamp().to_string()),
            ("appid", self.api_key.clone()),
            ("units", "metric".to_string()),
        ];

        let parsed: TimemachineResponse = self.get_json(TIMEMACHINE_URL, &params).await?;

        let Some(entry) = parsed.data.into_iter().next() else {
            return Ok(None);
        };

        // Take the timestamp the API reports rather than the one we asked for.
        let timestamp = unix_to_utc(entry.dt).unwrap_or(hour_start);

        Ok(Some(WeatherRecord {
            timestamp,
            temperature: entry.temp,
            humidity: entry.humidity,
        }))
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(ts, 0).single()
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        let truncated: String = body.chars().take(MAX).collect();
        format!("{truncated}...")
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_geocoding_payload() {
        let body = r#"[{"name":"Kigali","lat":-1.95,"lon":30.06,"country":"RW"}]"#;
        let matches: Vec<GeoMatch> = serde_json::from_str(body).expect("parse");

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].lat, -1.95);
        assert_eq!(matches[0].lon, 30.06);
    }

    #[test]
    fn parses_timemachine_payload() {
        let body = r#"{
            "lat": -1.95,
            "lon": 30.06,
            "timezone": "Africa/Kigali",
            "data": [{"dt": 1704099600, "temp": 21.4, "humidity": 73, "pressure": 1015}]
        }"#;
        let parsed: TimemachineResponse = serde_json::from_str(body).expect("parse");

        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].dt, 1704099600);
        assert_eq!(parsed.data[0].temp, 21.4);
        assert_eq!(parsed.data[0].humidity, 73.0);
    }

    #[test]
    fn missing_data_array_means_no_observation() {
        let body = r#"{"lat": -1.95, "lon": 30.06, "timezone": "Africa/Kigali"}"#;
        let parsed: TimemachineResponse = serde_json::from_str(body).expect("parse");

        assert!(parsed.data.is_empty());
    }

    #[test]
    fn truncates_long_error_bodies() {
        let long = "x".repeat(500);
        let truncated = truncate_body(&long);

        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 203);

        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn unix_timestamps_convert_to_utc() {
        let ts = unix_to_utc(1704099600).expect("valid timestamp");
        assert_eq!(ts.to_rfc3339(), "2024-01-01T09:00:00+00:00");
    }
}
