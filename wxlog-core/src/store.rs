use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::warn;

use crate::config::CityConfig;
use crate::error::StoreError;
use crate::model::WeatherRecord;

/// Append-only CSV archive, one file per city under a shared data directory.
///
/// Rows are `timestamp,temperature,humidity` with RFC 3339 UTC timestamps.
/// Files are created lazily on first append and never truncated or
/// compacted. A file assumes a single writer; concurrent appenders would
/// interleave rows.
#[derive(Debug, Clone)]
pub struct Store {
    data_dir: PathBuf,
}

impl Store {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Full path of the backing file for one city.
    pub fn csv_path(&self, city: &CityConfig) -> PathBuf {
        self.data_dir.join(&city.filename)
    }

    /// Load all well-formed records for a city.
    ///
    /// An absent file yields an empty vec. Rows that fail to parse are
    /// logged and skipped, so one corrupt line does not discard the rest of
    /// the archive.
    pub fn load(&self, city: &CityConfig) -> Result<Vec<WeatherRecord>, StoreError> {
        let path = self.csv_path(city);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&path).map_err(|source| StoreError::Csv {
            path: path.clone(),
            source,
        })?;

        let mut records = Vec::new();
        for row in reader.deserialize::<WeatherRecord>() {
            match row {
                Ok(record) => records.push(record),
                Err(err) => warn!("skipping malformed row in {}: {err}", path.display()),
            }
        }

        Ok(records)
    }

    /// Append records to a city's file, writing the header row only when the
    /// file did not previously exist.
    pub fn append(&self, city: &CityConfig, records: &[WeatherRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        fs::create_dir_all(&self.data_dir).map_err(|source| StoreError::Io {
            path: self.data_dir.clone(),
            source,
        })?;

        let path = self.csv_path(city);
        let file_exists = path.exists();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(!file_exists)
            .from_writer(file);

        for record in records {
            writer.serialize(record).map_err(|source| StoreError::Csv {
                path: path.clone(),
                source,
            })?;
        }

        writer.flush().map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;

        Ok(())
    }
}

/// True iff a record exists at exactly `timestamp` (no interval matching).
pub fn contains_hour(records: &[WeatherRecord], timestamp: DateTime<Utc>) -> bool {
    records.iter().any(|record| record.timestamp == timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_city() -> CityConfig {
        CityConfig::new("Kigali", "Kigali,RW", "kigali_weather.csv")
    }

    fn record(ts: &str, temperature: f64, humidity: f64) -> WeatherRecord {
        WeatherRecord {
            timestamp: ts.parse().expect("valid RFC 3339 timestamp"),
            temperature,
            humidity,
        }
    }

    #[test]
    fn load_returns_empty_for_absent_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::new(dir.path());

        let records = store.load(&test_city()).expect("load");
        assert!(records.is_empty());
    }

    #[test]
    fn append_creates_file_with_header_row() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::new(dir.path());
        let city = test_city();

        store
            .append(&city, &[record("2024-01-01T09:00:00Z", 21.4, 73.0)])
            .expect("append");

        let contents = fs::read_to_string(store.csv_path(&city)).expect("read");
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("timestamp,temperature,humidity"));
        assert_eq!(lines.next(), Some("2024-01-01T09:00:00Z,21.4,73.0"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn append_does_not_repeat_header() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::new(dir.path());
        let city = test_city();

        store
            .append(&city, &[record("2024-01-01T09:00:00Z", 21.4, 73.0)])
            .expect("first append");
        store
            .append(&city, &[record("2024-01-01T10:00:00Z", 22.0, 70.0)])
            .expect("second append");

        let contents = fs::read_to_string(store.csv_path(&city)).expect("read");
        let headers = contents
            .lines()
            .filter(|line| line.starts_with("timestamp"))
            .count();
        assert_eq!(headers, 1);
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn records_roundtrip_through_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::new(dir.path());
        let city = test_city();

        let written = vec![
            record("2024-01-01T09:00:00Z", 21.4, 73.0),
            record("2024-01-01T10:00:00Z", -3.25, 100.0),
        ];
        store.append(&city, &written).expect("append");

        let loaded = store.load(&city).expect("load");
        assert_eq!(loaded, written);
    }

    #[test]
    fn malformed_rows_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::new(dir.path());
        let city = test_city();

        let path = store.csv_path(&city);
        fs::write(
            &path,
            "timestamp,temperature,humidity\n\
             2024-01-01T09:00:00Z,21.4,73.0\n\
             not-a-timestamp,oops,?\n\
             2024-01-01T11:00:00Z,22.0,70.0\n",
        )
        .expect("write");

        let loaded = store.load(&city).expect("load");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].temperature, 22.0);
    }

    #[test]
    fn existence_check_is_exact_match() {
        let records = vec![record("2024-01-01T13:00:00Z", 20.0, 50.0)];

        let exact = Utc.with_ymd_and_hms(2024, 1, 1, 13, 0, 0).unwrap();
        let off_by_one = Utc.with_ymd_and_hms(2024, 1, 1, 13, 0, 1).unwrap();

        assert!(contains_hour(&records, exact));
        assert!(!contains_hour(&records, off_by_one));
    }
}
