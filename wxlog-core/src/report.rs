use chrono::{DateTime, Utc};

use crate::model::WeatherRecord;

/// Summary statistics for one city's archive over an optional date range.
///
/// This is the data behind the dashboard's per-city summary panel: the same
/// numbers, computed from the store instead of a rendered chart.
#[derive(Debug, Clone, PartialEq)]
pub struct CityReport {
    pub city: String,
    pub count: usize,
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
    pub temperature_min: f64,
    pub temperature_mean: f64,
    pub temperature_max: f64,
    pub humidity_min: f64,
    pub humidity_mean: f64,
    pub humidity_max: f64,
}

impl CityReport {
    /// Build statistics over the records inside the inclusive `[from, to]`
    /// range. Either bound may be absent. Returns `None` when nothing falls
    /// in the range.
    pub fn build(
        city: &str,
        records: &[WeatherRecord],
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        let selected: Vec<&WeatherRecord> = records
            .iter()
            .filter(|r| {
                from.is_none_or(|f| r.timestamp >= f) && to.is_none_or(|t| r.timestamp <= t)
            })
            .collect();

        let count = selected.len();
        if count == 0 {
            return None;
        }

        let mut first = selected[0].timestamp;
        let mut last = selected[0].timestamp;
        let mut temperature_min = f64::INFINITY;
        let mut temperature_max = f64::NEG_INFINITY;
        let mut humidity_min = f64::INFINITY;
        let mut humidity_max = f64::NEG_INFINITY;
        let mut temperature_sum = 0.0;
        let mut humidity_sum = 0.0;

        for record in &selected {
            first = first.min(record.timestamp);
            last = last.max(record.timestamp);
            temperature_min = temperature_min.min(record.temperature);
            temperature_max = temperature_max.max(record.temperature);
            humidity_min = humidity_min.min(record.humidity);
            humidity_max = humidity_max.max(record.humidity);
            temperature_sum += record.temperature;
            humidity_sum += record.humidity;
        }

        Some(Self {
            city: city.to_string(),
            count,
            first,
            last,
            temperature_min,
            temperature_mean: temperature_sum / count as f64,
            temperature_max,
            humidity_min,
            humidity_mean: humidity_sum / count as f64,
            humidity_max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hour(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap()
    }

    fn record(h: u32, temperature: f64, humidity: f64) -> WeatherRecord {
        WeatherRecord {
            timestamp: hour(h),
            temperature,
            humidity,
        }
    }

    #[test]
    fn stats_cover_the_whole_archive_without_bounds() {
        let records = vec![
            record(7, 18.0, 80.0),
            record(8, 20.0, 70.0),
            record(9, 25.0, 60.0),
        ];

        let report = CityReport::build("Kigali", &records, None, None).expect("report");

        assert_eq!(report.count, 3);
        assert_eq!(report.first, hour(7));
        assert_eq!(report.last, hour(9));
        assert_eq!(report.temperature_min, 18.0);
        assert_eq!(report.temperature_mean, 21.0);
        assert_eq!(report.temperature_max, 25.0);
        assert_eq!(report.humidity_mean, 70.0);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let records = vec![
            record(7, 18.0, 80.0),
            record(8, 20.0, 70.0),
            record(9, 25.0, 60.0),
        ];

        let report =
            CityReport::build("Kigali", &records, Some(hour(8)), Some(hour(9))).expect("report");

        assert_eq!(report.count, 2);
        assert_eq!(report.first, hour(8));
        assert_eq!(report.last, hour(9));
    }

    #[test]
    fn empty_selection_yields_no_report() {
        let records = vec![record(7, 18.0, 80.0)];

        assert!(CityReport::build("Kigali", &records, Some(hour(8)), None).is_none());
        assert!(CityReport::build("Kigali", &[], None, None).is_none());
    }

    #[test]
    fn unordered_rows_still_produce_correct_first_and_last() {
        // Append order is not chronological after a backfill run.
        let records = vec![
            record(9, 25.0, 60.0),
            record(7, 18.0, 80.0),
            record(8, 20.0, 70.0),
        ];

        let report = CityReport::build("Kigali", &records, None, None).expect("report");

        assert_eq!(report.first, hour(7));
        assert_eq!(report.last, hour(9));
    }
}
