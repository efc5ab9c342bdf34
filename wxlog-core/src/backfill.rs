use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::{info, warn};

use crate::client::WeatherApi;
use crate::config::CityConfig;
use crate::gaps::{floor_to_hour, missing_hours};
use crate::model::WeatherRecord;
use crate::store::{self, Store};

/// Outcome counters for one city's run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillSummary {
    /// Hours missing from the store at the start of the run.
    pub missing: usize,
    /// Hours successfully fetched and appended.
    pub fetched: usize,
    /// Hours the upstream had no entry for.
    pub no_data: usize,
    /// Hours that failed with a transport/HTTP error and were skipped.
    pub failed: usize,
    /// Fetched rows dropped because their timestamp was already stored.
    pub duplicates: usize,
}

/// Fill gaps in one city's archive over the trailing `hours_back` window.
///
/// Per-hour failures are logged and skipped; the remaining hours are still
/// fetched and everything collected is appended in a single write. Hours
/// that stay missing are picked up again by the next run.
pub async fn backfill_city(
    api: &dyn WeatherApi,
    store: &Store,
    city: &CityConfig,
    now: DateTime<Utc>,
    hours_back: u32,
) -> Result<BackfillSummary> {
    let existing = store
        .load(city)
        .with_context(|| format!("loading archive for {}", city.name))?;

    let targets = missing_hours(&existing, now, hours_back);
    fetch_hours(api, store, city, existing, targets).await
}

/// Fetch only the most recent complete hour (`now - 1h`, floored), skipping
/// the upstream call entirely when it is already stored.
pub async fn fetch_latest_city(
    api: &dyn WeatherApi,
    store: &Store,
    city: &CityConfig,
    now: DateTime<Utc>,
) -> Result<BackfillSummary> {
    let latest = floor_to_hour(now - Duration::hours(1));

    let existing = store
        .load(city)
        .with_context(|| format!("loading archive for {}", city.name))?;

    if store::contains_hour(&existing, latest) {
        info!("{}: {latest} already stored", city.name);
        return Ok(BackfillSummary::default());
    }

    fetch_hours(api, store, city, existing, vec![latest]).await
}

/// Run [`backfill_city`] for every city in turn. A city whose run fails
/// (e.g. its geocoding query has no match) is logged and does not stop the
/// remaining cities.
pub async fn backfill_all(
    api: &dyn WeatherApi,
    store: &Store,
    cities: &[CityConfig],
    hours_back: u32,
) -> Vec<(String, Result<BackfillSummary>)> {
    let mut outcomes = Vec::with_capacity(cities.len());

    for city in cities {
        let result = backfill_city(api, store, city, Utc::now(), hours_back).await;
        if let Err(err) = &result {
            warn!("{}: run aborted: {err:#}", city.name);
        }
        outcomes.push((city.name.clone(), result));
    }

    outcomes
}

/// Run [`fetch_latest_city`] for every city in turn.
pub async fn fetch_latest_all(
    api: &dyn WeatherApi,
    store: &Store,
    cities: &[CityConfig],
) -> Vec<(String, Result<BackfillSummary>)> {
    let mut outcomes = Vec::with_capacity(cities.len());

    for city in cities {
        let result = fetch_latest_city(api, store, city, Utc::now()).await;
        if let Err(err) = &result {
            warn!("{}: run aborted: {err:#}", city.name);
        }
        outcomes.push((city.name.clone(), result));
    }

    outcomes
}

async fn fetch_hours(
    api: &dyn WeatherApi,
    store: &Store,
    city: &CityConfig,
    existing: Vec<WeatherRecord>,
    targets: Vec<DateTime<Utc>>,
) -> Result<BackfillSummary> {
    let mut summary = BackfillSummary {
        missing: targets.len(),
        ..BackfillSummary::default()
    };

    if targets.is_empty() {
        info!("{}: no missing hours", city.name);
        return Ok(summary);
    }

    info!(
        "{}: {} missing hours, resolving '{}'",
        city.name,
        targets.len(),
        city.query
    );
    let coords = api
        .resolve(&city.query)
        .await
        .with_context(|| format!("resolving coordinates for {}", city.name))?;

    let mut fresh: Vec<WeatherRecord> = Vec::new();
    for target in targets {
        match api.fetch_hour(coords, target).await {
            Ok(Some(record)) => {
                // The upstream reports its own `dt`; dedup against that
                // timestamp so a snapped hour cannot create a second row.
                if store::contains_hour(&existing, record.timestamp)
                    || store::contains_hour(&fresh, record.timestamp)
                {
                    warn!(
                        "{}: {} already stored, dropping fetched row",
                        city.name, record.timestamp
                    );
                    summary.duplicates += 1;
                    continue;
                }

                info!(
                    "{}: {} {:.1}°C, {:.0}%",
                    city.name, record.timestamp, record.temperature, record.humidity
                );
                fresh.push(record);
                summary.fetched += 1;
            }
            Ok(None) => {
                info!("{}: no data for {target}", city.name);
                summary.no_data += 1;
            }
            Err(err) => {
                warn!("{}: failed to fetch {target}: {err}", city.name);
                summary.failed += 1;
            }
        }
    }

    store
        .append(city, &fresh)
        .with_context(|| format!("appending archive for {}", city.name))?;

    if !fresh.is_empty() {
        info!("{}: saved {} records", city.name, fresh.len());
    }

    Ok(summary)
}
