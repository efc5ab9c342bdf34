//! Core library for the `wxlog` hourly weather archiver.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather geocoding and historical-weather client
//! - The per-city append-only CSV store, gap detection and backfill
//! - Summary statistics over the stored archives
//!
//! It is used by `wxlog-cli`, but can also be reused by other binaries or services.

pub mod backfill;
pub mod client;
pub mod config;
pub mod error;
pub mod gaps;
pub mod model;
pub mod report;
pub mod store;

pub use backfill::{BackfillSummary, backfill_all, backfill_city, fetch_latest_all};
pub use client::{OpenWeatherClient, WeatherApi};
pub use config::{CityConfig, Config};
pub use error::{FetchError, StoreError};
pub use model::{Coordinates, WeatherRecord};
pub use report::CityReport;
pub use store::Store;
