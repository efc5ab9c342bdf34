use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use wxlog_core::backfill::{self, BackfillSummary};
use wxlog_core::{CityReport, Config, OpenWeatherClient, Store};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "wxlog", version, about = "Hourly weather archiver")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch and store any hours missing from the trailing window.
    Backfill {
        /// How many hours back to scan for gaps.
        #[arg(long, default_value_t = 24)]
        hours_back: u32,
    },

    /// Fetch only the most recent complete hour for each city.
    Latest,

    /// Print summary statistics for the stored archives.
    Report {
        /// Only include observations at or after this RFC 3339 timestamp.
        #[arg(long)]
        from: Option<DateTime<Utc>>,

        /// Only include observations at or before this RFC 3339 timestamp.
        #[arg(long)]
        to: Option<DateTime<Utc>>,

        /// Restrict the report to a single configured city.
        #[arg(long)]
        city: Option<String>,
    },

    /// Store the OpenWeather API key in the config file.
    Configure,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Backfill { hours_back } => {
                let client = OpenWeatherClient::new(config.api_key()?);
                let store = Store::new(config.data_dir());

                println!("Checking for missing data in the last {hours_back} hours...");
                let outcomes =
                    backfill::backfill_all(&client, &store, &config.cities(), hours_back).await;
                print_outcomes(&outcomes);
            }
            Command::Latest => {
                let client = OpenWeatherClient::new(config.api_key()?);
                let store = Store::new(config.data_dir());

                let outcomes = backfill::fetch_latest_all(&client, &store, &config.cities()).await;
                print_outcomes(&outcomes);
            }
            Command::Report { from, to, city } => {
                run_report(&config, from, to, city.as_deref())?;
            }
            Command::Configure => {
                configure(config)?;
            }
        }

        Ok(())
    }
}

fn print_outcomes(outcomes: &[(String, Result<BackfillSummary>)]) {
    for (city, outcome) in outcomes {
        match outcome {
            Ok(summary) if summary.missing == 0 => {
                println!("{city}: up to date");
            }
            Ok(summary) => {
                let mut parts = vec![format!("{} fetched", summary.fetched)];
                if summary.no_data > 0 {
                    parts.push(format!("{} without data", summary.no_data));
                }
                if summary.failed > 0 {
                    parts.push(format!("{} failed", summary.failed));
                }
                if summary.duplicates > 0 {
                    parts.push(format!("{} duplicates dropped", summary.duplicates));
                }
                println!(
                    "{city}: {} of {} missing hours ({})",
                    summary.fetched,
                    summary.missing,
                    parts.join(", ")
                );
            }
            Err(err) => {
                println!("{city}: FAILED ({err:#})");
            }
        }
    }
}

fn run_report(
    config: &Config,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    city_filter: Option<&str>,
) -> Result<()> {
    let store = Store::new(config.data_dir());

    let cities = match city_filter {
        Some(name) => match config.city_by_name(name) {
            Some(city) => vec![city],
            None => bail!("Unknown city '{name}'. Configured cities: {}", city_names(config)),
        },
        None => config.cities(),
    };

    for city in &cities {
        // A city whose archive cannot be read is surfaced inline; the other
        // cities still render.
        let records = match store.load(city) {
            Ok(records) => records,
            Err(err) => {
                eprintln!("{}: warning: {err}", city.name);
                continue;
            }
        };

        match CityReport::build(&city.name, &records, from, to) {
            Some(report) => print_report(&report),
            None => println!("{}: no data in the selected range\n", city.name),
        }
    }

    Ok(())
}

fn print_report(report: &CityReport) {
    println!("{} ({} observations)", report.city, report.count);
    println!(
        "  span:        {} .. {}",
        report.first.format("%Y-%m-%d %H:%M UTC"),
        report.last.format("%Y-%m-%d %H:%M UTC")
    );
    println!(
        "  temperature: min {:.1}°C / mean {:.1}°C / max {:.1}°C",
        report.temperature_min, report.temperature_mean, report.temperature_max
    );
    println!(
        "  humidity:    min {:.0}% / mean {:.0}% / max {:.0}%",
        report.humidity_min, report.humidity_mean, report.humidity_max
    );
    println!();
}

fn city_names(config: &Config) -> String {
    config
        .cities()
        .iter()
        .map(|city| city.name.clone())
        .collect::<Vec<_>>()
        .join(", ")
}

fn configure(mut config: Config) -> Result<()> {
    let api_key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }

    config.api_key = Some(api_key.trim().to_string());
    config.save()?;

    let path = Config::config_file_path()?;
    println!("Saved API key to {}", path.display());

    Ok(())
}
