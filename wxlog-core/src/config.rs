use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// Environment variable that overrides the API key stored in the config file.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// One archived city: display name, geocoding query and backing CSV filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityConfig {
    pub name: String,
    /// Geocoding query, e.g. "Cape Town,ZA".
    pub query: String,
    /// Filename of the city's CSV inside the data directory.
    pub filename: String,
}

impl CityConfig {
    pub fn new(name: &str, query: &str, filename: &str) -> Self {
        Self {
            name: name.to_string(),
            query: query.to_string(),
            filename: filename.to_string(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// data_dir = "weather_data"
///
/// [[cities]]
/// name = "Cape Town"
/// query = "Cape Town,ZA"
/// filename = "cape_town_weather.csv"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// OpenWeather API key; `OPENWEATHER_API_KEY` takes precedence when set.
    pub api_key: Option<String>,

    /// Directory holding the per-city CSV files. Defaults to `weather_data`.
    pub data_dir: Option<PathBuf>,

    /// Cities to archive. Empty means the built-in registry.
    #[serde(default)]
    pub cities: Vec<CityConfig>,
}

/// Built-in city registry, used when the config file does not list any.
pub fn default_cities() -> Vec<CityConfig> {
    vec![
        CityConfig::new("Cape Town", "Cape Town,ZA", "cape_town_weather.csv"),
        CityConfig::new("Kigali", "Kigali,RW", "kigali_weather.csv"),
        CityConfig::new("Kampala", "Kampala,UG", "kampala_weather.csv"),
    ]
}

impl Config {
    /// Resolve the API key, preferring the environment over the config file.
    pub fn api_key(&self) -> Result<String> {
        let from_env = env::var(API_KEY_ENV).ok().filter(|key| !key.is_empty());

        from_env.or_else(|| self.api_key.clone()).ok_or_else(|| {
            anyhow!(
                "No OpenWeather API key configured.\n\
                 Hint: run `wxlog configure`, or set the {API_KEY_ENV} environment variable."
            )
        })
    }

    /// Cities to archive: the configured list, or the built-in registry.
    pub fn cities(&self) -> Vec<CityConfig> {
        if self.cities.is_empty() {
            default_cities()
        } else {
            self.cities.clone()
        }
    }

    /// Directory the per-city CSV files live in.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("weather_data"))
    }

    /// Look up a configured city by (case-insensitive) name.
    pub fn city_by_name(&self, name: &str) -> Option<CityConfig> {
        self.cities()
            .into_iter()
            .find(|city| city.name.eq_ignore_ascii_case(name))
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "wxlog", "wxlog")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
