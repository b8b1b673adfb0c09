use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf, time::Duration};

/// Top-level configuration, constructed once at startup and passed explicitly
/// to each component. Stored on disk as TOML; secrets can also come from the
/// environment (`OPENWEATHER_API_KEY`, `WEATHER_ETL_DB`), which takes
/// precedence over the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ordered list of cities polled every tick.
    pub cities: Vec<String>,

    /// Weather API key. Empty means "not configured".
    pub api_key: String,

    /// Current-conditions endpoint.
    pub api_base_url: String,

    /// Path to the SQLite database file.
    pub database: PathBuf,

    /// Consecutive failed ticks tolerated before a fatal stop.
    pub max_failures: u32,

    /// Seconds between scheduled pipeline runs.
    pub schedule_interval_secs: u64,

    /// Seconds the scheduler sleeps between due-time checks.
    pub poll_interval_secs: u64,

    /// Path of the pipeline log file.
    pub log_file: PathBuf,

    /// Log file size that triggers rotation.
    pub log_max_bytes: u64,

    /// Number of rotated log files kept.
    pub log_max_backups: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cities: ["London", "New York", "Tokyo", "Mumbai", "Sydney"]
                .map(String::from)
                .to_vec(),
            api_key: String::new(),
            api_base_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            database: default_database_path(),
            max_failures: 5,
            schedule_interval_secs: 3600,
            poll_interval_secs: 60,
            log_file: PathBuf::from("weather_etl.log"),
            log_max_bytes: 1024 * 1024,
            log_max_backups: 3,
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    /// Environment overrides are applied in both cases.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let mut cfg = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            // First run: no config file, start from defaults.
            Self::default()
        };

        cfg.apply_env_overrides();
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
        let dirs = ProjectDirs::from("dev", "weather-etl", "weather-etl")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// API key, or an actionable error when none is configured.
    pub fn require_api_key(&self) -> Result<&str> {
        if self.api_key.is_empty() {
            return Err(anyhow!(
                "No weather API key configured.\n\
                 Hint: run `weather-etl configure` or set OPENWEATHER_API_KEY."
            ));
        }
        Ok(&self.api_key)
    }

    pub fn schedule_interval(&self) -> Duration {
        Duration::from_secs(self.schedule_interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = env::var("OPENWEATHER_API_KEY")
            && !key.is_empty()
        {
            self.api_key = key;
        }
        if let Ok(db) = env::var("WEATHER_ETL_DB")
            && !db.is_empty()
        {
            self.database = PathBuf::from(db);
        }
    }
}

fn default_database_path() -> PathBuf {
    ProjectDirs::from("dev", "weather-etl", "weather-etl")
        .map(|dirs| dirs.data_dir().join("weather_analytics.db"))
        .unwrap_or_else(|| PathBuf::from("weather_analytics.db"))
}
