//! Service configuration loader - parses meteo.toml
//!
//! Keeps search radii, the domestic bounding box, forecast parameter lists,
//! response shaping and data-file locations out of the code so they can be
//! tuned without recompiling. Every field has a default; an empty file is a
//! valid configuration.

use chrono_tz::Tz;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::model::ParamId;

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "meteo.toml";

// ---------------------------------------------------------------------------
// TOML Configuration Structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub forecast: ForecastConfig,
    pub response: ResponseConfig,
    pub paths: PathsConfig,
    pub server: ServerConfig,
}

/// Nearest-location and name search tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Densely covered domestic area where the tiered regime applies.
    pub domestic_bounds: BoundingBox,
    /// Ascending radius thresholds tried by the tiered regime, in km.
    pub radius_steps_km: Vec<f64>,
    /// Highest tier eligible while emergency mode is active.
    pub emergency_max_tier: i32,
    /// String distance used for name search.
    pub name_distance: NameDistance,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            domestic_bounds: BoundingBox::default(),
            radius_steps_km: vec![10.0],
            emergency_max_tier: 1,
            name_distance: NameDistance::Levenshtein,
        }
    }
}

/// Inclusive latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            min_lat: 55.7,
            max_lat: 58.05,
            min_lon: 20.95,
            max_lon: 28.25,
        }
    }
}

impl BoundingBox {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

/// Approximate string distance functions the store can evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameDistance {
    /// `fuzzystrmatch.levenshtein`
    Levenshtein,
    /// `pg_trgm` distance operator `<->`
    Trigram,
}

impl NameDistance {
    /// Extension that must be installed for this function.
    pub fn extension(self) -> &'static str {
        match self {
            NameDistance::Levenshtein => "fuzzystrmatch",
            NameDistance::Trigram => "pg_trgm",
        }
    }
}

/// A forecast parameter slot: store id plus the name used in responses.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParamSpec {
    pub id: ParamId,
    pub name: String,
}

impl ParamSpec {
    fn new(id: ParamId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Hourly slots, in response order.
    pub hourly: Vec<ParamSpec>,
    /// Daily slots, in response order.
    pub daily: Vec<ParamSpec>,
    /// `HHMM` suffix of daily timestamps that need shifting one hour forward.
    pub daily_rollback_suffix: String,
    /// IANA zone used for "now" and for freshness timestamps.
    pub timezone: String,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            hourly: vec![
                ParamSpec::new(1, "icon"),
                ParamSpec::new(2, "temperature"),
                ParamSpec::new(3, "feels_like"),
                ParamSpec::new(4, "wind_speed"),
                ParamSpec::new(5, "wind_direction"),
                ParamSpec::new(6, "wind_gust"),
                ParamSpec::new(7, "precipitation"),
                ParamSpec::new(10, "uv_index"),
                ParamSpec::new(11, "thunder_probability"),
            ],
            daily: vec![
                ParamSpec::new(13, "wind_speed_avg"),
                ParamSpec::new(14, "wind_gust_max"),
                ParamSpec::new(15, "temperature_max"),
                ParamSpec::new(16, "temperature_min"),
                ParamSpec::new(17, "precipitation_sum"),
                ParamSpec::new(18, "precipitation_probability"),
                ParamSpec::new(19, "icon_night"),
                ParamSpec::new(20, "icon_day"),
            ],
            daily_rollback_suffix: "2300".to_string(),
            timezone: "Europe/Riga".to_string(),
        }
    }
}

/// How forecast `vals` are laid out in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValsLayout {
    /// Positional list in configured parameter order.
    List,
    /// Object keyed by slot name.
    Named,
}

/// What to emit for a parameter slot with no observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingValues {
    /// Leave the key out (named) or emit `null` (list).
    Omit,
    /// Emit `missing_sentinel`.
    Sentinel,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    pub vals_layout: ValsLayout,
    pub missing_values: MissingValues,
    pub missing_sentinel: f64,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            vals_layout: ValsLayout::List,
            missing_values: MissingValues::Omit,
            missing_sentinel: -999.0,
        }
    }
}

/// Files written by the ingestion job that the service reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub run_emergency: PathBuf,
    pub run_emergency_failed: PathBuf,
    pub missing_params: PathBuf,
    /// Dataset metadata document (`result.metadata_modified`).
    pub dataset_metadata: PathBuf,
    /// Aurora forecast times document (`Forecast Time`).
    pub aurora_times: PathBuf,
    /// Timestamp of the last download that skipped nothing.
    pub last_updated: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            run_emergency: PathBuf::from("run_emergency"),
            run_emergency_failed: PathBuf::from("run_emergency_failed"),
            missing_params: PathBuf::from("missing_params"),
            dataset_metadata: PathBuf::from(
                "data/meteorologiskas-prognozes-apdzivotam-vietam.json",
            ),
            aurora_times: PathBuf::from("data/ovation_aurora_times.json"),
            last_updated: PathBuf::from("last_updated"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Request workers; each holds its own database connection.
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            workers: 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading and validation
// ---------------------------------------------------------------------------

impl Config {
    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&contents).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    /// Parses and validates configuration text.
    pub fn from_toml(contents: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Resolves the config path from `METEO_CONFIG`, falling back to
    /// `meteo.toml`.
    pub fn default_path() -> PathBuf {
        std::env::var("METEO_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let steps = &self.search.radius_steps_km;
        if steps.is_empty() {
            return Err(ConfigError::Invalid(
                "search.radius_steps_km must not be empty".to_string(),
            ));
        }
        if steps.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return Err(ConfigError::Invalid(
                "search.radius_steps_km must contain positive radii".to_string(),
            ));
        }
        if steps.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::Invalid(
                "search.radius_steps_km must be strictly ascending".to_string(),
            ));
        }

        let b = &self.search.domestic_bounds;
        if b.min_lat > b.max_lat || b.min_lon > b.max_lon {
            return Err(ConfigError::Invalid(
                "search.domestic_bounds is inverted".to_string(),
            ));
        }

        if !(1..=5).contains(&self.search.emergency_max_tier) {
            return Err(ConfigError::Invalid(format!(
                "search.emergency_max_tier must be between 1 and 5, got {}",
                self.search.emergency_max_tier
            )));
        }

        if self.forecast.hourly.is_empty() || self.forecast.daily.is_empty() {
            return Err(ConfigError::Invalid(
                "forecast.hourly and forecast.daily must list at least one parameter".to_string(),
            ));
        }

        self.timezone()?;

        if self.server.workers == 0 {
            return Err(ConfigError::Invalid(
                "server.workers must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// The configured forecast time zone.
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.forecast.timezone.parse::<Tz>().map_err(|_| {
            ConfigError::Invalid(format!("unknown time zone '{}'", self.forecast.timezone))
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
