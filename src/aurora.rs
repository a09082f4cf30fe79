//! Aurora probability lookup.
//!
//! The grid is keyed on whole degrees (longitude 0..359) and shares one
//! issue time, read from the aurora-times document. Once that time has
//! passed the grid no longer counts and every lookup reports zero.

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::StoreError;
use crate::forecast::TIME_FORMAT;
use crate::store::ForecastStore;

const FORECAST_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Deserialize)]
struct AuroraTimes {
    #[serde(rename = "Forecast Time")]
    forecast_time: String,
}

/// Parses the aurora-times document body.
pub fn parse_forecast_time(contents: &str) -> Option<DateTime<Utc>> {
    let doc: AuroraTimes = match serde_json::from_str(contents) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Malformed aurora times document: {}", e);
            return None;
        }
    };
    match NaiveDateTime::parse_from_str(&doc.forecast_time, FORECAST_TIME_FORMAT) {
        Ok(t) => Some(t.and_utc()),
        Err(e) => {
            warn!("Unparsable aurora forecast time '{}': {}", doc.forecast_time, e);
            None
        }
    }
}

/// Reads the grid issue time. `None` when the file is missing or invalid.
pub fn read_forecast_time(path: &Path) -> Option<DateTime<Utc>> {
    match fs::read_to_string(path) {
        Ok(contents) => parse_forecast_time(&contents),
        Err(e) => {
            warn!("Could not read aurora times {}: {}", path.display(), e);
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuroraProbability {
    pub prob: f64,
    /// Issue time in the service time zone, `YYYYMMDDHHMM`. Empty when
    /// unknown.
    pub time: String,
    #[serde(skip)]
    pub stale: bool,
}

impl AuroraProbability {
    pub fn unknown() -> Self {
        Self {
            prob: 0.0,
            time: String::new(),
            stale: true,
        }
    }

    /// Zero probability stamped with the grid issue time, for callers with
    /// no grid cell to look up.
    pub fn at_issue(issue: Option<DateTime<Utc>>, now: DateTime<Utc>, tz: Tz) -> Self {
        match issue {
            Some(issue) => Self {
                prob: 0.0,
                time: issue.with_timezone(&tz).format(TIME_FORMAT).to_string(),
                stale: issue < now,
            },
            None => Self::unknown(),
        }
    }
}

/// Rounds a point onto the grid.
pub fn grid_cell(lat: f64, lon: f64) -> (i32, i32) {
    let lat = lat.round() as i32;
    let lon = lon.round() as i32;
    (lat, if lon < 0 { lon + 360 } else { lon })
}

/// Probability for the grid cell containing the point.
pub fn get_aurora(
    store: &mut dyn ForecastStore,
    issue: Option<DateTime<Utc>>,
    lat: f64,
    lon: f64,
    now: DateTime<Utc>,
    tz: Tz,
) -> Result<AuroraProbability, StoreError> {
    let mut result = AuroraProbability::at_issue(issue, now, tz);
    if !result.stale {
        let (cell_lat, cell_lon) = grid_cell(lat, lon);
        result.prob = store
            .aurora_probability(cell_lat, cell_lon)?
            .unwrap_or(0.0);
    }
    Ok(result)
}
