//! Per-request response assembly.
//!
//! Resolves the target, decides whether the hourly forecast comes from an
//! override location, then gathers forecasts, warnings, aurora data and
//! freshness stamps into one `CityForecast`. Queries are issued one after
//! another without a shared transaction; a response may straddle an
//! ingestion run.
//!
//! Resolution failure is not an error. It produces an empty city name and
//! empty forecast and warning lists. Only store failures propagate.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::{debug, warn};
use serde::Serialize;

use crate::aurora::{self, AuroraProbability};
use crate::config::Config;
use crate::degraded::{
    eligible_categories, DegradedModeState, EmergencyState, FileSentinels, SentinelSource,
    ServiceMeta,
};
use crate::error::{ConfigError, StoreError};
use crate::forecast::{self, ForecastEntry, TIME_FORMAT};
use crate::freshness;
use crate::model::{Cadence, Category, Location, LocationFilter, LocationMatch};
use crate::name_search;
use crate::resolver;
use crate::store::ForecastStore;
use crate::warnings::{self, WarningMode, WarningsPayload};

// ---------------------------------------------------------------------------
// Context and requests
// ---------------------------------------------------------------------------

/// Read-only state shared by every request.
pub struct ServiceContext {
    pub config: Config,
    pub tz: Tz,
    pub sentinels: Box<dyn SentinelSource + Send + Sync>,
}

impl ServiceContext {
    /// Context reading sentinels from the configured files.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let sentinels = FileSentinels::new(config.paths.clone());
        Self::with_sentinels(config, Box::new(sentinels))
    }

    pub fn with_sentinels(
        config: Config,
        sentinels: Box<dyn SentinelSource + Send + Sync>,
    ) -> Result<Self, ConfigError> {
        let tz = config.timezone()?;
        Ok(Self {
            config,
            tz,
            sentinels,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Coordinates { lat: f64, lon: f64 },
    Name(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestFlags {
    pub add_last_no_skip: bool,
    pub use_simple_warnings: bool,
    pub add_city_coords: bool,
    pub extended_search: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    pub target: Target,
    pub flags: RequestFlags,
}

impl ForecastRequest {
    pub fn at(lat: f64, lon: f64) -> Self {
        Self {
            target: Target::Coordinates { lat, lon },
            flags: RequestFlags::default(),
        }
    }

    pub fn named(name: &str) -> Self {
        Self {
            target: Target::Name(name.to_string()),
            flags: RequestFlags::default(),
        }
    }

    pub fn with_flags(mut self, flags: RequestFlags) -> Self {
        self.flags = flags;
        self
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityForecast {
    pub city: String,
    pub hourly_forecast: Vec<ForecastEntry>,
    pub daily_forecast: Vec<ForecastEntry>,
    pub warnings: WarningsPayload,
    pub aurora_probs: AuroraProbability,
    pub last_updated: String,
    pub last_downloaded: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_downloaded_no_skip: Option<String>,
    /// String distance of a by-name match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_distance: Option<f64>,

    /// Location the daily forecast (and the city name) came from.
    #[serde(skip)]
    pub resolved: Option<Location>,
    /// Location the hourly forecast came from.
    #[serde(skip)]
    pub hourly_source: Option<Location>,
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Composes a response, reading degraded-mode state fresh.
pub fn compose(
    store: &mut dyn ForecastStore,
    ctx: &ServiceContext,
    request: &ForecastRequest,
    now: DateTime<Utc>,
) -> Result<CityForecast, StoreError> {
    let state = DegradedModeState::read_from(ctx.sentinels.as_ref(), store)?;
    compose_with_state(store, ctx, request, &state, now)
}

/// Composes a response against an explicit degraded-mode state.
pub fn compose_with_state(
    store: &mut dyn ForecastStore,
    ctx: &ServiceContext,
    request: &ForecastRequest,
    state: &DegradedModeState,
    now: DateTime<Utc>,
) -> Result<CityForecast, StoreError> {
    let config = &ctx.config;
    let flags = request.flags;
    let eligible = eligible_categories(flags.extended_search);

    let matched: Option<LocationMatch> = match &request.target {
        Target::Coordinates { lat, lon } => resolver::resolve(
            store,
            &config.search,
            &LocationFilter::new(eligible.clone()),
            *lat,
            *lon,
        )?,
        Target::Name(name) => name_search::resolve_by_name(store, name, flags.extended_search)?,
    };
    let match_distance = match (&request.target, &matched) {
        (Target::Name(_), Some(m)) => Some(m.distance),
        _ => None,
    };
    let resolved = matched.map(|m| m.location);

    let hourly_source = hourly_source(store, ctx, state, &eligible, resolved.as_ref())?;

    let from = now.with_timezone(&ctx.tz).format(TIME_FORMAT).to_string();
    let hourly_params = forecast::resolve_params(store, &config.forecast.hourly)?;
    let daily_params = forecast::resolve_params(store, &config.forecast.daily)?;

    let hourly = forecast::get_forecast(
        store,
        hourly_source.as_ref(),
        &from,
        &hourly_params,
        Cadence::Hourly,
        &config.forecast.daily_rollback_suffix,
    )?;
    let daily = forecast::get_forecast(
        store,
        resolved.as_ref(),
        &from,
        &daily_params,
        Cadence::Daily,
        &config.forecast.daily_rollback_suffix,
    )?;

    let mode = WarningMode::from_simple_flag(flags.use_simple_warnings);
    let warnings = match &resolved {
        Some(location) => warnings::get_warnings(store, location.lat, location.lon, mode)?,
        None => WarningsPayload::empty(mode),
    };

    // Unresolved coordinate requests still get aurora data for the raw point.
    let point = match (&resolved, &request.target) {
        (Some(location), _) => Some((location.lat, location.lon)),
        (None, Target::Coordinates { lat, lon }) => Some((*lat, *lon)),
        (None, Target::Name(_)) => None,
    };
    let issue = aurora::read_forecast_time(&config.paths.aurora_times);
    let aurora_probs = match point {
        Some((lat, lon)) => aurora::get_aurora(store, issue, lat, lon, now, ctx.tz)?,
        None => AuroraProbability::at_issue(issue, now, ctx.tz),
    };

    let stamps = freshness::read_freshness(&config.paths.dataset_metadata, ctx.tz);
    let last_downloaded_no_skip = flags
        .add_last_no_skip
        .then(|| freshness::read_last_no_skip(&config.paths.last_updated));

    let coords = if flags.add_city_coords { point } else { None };

    Ok(CityForecast {
        city: resolved.as_ref().map(|l| l.name.clone()).unwrap_or_default(),
        hourly_forecast: forecast::shape(hourly, &hourly_params, &config.response),
        daily_forecast: forecast::shape(daily, &daily_params, &config.response),
        warnings,
        aurora_probs,
        last_updated: stamps.last_updated,
        last_downloaded: stamps.last_downloaded,
        lat: coords.map(|(lat, _)| lat),
        lon: coords.map(|(_, lon)| lon),
        last_downloaded_no_skip,
        match_distance,
        resolved,
        hourly_source,
    })
}

/// Picks the location the hourly forecast is read from.
///
/// Normally the resolved location itself. Under degraded mode the search is
/// rerun from the resolved location's coordinates with the override
/// filter; if that finds nothing the resolved location is kept.
fn hourly_source(
    store: &mut dyn ForecastStore,
    ctx: &ServiceContext,
    state: &DegradedModeState,
    eligible: &[Category],
    resolved: Option<&Location>,
) -> Result<Option<Location>, StoreError> {
    let Some(location) = resolved else {
        return Ok(None);
    };
    if !state.needs_hourly_override(Some(location)) {
        return Ok(Some(location.clone()));
    }

    let filter = state.override_filter(eligible, ctx.config.search.emergency_max_tier);
    let replacement = resolver::resolve(store, &ctx.config.search, &filter, location.lat, location.lon)?;
    match replacement {
        Some(m) => {
            debug!(
                "Hourly forecast for {} overridden with {}",
                location.id, m.location.id
            );
            Ok(Some(m.location))
        }
        None => {
            warn!(
                "No override location for {}; using it for the hourly forecast",
                location.id
            );
            Ok(Some(location.clone()))
        }
    }
}

/// Payload for the service status endpoint.
pub fn meta(ctx: &ServiceContext, now: DateTime<Utc>) -> ServiceMeta {
    let emergency = EmergencyState::read_from(ctx.sentinels.as_ref());
    let issue = aurora::read_forecast_time(&ctx.config.paths.aurora_times);
    ServiceMeta::new(&emergency, issue, now)
}
