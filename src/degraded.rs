//! Degraded-mode state.
//!
//! The ingestion job signals two independent conditions through sentinel
//! files: an emergency (the bulk source failed and a fallback crawl is
//! supplying hourly data) and missing parameters (some locations came in
//! with fewer parameters than expected). The service reads both fresh on
//! every request into a `DegradedModeState` value and never caches them.
//! Reads race with the job flipping the files; that is acceptable.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};

use crate::config::PathsConfig;
use crate::error::StoreError;
use crate::model::{Category, Location, LocationFilter};
use crate::store::ForecastStore;

// ---------------------------------------------------------------------------
// Sentinels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentinel {
    /// Fallback crawl is active. First line holds when it started.
    Emergency,
    /// The fallback crawl itself failed.
    EmergencyFailed,
    /// At least one location is missing forecast parameters.
    MissingParameters,
}

/// Where sentinel markers are read from.
pub trait SentinelSource {
    fn exists(&self, sentinel: Sentinel) -> bool;

    /// First line of the marker, without the trailing newline. `None` when
    /// the marker is absent or unreadable.
    fn read(&self, sentinel: Sentinel) -> Option<String>;
}

/// Sentinel markers as files written by the ingestion job.
#[derive(Debug, Clone)]
pub struct FileSentinels {
    paths: PathsConfig,
}

impl FileSentinels {
    pub fn new(paths: PathsConfig) -> Self {
        Self { paths }
    }

    fn path(&self, sentinel: Sentinel) -> &std::path::Path {
        match sentinel {
            Sentinel::Emergency => &self.paths.run_emergency,
            Sentinel::EmergencyFailed => &self.paths.run_emergency_failed,
            Sentinel::MissingParameters => &self.paths.missing_params,
        }
    }
}

impl SentinelSource for FileSentinels {
    fn exists(&self, sentinel: Sentinel) -> bool {
        self.path(sentinel).is_file()
    }

    fn read(&self, sentinel: Sentinel) -> Option<String> {
        let path = self.path(sentinel);
        let file = fs::File::open(path).ok()?;
        let mut line = String::new();
        if let Err(e) = BufReader::new(file).read_line(&mut line) {
            warn!("Could not read sentinel {}: {}", path.display(), e);
            return None;
        }
        Some(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Sentinels held in memory, for tests and offline tools.
#[derive(Debug, Clone, Default)]
pub struct MemorySentinels {
    markers: HashMap<Sentinel, String>,
}

impl MemorySentinels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, sentinel: Sentinel, payload: &str) -> Self {
        self.markers.insert(sentinel, payload.to_string());
        self
    }
}

impl SentinelSource for MemorySentinels {
    fn exists(&self, sentinel: Sentinel) -> bool {
        self.markers.contains_key(&sentinel)
    }

    fn read(&self, sentinel: Sentinel) -> Option<String> {
        self.markers
            .get(&sentinel)
            .map(|payload| payload.lines().next().unwrap_or_default().to_string())
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Emergency signal with its payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EmergencyState {
    #[default]
    Inactive,
    /// `started` may be empty while the crawl is still starting up.
    Active { started: String },
    Failed { started: String },
}

impl EmergencyState {
    pub fn read_from(sentinels: &dyn SentinelSource) -> Self {
        if !sentinels.exists(Sentinel::Emergency) {
            return EmergencyState::Inactive;
        }
        let started = sentinels.read(Sentinel::Emergency).unwrap_or_default();
        if sentinels.exists(Sentinel::EmergencyFailed) {
            EmergencyState::Failed { started }
        } else {
            EmergencyState::Active { started }
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, EmergencyState::Inactive)
    }

    pub fn has_failed(&self) -> bool {
        matches!(self, EmergencyState::Failed { .. })
    }

    pub fn started(&self) -> Option<&str> {
        match self {
            EmergencyState::Inactive => None,
            EmergencyState::Active { started } | EmergencyState::Failed { started } => {
                Some(started)
            }
        }
    }
}

/// Snapshot of both degradation signals for one request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DegradedModeState {
    pub emergency: EmergencyState,
    pub missing_parameters: bool,
    /// Locations the store lists as incomplete. Only populated when the
    /// missing-parameters flag is set.
    pub incomplete_locations: Vec<String>,
}

impl DegradedModeState {
    /// Everything healthy.
    pub fn healthy() -> Self {
        Self::default()
    }

    pub fn emergency(started: &str) -> Self {
        Self {
            emergency: EmergencyState::Active {
                started: started.to_string(),
            },
            ..Self::default()
        }
    }

    pub fn with_missing_parameters(mut self, incomplete_locations: Vec<String>) -> Self {
        self.missing_parameters = true;
        self.incomplete_locations = incomplete_locations;
        self
    }

    /// Reads the sentinels and, when parameters are missing, the list of
    /// affected locations.
    pub fn read_from(
        sentinels: &dyn SentinelSource,
        store: &mut dyn ForecastStore,
    ) -> Result<Self, StoreError> {
        let emergency = EmergencyState::read_from(sentinels);

        let missing_parameters = sentinels.exists(Sentinel::MissingParameters);
        let incomplete_locations = if missing_parameters {
            store.locations_missing_parameters()?
        } else {
            Vec::new()
        };

        if emergency.is_active() || missing_parameters {
            debug!(
                "Degraded mode: emergency={:?}, missing_parameters={} ({} locations)",
                emergency,
                missing_parameters,
                incomplete_locations.len()
            );
        }

        Ok(Self {
            emergency,
            missing_parameters,
            incomplete_locations,
        })
    }

    pub fn is_emergency(&self) -> bool {
        self.emergency.is_active()
    }

    /// Whether the hourly forecast for `resolved` must come from another
    /// location.
    ///
    /// Either signal forces a rerun of the search from the resolved
    /// location, whether or not that location is itself incomplete. The
    /// rerun may land on a higher tier that was out of range of the
    /// original query point.
    pub fn needs_hourly_override(&self, resolved: Option<&Location>) -> bool {
        resolved.is_some() && (self.is_emergency() || self.missing_parameters)
    }

    /// Candidate filter for the hourly override search.
    pub fn override_filter(&self, eligible: &[Category], emergency_max_tier: i32) -> LocationFilter {
        let categories = if self.is_emergency() {
            Category::up_to_tier(emergency_max_tier)
        } else {
            eligible.to_vec()
        };
        LocationFilter::new(categories).excluding(self.incomplete_locations.clone())
    }
}

/// Category set a primary search may consider.
///
/// Domestic tiers always; the foreign tier only on request.
pub fn eligible_categories(extended: bool) -> Vec<Category> {
    let mut categories = Category::DOMESTIC.to_vec();
    if extended {
        categories.push(Category::Foreign);
    }
    categories
}

/// Payload of `/api/v1/meta`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ServiceMeta {
    pub is_emergency: bool,
    pub is_aurora_ood: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_dl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_emergency_failed: Option<bool>,
}

impl ServiceMeta {
    /// `aurora_issue` is the grid's forecast time, if known. An unknown
    /// issue time counts as out of date.
    pub fn new(
        emergency: &EmergencyState,
        aurora_issue: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        let active = emergency.is_active();
        Self {
            is_emergency: active,
            is_aurora_ood: aurora_issue.is_none_or(|issue| issue < now),
            emergency_dl: emergency.started().map(str::to_string),
            has_emergency_failed: active.then(|| emergency.has_failed()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
