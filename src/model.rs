//! Core data types for the forecast service.
//!
//! Locations, forecast parameters and observations, hazard warnings and the
//! bounding boxes used to find them. Shared by the store implementations,
//! the resolvers and the response composer. No I/O lives here.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Location categories
// ---------------------------------------------------------------------------

/// Administrative category of a location, ordered by search priority.
///
/// The numeric tier doubles as a tie-break (lower wins) and as the divisor
/// applied to the search radius in the tiered regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Capital,
    MajorCity,
    DistrictCenter,
    ParishCenter,
    Village,
    /// Locations ingested from the neighbouring country's forecast API.
    Foreign,
}

impl Category {
    /// Domestic categories in priority order.
    pub const DOMESTIC: [Category; 5] = [
        Category::Capital,
        Category::MajorCity,
        Category::DistrictCenter,
        Category::ParishCenter,
        Category::Village,
    ];

    pub fn tier(self) -> i32 {
        match self {
            Category::Capital => 1,
            Category::MajorCity => 2,
            Category::DistrictCenter => 3,
            Category::ParishCenter => 4,
            Category::Village => 5,
            Category::Foreign => 6,
        }
    }

    /// The label the ingestion job writes into `locations.category`.
    pub fn label(self) -> &'static str {
        match self {
            Category::Capital => "republikas pilseta",
            Category::MajorCity => "citas pilsētas",
            Category::DistrictCenter => "rajona centrs",
            Category::ParishCenter => "pagasta centrs",
            Category::Village => "ciems",
            Category::Foreign => "location_LT",
        }
    }

    pub fn from_label(label: &str) -> Option<Category> {
        match label {
            "republikas pilseta" => Some(Category::Capital),
            "citas pilsētas" => Some(Category::MajorCity),
            "rajona centrs" => Some(Category::DistrictCenter),
            "pagasta centrs" => Some(Category::ParishCenter),
            "ciems" => Some(Category::Village),
            "location_LT" => Some(Category::Foreign),
            _ => None,
        }
    }

    /// Domestic categories with a tier at or below `max_tier`.
    pub fn up_to_tier(max_tier: i32) -> Vec<Category> {
        Category::DOMESTIC
            .into_iter()
            .filter(|c| c.tier() <= max_tier)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

/// A named populated place forecasts are published for.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    /// Identifier, unique per source.
    pub id: String,
    /// Source tag, e.g. "LV" or "LT".
    pub source: String,
    pub name: String,
    /// Normalized form of `name` (see `normalize::normalize`).
    pub search_name: String,
    pub lat: f64,
    pub lon: f64,
    pub category: Category,
    pub county: String,
}

/// A location together with the distance that selected it.
///
/// For coordinate searches `distance` is kilometres; for name searches it is
/// the raw string distance reported by the matcher.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationMatch {
    pub location: Location,
    pub distance: f64,
}

/// Which locations a search may consider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationFilter {
    pub categories: Vec<Category>,
    /// Location ids that must never be returned.
    pub exclude_ids: Vec<String>,
}

impl LocationFilter {
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            categories,
            exclude_ids: Vec::new(),
        }
    }

    pub fn excluding(mut self, ids: Vec<String>) -> Self {
        self.exclude_ids = ids;
        self
    }

    pub fn admits(&self, location: &Location) -> bool {
        self.categories.contains(&location.category)
            && !self.exclude_ids.iter().any(|id| *id == location.id)
    }

    pub fn category_labels(&self) -> Vec<&'static str> {
        self.categories.iter().map(|c| c.label()).collect()
    }
}

// ---------------------------------------------------------------------------
// Forecast parameters and observations
// ---------------------------------------------------------------------------

/// Numeric identifier of a forecast parameter.
pub type ParamId = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Hourly,
    Daily,
}

/// A measurable quantity as known to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastParam {
    pub id: ParamId,
    pub title_lv: String,
    pub title_en: String,
}

/// One (location, parameter, timestamp) → value fact.
///
/// `time` is a fixed-width `YYYYMMDDHHMM` string, so lexical order is
/// chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub location_id: String,
    pub param_id: ParamId,
    pub time: String,
    pub value: f64,
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Ordinal warning severity. Declaration order is rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Yellow,
    Orange,
    Red,
}

impl Severity {
    /// Maps an English intensity label to a severity. Unknown labels rank as
    /// `None`.
    pub fn from_intensity(label: &str) -> Option<Severity> {
        match label {
            "Yellow" => Some(Severity::Yellow),
            "Orange" => Some(Severity::Orange),
            "Red" => Some(Severity::Red),
            _ => None,
        }
    }

    pub fn rank(self) -> i32 {
        match self {
            Severity::Yellow => 1,
            Severity::Orange => 2,
            Severity::Red => 3,
        }
    }
}

/// A published hazard advisory, in both languages.
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub id: i64,
    pub intensity_lv: String,
    pub intensity_en: String,
    pub regions_lv: String,
    pub regions_en: String,
    pub type_lv: String,
    pub type_en: String,
    pub time_from: String,
    pub time_to: String,
    pub description_lv: String,
    pub description_en: String,
}

impl Warning {
    pub fn severity(&self) -> Option<Severity> {
        Severity::from_intensity(&self.intensity_en)
    }
}

/// Axis-aligned bounding box of one warning polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct WarningBound {
    pub warning_id: i64,
    pub polygon_id: i64,
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl WarningBound {
    /// Inclusive containment. An inverted box (min > max) contains nothing.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
