//! Read-only access to the forecast store.
//!
//! `ForecastStore` is the only way the core reaches ingested data. The
//! production implementation (`pg::PgStore`) pushes distance and
//! string-matching work into SQL; `memory::MemoryStore` evaluates the same
//! orderings in process for fixtures and tests.
//!
//! Queries within one request are independent. Nothing here assumes the
//! ingestion job is idle, so callers must tolerate observing a partially
//! refreshed dataset.

pub mod memory;
pub mod pg;

use crate::error::StoreError;
use crate::model::{ForecastParam, LocationFilter, LocationMatch, Observation, ParamId, Warning};

pub use self::memory::MemoryStore;
pub use self::pg::PgStore;

/// How a proximity search ranks candidates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Proximity {
    /// Keep candidates with `distance <= radius_km / tier`, order by
    /// (tier, distance).
    Tiered { radius_km: f64 },
    /// No radius filter, order by distance alone.
    ClosestOnly,
}

/// A single nearest-location lookup.
#[derive(Debug, Clone, Copy)]
pub struct ProximityQuery<'a> {
    pub lat: f64,
    pub lon: f64,
    pub filter: &'a LocationFilter,
    pub proximity: Proximity,
}

pub trait ForecastStore {
    /// Best location for a proximity query, or `None` when nothing passes.
    fn closest_location(
        &mut self,
        query: &ProximityQuery<'_>,
    ) -> Result<Option<LocationMatch>, StoreError>;

    /// Location whose search name is closest to `search_name`, ties broken
    /// by ascending tier. Never thresholded.
    fn best_name_match(
        &mut self,
        search_name: &str,
        filter: &LocationFilter,
    ) -> Result<Option<LocationMatch>, StoreError>;

    /// Ids of locations the last ingestion flagged as missing parameters.
    fn locations_missing_parameters(&mut self) -> Result<Vec<String>, StoreError>;

    /// Parameters known to the store among `ids`, in no particular order.
    fn forecast_params(&mut self, ids: &[ParamId]) -> Result<Vec<ForecastParam>, StoreError>;

    /// Observations for one location at or after `from`, restricted to
    /// `param_ids`.
    fn observations(
        &mut self,
        location_id: &str,
        from: &str,
        param_ids: &[ParamId],
    ) -> Result<Vec<Observation>, StoreError>;

    /// Ids of warnings with at least one bounding box containing the point.
    fn warning_ids_at(&mut self, lat: f64, lon: f64) -> Result<Vec<i64>, StoreError>;

    fn warnings_by_ids(&mut self, ids: &[i64]) -> Result<Vec<Warning>, StoreError>;

    /// Stored aurora probability for an integer grid cell.
    fn aurora_probability(&mut self, lat: i32, lon: i32) -> Result<Option<f64>, StoreError>;
}
