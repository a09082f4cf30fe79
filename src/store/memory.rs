//! In-process store.
//!
//! Holds plain vectors and evaluates the same filters and orderings the SQL
//! store does. Used to build fixtures for integration tests and for
//! offline diagnostics.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use super::{ForecastStore, Proximity, ProximityQuery};
use crate::error::StoreError;
use crate::geo::haversine_km;
use crate::model::{
    ForecastParam, Location, LocationFilter, LocationMatch, Observation, ParamId, Warning,
    WarningBound,
};
use crate::normalize::edit_distance;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    locations: Vec<Location>,
    params: Vec<ForecastParam>,
    observations: Vec<Observation>,
    warnings: Vec<Warning>,
    bounds: Vec<WarningBound>,
    aurora: HashMap<(i32, i32), f64>,
    missing_parameters: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_location(&mut self, location: Location) -> &mut Self {
        self.locations.push(location);
        self
    }

    pub fn add_param(&mut self, param: ForecastParam) -> &mut Self {
        self.params.push(param);
        self
    }

    /// Inserts an observation, replacing any existing value for the same
    /// (location, parameter, time).
    pub fn add_observation(&mut self, observation: Observation) -> &mut Self {
        self.observations.retain(|o| {
            !(o.location_id == observation.location_id
                && o.param_id == observation.param_id
                && o.time == observation.time)
        });
        self.observations.push(observation);
        self
    }

    pub fn add_warning(&mut self, warning: Warning) -> &mut Self {
        self.warnings.push(warning);
        self
    }

    pub fn add_bound(&mut self, bound: WarningBound) -> &mut Self {
        self.bounds.push(bound);
        self
    }

    pub fn set_aurora(&mut self, lat: i32, lon: i32, probability: f64) -> &mut Self {
        self.aurora.insert((lat, lon), probability);
        self
    }

    pub fn flag_missing_parameters(&mut self, location_id: &str) -> &mut Self {
        self.missing_parameters.push(location_id.to_string());
        self
    }

    fn candidates<'a>(
        &'a self,
        filter: &'a LocationFilter,
    ) -> impl Iterator<Item = &'a Location> + 'a {
        self.locations.iter().filter(move |l| filter.admits(l))
    }
}

fn by_distance(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

impl ForecastStore for MemoryStore {
    fn closest_location(
        &mut self,
        query: &ProximityQuery<'_>,
    ) -> Result<Option<LocationMatch>, StoreError> {
        let scored = self.candidates(query.filter).map(|l| LocationMatch {
            location: l.clone(),
            distance: haversine_km(query.lat, query.lon, l.lat, l.lon),
        });

        let best = match query.proximity {
            Proximity::Tiered { radius_km } => scored
                .filter(|m| m.distance <= radius_km / f64::from(m.location.category.tier()))
                .min_by(|a, b| {
                    a.location
                        .category
                        .tier()
                        .cmp(&b.location.category.tier())
                        .then_with(|| by_distance(a.distance, b.distance))
                }),
            Proximity::ClosestOnly => scored.min_by(|a, b| by_distance(a.distance, b.distance)),
        };

        Ok(best)
    }

    fn best_name_match(
        &mut self,
        search_name: &str,
        filter: &LocationFilter,
    ) -> Result<Option<LocationMatch>, StoreError> {
        let best = self
            .candidates(filter)
            .map(|l| LocationMatch {
                location: l.clone(),
                distance: edit_distance(&l.search_name, search_name) as f64,
            })
            .min_by(|a, b| {
                by_distance(a.distance, b.distance)
                    .then_with(|| a.location.category.tier().cmp(&b.location.category.tier()))
            });

        Ok(best)
    }

    fn locations_missing_parameters(&mut self) -> Result<Vec<String>, StoreError> {
        Ok(self.missing_parameters.clone())
    }

    fn forecast_params(&mut self, ids: &[ParamId]) -> Result<Vec<ForecastParam>, StoreError> {
        Ok(self
            .params
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    fn observations(
        &mut self,
        location_id: &str,
        from: &str,
        param_ids: &[ParamId],
    ) -> Result<Vec<Observation>, StoreError> {
        Ok(self
            .observations
            .iter()
            .filter(|o| {
                o.location_id == location_id
                    && o.time.as_str() >= from
                    && param_ids.contains(&o.param_id)
            })
            .cloned()
            .collect())
    }

    fn warning_ids_at(&mut self, lat: f64, lon: f64) -> Result<Vec<i64>, StoreError> {
        let ids: BTreeSet<i64> = self
            .bounds
            .iter()
            .filter(|b| b.contains(lat, lon))
            .map(|b| b.warning_id)
            .collect();
        Ok(ids.into_iter().collect())
    }

    fn warnings_by_ids(&mut self, ids: &[i64]) -> Result<Vec<Warning>, StoreError> {
        Ok(self
            .warnings
            .iter()
            .filter(|w| ids.contains(&w.id))
            .cloned()
            .collect())
    }

    fn aurora_probability(&mut self, lat: i32, lon: i32) -> Result<Option<f64>, StoreError> {
        Ok(self.aurora.get(&(lat, lon)).copied())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    fn location(id: &str, name: &str, lat: f64, lon: f64, category: Category) -> Location {
        Location {
            id: id.to_string(),
            source: "LV".to_string(),
            name: name.to_string(),
            search_name: crate::normalize::normalize(name),
            lat,
            lon,
            category,
            county: String::new(),
        }
    }

    fn all() -> LocationFilter {
        LocationFilter::new(Category::DOMESTIC.to_vec())
    }

    #[test]
    fn test_tiered_prefers_higher_tier_within_scaled_radius() {
        let mut store = MemoryStore::new();
        store
            .add_location(location("V1", "Ciemats", 56.950, 24.100, Category::Village))
            .add_location(location("C1", "Pilsēta", 56.980, 24.100, Category::Capital));

        let filter = all();
        let found = store
            .closest_location(&ProximityQuery {
                lat: 56.950,
                lon: 24.100,
                filter: &filter,
                proximity: Proximity::Tiered { radius_km: 10.0 },
            })
            .expect("memory store does not fail")
            .expect("a location should pass the radius filter");

        assert_eq!(found.location.id, "C1");
    }

    #[test]
    fn test_tiered_radius_scales_down_for_low_tiers() {
        let mut store = MemoryStore::new();
        // ~3.3 km away: outside 10/5 = 2 km for a village
        store.add_location(location("V1", "Ciemats", 56.980, 24.100, Category::Village));

        let filter = all();
        let query = ProximityQuery {
            lat: 56.950,
            lon: 24.100,
            filter: &filter,
            proximity: Proximity::Tiered { radius_km: 10.0 },
        };
        assert!(store.closest_location(&query).unwrap().is_none());

        let closest = ProximityQuery {
            proximity: Proximity::ClosestOnly,
            ..query
        };
        assert_eq!(store.closest_location(&closest).unwrap().unwrap().location.id, "V1");
    }

    #[test]
    fn test_filter_respected() {
        let mut store = MemoryStore::new();
        store.add_location(location("V1", "Ciemats", 56.95, 24.1, Category::Village));

        let filter = LocationFilter::new(vec![Category::Capital]);
        let result = store
            .closest_location(&ProximityQuery {
                lat: 56.95,
                lon: 24.1,
                filter: &filter,
                proximity: Proximity::ClosestOnly,
            })
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_name_match_breaks_ties_by_tier() {
        let mut store = MemoryStore::new();
        store
            .add_location(location("V1", "Rīga", 57.0, 25.0, Category::Village))
            .add_location(location("C1", "Rīga", 56.95, 24.1, Category::Capital));

        let found = store.best_name_match("riga", &all()).unwrap().unwrap();
        assert_eq!(found.location.id, "C1");
        assert_eq!(found.distance, 0.0);
    }

    #[test]
    fn test_observation_upsert_replaces_value() {
        let mut store = MemoryStore::new();
        let obs = |value| Observation {
            location_id: "C1".to_string(),
            param_id: 2,
            time: "202405011200".to_string(),
            value,
        };
        store.add_observation(obs(5.0)).add_observation(obs(7.5));

        let rows = store.observations("C1", "202405010000", &[2]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 7.5);
    }

    #[test]
    fn test_observations_respect_lower_bound() {
        let mut store = MemoryStore::new();
        for time in ["202405011100", "202405011200", "202405011300"] {
            store.add_observation(Observation {
                location_id: "C1".to_string(),
                param_id: 2,
                time: time.to_string(),
                value: 1.0,
            });
        }
        let rows = store.observations("C1", "202405011200", &[2]).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_warning_ids_deduplicated_across_polygons() {
        let mut store = MemoryStore::new();
        for polygon_id in [1, 2] {
            store.add_bound(WarningBound {
                warning_id: 7,
                polygon_id,
                min_lat: 56.0,
                max_lat: 58.0,
                min_lon: 23.0,
                max_lon: 25.0,
            });
        }
        assert_eq!(store.warning_ids_at(57.0, 24.0).unwrap(), vec![7]);
    }
}
