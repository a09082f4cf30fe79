//! Nearest-location resolution.
//!
//! Inside the domestic bounding box the tiered regime walks the configured
//! radius steps in ascending order: at each step a candidate passes when
//! its distance is within `radius / tier`, and the best pass is picked by
//! (tier, distance). When no step yields a candidate, or the point lies
//! outside the box, the closest-only regime picks the nearest location of
//! any eligible category.

use log::debug;

use crate::config::SearchConfig;
use crate::error::StoreError;
use crate::model::{LocationFilter, LocationMatch};
use crate::store::{ForecastStore, Proximity, ProximityQuery};

/// Resolves coordinates to the best location admitted by `filter`.
///
/// `Ok(None)` means no eligible location exists at all.
pub fn resolve(
    store: &mut dyn ForecastStore,
    search: &SearchConfig,
    filter: &LocationFilter,
    lat: f64,
    lon: f64,
) -> Result<Option<LocationMatch>, StoreError> {
    if filter.categories.is_empty() {
        return Ok(None);
    }

    if search.domestic_bounds.contains(lat, lon) {
        for &radius_km in &search.radius_steps_km {
            let query = ProximityQuery {
                lat,
                lon,
                filter,
                proximity: Proximity::Tiered { radius_km },
            };
            if let Some(found) = store.closest_location(&query)? {
                debug!(
                    "Resolved ({}, {}) to {} within {} km step ({:.2} km away)",
                    lat, lon, found.location.id, radius_km, found.distance
                );
                return Ok(Some(found));
            }
        }
        debug!(
            "No tiered candidate near ({}, {}); falling back to closest-only",
            lat, lon
        );
    }

    let query = ProximityQuery {
        lat,
        lon,
        filter,
        proximity: Proximity::ClosestOnly,
    };
    let found = store.closest_location(&query)?;
    match &found {
        Some(m) => debug!(
            "Resolved ({}, {}) to closest location {} ({:.2} km away)",
            lat, lon, m.location.id, m.distance
        ),
        None => debug!("No eligible location for ({}, {})", lat, lon),
    }
    Ok(found)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Location};
    use crate::store::MemoryStore;

    fn location(id: &str, lat: f64, lon: f64, category: Category) -> Location {
        Location {
            id: id.to_string(),
            source: "LV".to_string(),
            name: id.to_string(),
            search_name: id.to_lowercase(),
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
    fn test_tiered_prefers_priority_over_proximity() {
        let mut store = MemoryStore::new();
        store
            .add_location(location("PARISH", 57.000, 24.000, Category::ParishCenter))
            .add_location(location("CITY", 57.040, 24.000, Category::MajorCity));

        // parish ~0.6 km, city ~3.9 km: both within their scaled radius
        let found = resolve(&mut store, &SearchConfig::default(), &all(), 57.005, 24.0)
            .unwrap()
            .unwrap();
        assert_eq!(found.location.id, "CITY");
    }

    #[test]
    fn test_later_radius_step_used_when_first_is_empty() {
        let mut store = MemoryStore::new();
        // ~16.7 km north: outside 10 km but inside 25 km for a capital
        store
            .add_location(location("CAP", 57.150, 24.000, Category::Capital))
            .add_location(location("FAR_VILLAGE", 56.700, 24.000, Category::Village));

        let search = SearchConfig {
            radius_steps_km: vec![10.0, 25.0],
            ..SearchConfig::default()
        };
        let found = resolve(&mut store, &search, &all(), 57.0, 24.0).unwrap().unwrap();
        assert_eq!(found.location.id, "CAP");
    }

    #[test]
    fn test_falls_back_to_closest_only_inside_box() {
        let mut store = MemoryStore::new();
        // ~5.6 km: outside a village's 2 km scaled radius
        store
            .add_location(location("V_NEAR", 57.050, 24.000, Category::Village))
            .add_location(location("V_FAR", 57.200, 24.000, Category::Village));

        let found = resolve(&mut store, &SearchConfig::default(), &all(), 57.0, 24.0)
            .unwrap()
            .unwrap();
        assert_eq!(found.location.id, "V_NEAR");
    }

    #[test]
    fn test_outside_box_ignores_tier() {
        let mut store = MemoryStore::new();
        store
            .add_location(location("CAP", 56.950, 24.100, Category::Capital))
            .add_location(location("BORDER", 55.690, 26.000, Category::Village));

        // Vilnius area, outside the domestic box
        let found = resolve(&mut store, &SearchConfig::default(), &all(), 54.69, 25.28)
            .unwrap()
            .unwrap();
        assert_eq!(found.location.id, "BORDER");
    }

    #[test]
    fn test_empty_store_is_not_found() {
        let mut store = MemoryStore::new();
        let found = resolve(&mut store, &SearchConfig::default(), &all(), 57.0, 24.0).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_empty_category_set_is_not_found() {
        let mut store = MemoryStore::new();
        store.add_location(location("CAP", 56.95, 24.1, Category::Capital));
        let none = LocationFilter::new(Vec::new());
        assert!(resolve(&mut store, &SearchConfig::default(), &none, 56.95, 24.1)
            .unwrap()
            .is_none());
    }
}
