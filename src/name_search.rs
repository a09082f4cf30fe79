//! Free-text location lookup.
//!
//! The raw input is folded through `normalize` and compared against each
//! stored search name. The best match is always returned, however poor;
//! its distance rides along in `LocationMatch::distance` so callers can
//! judge it.

use log::debug;

use crate::degraded::eligible_categories;
use crate::error::StoreError;
use crate::model::{LocationFilter, LocationMatch};
use crate::normalize::normalize;
use crate::store::ForecastStore;

/// Resolves a user-entered place name.
///
/// Name search is not gated by emergency mode: every domestic category is
/// eligible, plus the foreign tier when `extended` is set. An input that
/// normalizes to nothing is still ranked; only an empty candidate set
/// resolves to nothing.
pub fn resolve_by_name(
    store: &mut dyn ForecastStore,
    raw_name: &str,
    extended: bool,
) -> Result<Option<LocationMatch>, StoreError> {
    let search_name = normalize(raw_name);

    let filter = LocationFilter::new(eligible_categories(extended));

    let found = store.best_name_match(&search_name, &filter)?;
    if let Some(m) = &found {
        debug!(
            "Name '{}' ({}) matched {} at distance {}",
            raw_name, search_name, m.location.name, m.distance
        );
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Location};
    use crate::store::MemoryStore;

    fn location(id: &str, name: &str, category: Category) -> Location {
        Location {
            id: id.to_string(),
            source: if category == Category::Foreign { "LT" } else { "LV" }.to_string(),
            name: name.to_string(),
            search_name: normalize(name),
            lat: 57.0,
            lon: 24.0,
            category,
            county: String::new(),
        }
    }

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .add_location(location("P001", "Rīga", Category::Capital))
            .add_location(location("P002", "Valmiera", Category::MajorCity))
            .add_location(location("P003", "Cēsis", Category::MajorCity))
            .add_location(location("LT01", "Biržai", Category::Foreign));
        store
    }

    #[test]
    fn test_diacritics_fold_to_same_match() {
        let mut store = store();
        let plain = resolve_by_name(&mut store, "riga", false).unwrap().unwrap();
        let accented = resolve_by_name(&mut store, "Rīga", false).unwrap().unwrap();
        assert_eq!(plain.location.id, "P001");
        assert_eq!(plain.location, accented.location);
        assert_eq!(plain.distance, 0.0);
    }

    #[test]
    fn test_misspelling_returns_best_candidate_with_distance() {
        let mut store = store();
        let found = resolve_by_name(&mut store, "vamier", false).unwrap().unwrap();
        assert_eq!(found.location.name, "Valmiera");
        assert_eq!(found.distance, 2.0);
    }

    #[test]
    fn test_foreign_only_with_extended_search() {
        let mut store = store();
        let domestic = resolve_by_name(&mut store, "birzai", false).unwrap().unwrap();
        assert_ne!(domestic.location.id, "LT01");

        let extended = resolve_by_name(&mut store, "birzai", true).unwrap().unwrap();
        assert_eq!(extended.location.id, "LT01");
    }

    #[test]
    fn test_input_without_letters_still_ranks_candidates() {
        let mut store = store();
        // "" is 4 edits from "riga", 5 from "cesis", 8 from "valmiera"
        for raw in ["123", "  ?! ", ""] {
            let found = resolve_by_name(&mut store, raw, false).unwrap().unwrap();
            assert_eq!(found.location.id, "P001", "input {raw:?}");
            assert_eq!(found.distance, 4.0);
        }
    }

    #[test]
    fn test_empty_store_is_not_found() {
        let mut store = MemoryStore::new();
        assert!(resolve_by_name(&mut store, "riga", true).unwrap().is_none());
    }
}
