//! Hazard warning lookup and consolidation.
//!
//! The upstream feed sometimes republishes one hazard with identical text
//! at several intensities. Consolidation keeps, per (type, description),
//! only the copies at the group's highest severity. Copies without a
//! recognised severity never survive. The survivors are then rendered in
//! one of two response views.

use log::debug;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::error::StoreError;
use crate::model::{Severity, Warning};
use crate::store::ForecastStore;

/// Response view for warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningMode {
    /// One entry per surviving warning.
    Legacy,
    /// Survivors merged by (type, intensity).
    Grouped,
}

impl WarningMode {
    pub fn from_simple_flag(use_simple_warnings: bool) -> Self {
        if use_simple_warnings {
            WarningMode::Grouped
        } else {
            WarningMode::Legacy
        }
    }
}

/// Legacy view. Paired fields are `[lv, en]`; `time` is `[from, to]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyWarning {
    pub id: i64,
    pub intensity: [String; 2],
    pub regions: [String; 2],
    #[serde(rename = "type")]
    pub kind: [String; 2],
    pub time: [String; 2],
    pub description: [String; 2],
}

/// Grouped view. Description lists hold one entry per merged id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedWarning {
    pub ids: Vec<i64>,
    #[serde(rename = "type")]
    pub kind: [String; 2],
    pub intensity: [String; 2],
    pub description_lv: Vec<String>,
    pub description_en: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WarningsPayload {
    Legacy(Vec<LegacyWarning>),
    Grouped(Vec<GroupedWarning>),
}

impl WarningsPayload {
    pub fn empty(mode: WarningMode) -> Self {
        match mode {
            WarningMode::Legacy => WarningsPayload::Legacy(Vec::new()),
            WarningMode::Grouped => WarningsPayload::Grouped(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            WarningsPayload::Legacy(w) => w.len(),
            WarningsPayload::Grouped(w) => w.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Consolidation
// ---------------------------------------------------------------------------

/// Keeps the highest-severity copies per (type, description).
///
/// Output is ordered by severity descending, then id ascending, with one
/// entry per id.
pub fn consolidate(warnings: Vec<Warning>) -> Vec<Warning> {
    let mut group_max: HashMap<(&str, &str), Severity> = HashMap::new();
    for w in &warnings {
        if let Some(severity) = w.severity() {
            group_max
                .entry((w.type_lv.as_str(), w.description_lv.as_str()))
                .and_modify(|max| *max = (*max).max(severity))
                .or_insert(severity);
        }
    }

    let winners: Vec<bool> = warnings
        .iter()
        .map(|w| {
            let max = group_max.get(&(w.type_lv.as_str(), w.description_lv.as_str()));
            w.severity().is_some() && w.severity() == max.copied()
        })
        .collect();

    let mut survivors: Vec<Warning> = warnings
        .into_iter()
        .zip(winners)
        .filter_map(|(w, keep)| keep.then_some(w))
        .collect();

    survivors.sort_by(|a, b| b.severity().cmp(&a.severity()).then(a.id.cmp(&b.id)));

    let mut seen = HashSet::new();
    survivors.retain(|w| seen.insert(w.id));
    survivors
}

fn legacy_view(warnings: Vec<Warning>) -> Vec<LegacyWarning> {
    warnings
        .into_iter()
        .map(|w| LegacyWarning {
            id: w.id,
            intensity: [w.intensity_lv, w.intensity_en],
            regions: [w.regions_lv, w.regions_en],
            kind: [w.type_lv, w.type_en],
            time: [w.time_from, w.time_to],
            description: [w.description_lv, w.description_en],
        })
        .collect()
}

fn grouped_view(warnings: Vec<Warning>) -> Vec<GroupedWarning> {
    let mut groups: Vec<GroupedWarning> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for w in warnings {
        let key = (w.type_lv.clone(), w.intensity_lv.clone());
        match index.get(&key) {
            Some(&i) => {
                let group = &mut groups[i];
                group.ids.push(w.id);
                group.description_lv.push(w.description_lv);
                group.description_en.push(w.description_en);
            }
            None => {
                index.insert(key, groups.len());
                groups.push(GroupedWarning {
                    ids: vec![w.id],
                    kind: [w.type_lv, w.type_en],
                    intensity: [w.intensity_lv, w.intensity_en],
                    description_lv: vec![w.description_lv],
                    description_en: vec![w.description_en],
                });
            }
        }
    }
    groups
}

/// Renders consolidated warnings in the requested view.
pub fn render(warnings: Vec<Warning>, mode: WarningMode) -> WarningsPayload {
    match mode {
        WarningMode::Legacy => WarningsPayload::Legacy(legacy_view(warnings)),
        WarningMode::Grouped => WarningsPayload::Grouped(grouped_view(warnings)),
    }
}

/// Warnings whose bounding box contains the point, consolidated and
/// rendered.
pub fn get_warnings(
    store: &mut dyn ForecastStore,
    lat: f64,
    lon: f64,
    mode: WarningMode,
) -> Result<WarningsPayload, StoreError> {
    let ids = store.warning_ids_at(lat, lon)?;
    if ids.is_empty() {
        return Ok(WarningsPayload::empty(mode));
    }

    let candidates = store.warnings_by_ids(&ids)?;
    let survivors = consolidate(candidates);
    debug!(
        "{} warning(s) cover ({}, {}); {} after consolidation",
        ids.len(),
        lat,
        lon,
        survivors.len()
    );
    Ok(render(survivors, mode))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WarningBound;
    use crate::store::MemoryStore;

    fn warning(id: i64, kind: &str, intensity_en: &str, description: &str) -> Warning {
        let intensity_lv = match intensity_en {
            "Yellow" => "Dzeltenais",
            "Orange" => "Oranžais",
            "Red" => "Sarkanais",
            _ => "",
        };
        Warning {
            id,
            intensity_lv: intensity_lv.to_string(),
            intensity_en: intensity_en.to_string(),
            regions_lv: "Rīga".to_string(),
            regions_en: "Riga".to_string(),
            type_lv: kind.to_string(),
            type_en: format!("{kind} (en)"),
            time_from: "202405011200".to_string(),
            time_to: "202405012100".to_string(),
            description_lv: description.to_string(),
            description_en: format!("{description} (en)"),
        }
    }

    fn ids(warnings: &[Warning]) -> Vec<i64> {
        warnings.iter().map(|w| w.id).collect()
    }

    #[test]
    fn test_duplicate_text_keeps_highest_severity() {
        let survivors = consolidate(vec![
            warning(1, "Vējš", "Yellow", "Brāzmas līdz 20 m/s"),
            warning(2, "Vējš", "Red", "Brāzmas līdz 20 m/s"),
        ]);
        assert_eq!(ids(&survivors), vec![2]);
        assert_eq!(survivors[0].intensity_en, "Red");
    }

    #[test]
    fn test_distinct_texts_are_kept_and_ordered() {
        let survivors = consolidate(vec![
            warning(5, "Lietus", "Yellow", "Stiprs lietus"),
            warning(3, "Vējš", "Orange", "Brāzmas"),
            warning(4, "Sniegs", "Yellow", "Sniegputenis"),
        ]);
        assert_eq!(ids(&survivors), vec![3, 4, 5]);
    }

    #[test]
    fn test_unranked_copies_never_win() {
        let survivors = consolidate(vec![
            warning(1, "Vējš", "", "Brāzmas"),
            warning(2, "Vējš", "Yellow", "Brāzmas"),
            warning(3, "Migla", "Unknown", "Migla"),
        ]);
        assert_eq!(ids(&survivors), vec![2]);
    }

    #[test]
    fn test_equal_severity_copies_all_survive() {
        let survivors = consolidate(vec![
            warning(8, "Vējš", "Orange", "Brāzmas"),
            warning(7, "Vējš", "Orange", "Brāzmas"),
        ]);
        assert_eq!(ids(&survivors), vec![7, 8]);
    }

    #[test]
    fn test_repeated_rows_for_one_id_collapse() {
        let survivors = consolidate(vec![
            warning(1, "Vējš", "Orange", "Brāzmas"),
            warning(1, "Vējš", "Orange", "Brāzmas"),
        ]);
        assert_eq!(ids(&survivors), vec![1]);
    }

    #[test]
    fn test_grouped_view_merges_same_type_and_intensity() {
        let payload = render(
            consolidate(vec![
                warning(1, "Vējš", "Yellow", "Brāzmas piekrastē"),
                warning(2, "Vējš", "Yellow", "Brāzmas iekšzemē"),
            ]),
            WarningMode::Grouped,
        );
        let WarningsPayload::Grouped(groups) = payload else {
            panic!("expected grouped view");
        };
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].ids, vec![1, 2]);
        assert_eq!(groups[0].description_lv.len(), 2);
        assert_eq!(groups[0].intensity, ["Dzeltenais".to_string(), "Yellow".to_string()]);
    }

    #[test]
    fn test_grouped_view_puts_most_severe_group_first() {
        let payload = render(
            consolidate(vec![
                warning(1, "Lietus", "Yellow", "Stiprs lietus"),
                warning(2, "Lietus", "Yellow", "Lietusgāzes"),
                warning(3, "Vējš", "Orange", "Brāzmas"),
                warning(7, "Sniegs", "Red", "Sniegputenis"),
            ]),
            WarningMode::Grouped,
        );
        let WarningsPayload::Grouped(groups) = payload else {
            panic!("expected grouped view");
        };
        let order: Vec<&str> = groups.iter().map(|g| g.intensity[1].as_str()).collect();
        assert_eq!(order, vec!["Red", "Orange", "Yellow"]);
        assert_eq!(groups[0].ids, vec![7]);
        assert_eq!(groups[2].ids, vec![1, 2]);
    }

    #[test]
    fn test_legacy_json_shape() {
        let payload = render(vec![warning(9, "Vējš", "Red", "Vētra")], WarningMode::Legacy);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json[0]["id"], 9);
        assert_eq!(json[0]["type"], serde_json::json!(["Vējš", "Vējš (en)"]));
        assert_eq!(json[0]["time"], serde_json::json!(["202405011200", "202405012100"]));
        assert_eq!(json[0]["intensity"][1], "Red");
    }

    #[test]
    fn test_get_warnings_without_covering_box_is_empty() {
        let mut store = MemoryStore::new();
        store
            .add_warning(warning(1, "Vējš", "Red", "Vētra"))
            .add_bound(WarningBound {
                warning_id: 1,
                polygon_id: 1,
                min_lat: 57.5,
                max_lat: 58.0,
                min_lon: 21.0,
                max_lon: 22.0,
            });

        let payload = get_warnings(&mut store, 56.95, 24.1, WarningMode::Legacy).unwrap();
        assert!(payload.is_empty());

        let payload = get_warnings(&mut store, 57.6, 21.5, WarningMode::Grouped).unwrap();
        assert_eq!(payload.len(), 1);
    }

    #[test]
    fn test_get_warnings_ignores_inverted_boxes() {
        let mut store = MemoryStore::new();
        store
            .add_warning(warning(1, "Vējš", "Red", "Vētra"))
            .add_bound(WarningBound {
                warning_id: 1,
                polygon_id: 1,
                min_lat: 58.0,
                max_lat: 56.0,
                min_lon: 24.0,
                max_lon: 25.0,
            });
        let payload = get_warnings(&mut store, 57.0, 24.5, WarningMode::Legacy).unwrap();
        assert!(payload.is_empty());
    }
}
