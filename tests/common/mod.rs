//! Shared fixtures: a handful of real Latvian places, a forecast for Rīga
//! and Sigulda, warnings over Rīga and data files in a scratch directory.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use meteo_service::composer::ServiceContext;
use meteo_service::config::Config;
use meteo_service::degraded::MemorySentinels;
use meteo_service::model::{Category, ForecastParam, Location, Observation, Warning, WarningBound};
use meteo_service::normalize::normalize;
use meteo_service::store::MemoryStore;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 2024-05-01 12:00 in Riga.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

pub fn location(id: &str, name: &str, lat: f64, lon: f64, category: Category) -> Location {
    Location {
        id: id.to_string(),
        source: if category == Category::Foreign { "LT" } else { "LV" }.to_string(),
        name: name.to_string(),
        search_name: normalize(name),
        lat,
        lon,
        category,
        county: String::new(),
    }
}

pub fn riga() -> Location {
    location("P001", "Rīga", 56.9496, 24.1052, Category::Capital)
}

pub fn sigulda() -> Location {
    location("P004", "Sigulda", 57.1537, 24.8532, Category::DistrictCenter)
}

fn observation(location_id: &str, param_id: i32, time: &str, value: f64) -> Observation {
    Observation {
        location_id: location_id.to_string(),
        param_id,
        time: time.to_string(),
        value,
    }
}

fn warning(id: i64, type_lv: &str, intensity: (&str, &str), description_lv: &str) -> Warning {
    Warning {
        id,
        intensity_lv: intensity.0.to_string(),
        intensity_en: intensity.1.to_string(),
        regions_lv: "Rīga".to_string(),
        regions_en: "Riga".to_string(),
        type_lv: type_lv.to_string(),
        type_en: format!("{type_lv} (en)"),
        time_from: "202405011200".to_string(),
        time_to: "202405020600".to_string(),
        description_lv: description_lv.to_string(),
        description_en: format!("{description_lv} (en)"),
    }
}

pub const YELLOW: (&str, &str) = ("Dzeltenais", "Yellow");
pub const RED: (&str, &str) = ("Sarkanais", "Red");

fn riga_box(warning_id: i64) -> WarningBound {
    WarningBound {
        warning_id,
        polygon_id: 1,
        min_lat: 56.85,
        max_lat: 57.10,
        min_lon: 23.90,
        max_lon: 24.35,
    }
}

pub fn fixture_locations() -> Vec<Location> {
    vec![
        riga(),
        location("P002", "Jūrmala", 56.9680, 23.7704, Category::MajorCity),
        location("P003", "Valmiera", 57.5385, 25.4264, Category::MajorCity),
        sigulda(),
        location("P005", "Ādaži", 57.0750, 24.3230, Category::ParishCenter),
        location("P006", "Carnikava", 57.1290, 24.2840, Category::Village),
        location("P007", "Daugavpils", 55.8747, 26.5362, Category::MajorCity),
        location("LT001", "Biržai", 56.2017, 24.7560, Category::Foreign),
    ]
}

/// Store with locations only.
pub fn locations_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    for location in fixture_locations() {
        store.add_location(location);
    }
    store
}

/// Store with locations, parameters, forecasts, warnings and aurora data.
pub fn full_store() -> MemoryStore {
    let mut store = locations_store();

    for id in [1, 2, 3, 4, 5, 6, 7, 10, 11, 13, 14, 15, 16, 17, 18, 19, 20] {
        store.add_param(ForecastParam {
            id,
            title_lv: format!("Parametrs {id}"),
            title_en: format!("Parameter {id}"),
        });
    }

    for (hour, temperature) in [("1100", 13.0), ("1200", 14.0), ("1300", 15.5), ("1400", 16.0)] {
        let time = format!("20240501{hour}");
        store
            .add_observation(observation("P001", 1, &time, 2.0))
            .add_observation(observation("P001", 2, &time, temperature))
            .add_observation(observation("P001", 4, &time, 3.5));
    }
    for (time, tmax) in [("202405012300", 18.0), ("202405022300", 21.0)] {
        store
            .add_observation(observation("P001", 15, time, tmax))
            .add_observation(observation("P001", 16, time, tmax - 10.0));
    }

    store
        .add_observation(observation("P004", 2, "202405011200", 12.0))
        .add_observation(observation("P004", 15, "202405012300", 17.0));

    store
        .add_warning(warning(101, "Vējš", YELLOW, "Brāzmas līdz 20 m/s"))
        .add_warning(warning(102, "Vējš", RED, "Brāzmas līdz 20 m/s"))
        .add_warning(warning(103, "Lietus", YELLOW, "Stiprs lietus piekrastē"))
        .add_warning(warning(104, "Lietus", YELLOW, "Stiprs lietus iekšzemē"));
    for id in [101, 102, 103, 104] {
        store.add_bound(riga_box(id));
    }

    store.set_aurora(57, 24, 15.0);
    store
}

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

/// Scratch directory holding the files the service reads.
pub struct DataDir {
    pub path: PathBuf,
}

impl DataDir {
    /// Metadata, aurora times (issued an hour after `now()`) and the
    /// last-complete-download marker.
    pub fn new() -> Self {
        let n = NEXT_DIR.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!("meteo_it_{}_{}", std::process::id(), n));
        fs::create_dir_all(&path).unwrap();

        fs::write(
            path.join("metadata.json"),
            r#"{"success": true, "result": {"metadata_modified": "2024-05-01T08:15:42.000123"}}"#,
        )
        .unwrap();
        let issue = now() + Duration::hours(1);
        fs::write(
            path.join("aurora.json"),
            format!(r#"{{"Forecast Time": "{}"}}"#, issue.format("%Y-%m-%dT%H:%M:%SZ")),
        )
        .unwrap();
        fs::write(path.join("last_updated"), "202405010800\n").unwrap();

        Self { path }
    }

    pub fn write_aurora_issue(&self, issue: DateTime<Utc>) {
        fs::write(
            self.path.join("aurora.json"),
            format!(r#"{{"Forecast Time": "{}"}}"#, issue.format("%Y-%m-%dT%H:%M:%SZ")),
        )
        .unwrap();
    }

    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.paths.dataset_metadata = self.path.join("metadata.json");
        config.paths.aurora_times = self.path.join("aurora.json");
        config.paths.last_updated = self.path.join("last_updated");
        config.paths.run_emergency = self.path.join("run_emergency");
        config.paths.run_emergency_failed = self.path.join("run_emergency_failed");
        config.paths.missing_params = self.path.join("missing_params");
        config
    }

    pub fn context(&self) -> ServiceContext {
        self.context_with(self.config(), MemorySentinels::new())
    }

    pub fn context_with(&self, config: Config, sentinels: MemorySentinels) -> ServiceContext {
        ServiceContext::with_sentinels(config, Box::new(sentinels)).unwrap()
    }
}

impl Drop for DataDir {
    fn drop(&mut self) {
        fs::remove_dir_all(&self.path).ok();
    }
}
