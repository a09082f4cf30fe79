//! PostgreSQL-backed store.
//!
//! Distance, radius filtering and string matching run inside the database
//! against the `meteo` schema (see `sql/001_forecast_schema.sql`). Every
//! variable-length list is bound as an array parameter.

use log::warn;
use postgres::{Client, Row};

use super::{ForecastStore, Proximity, ProximityQuery};
use crate::config::NameDistance;
use crate::db::{self, DbConfigError};
use crate::error::StoreError;
use crate::geo::EARTH_RADIUS_KM;
use crate::model::{
    Category, ForecastParam, Location, LocationFilter, LocationMatch, Observation, ParamId,
    Warning,
};

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

// $1 lat, $2 lon, $3 category labels, $4 excluded ids, $5 earth radius
const CLOSEST_ONLY_SQL: &str = "
    SELECT id, source, name, search_name, lat, lon, category, county, distance_km
    FROM (
        SELECT *,
            2 * $5::float8 * ASIN(LEAST(1.0, SQRT(
                POWER(SIN(RADIANS(lat - $1::float8) / 2), 2)
                + COS(RADIANS($1::float8)) * COS(RADIANS(lat))
                * POWER(SIN(RADIANS(lon - $2::float8) / 2), 2)
            ))) AS distance_km
        FROM meteo.ranked_locations
        WHERE category = ANY($3::text[]) AND NOT (id = ANY($4::text[]))
    ) AS candidates
    ORDER BY distance_km ASC
    LIMIT 1";

// Same as CLOSEST_ONLY_SQL plus $6 radius in km.
const TIERED_SQL: &str = "
    SELECT id, source, name, search_name, lat, lon, category, county, distance_km
    FROM (
        SELECT *,
            2 * $5::float8 * ASIN(LEAST(1.0, SQRT(
                POWER(SIN(RADIANS(lat - $1::float8) / 2), 2)
                + COS(RADIANS($1::float8)) * COS(RADIANS(lat))
                * POWER(SIN(RADIANS(lon - $2::float8) / 2), 2)
            ))) AS distance_km
        FROM meteo.ranked_locations
        WHERE category = ANY($3::text[]) AND NOT (id = ANY($4::text[]))
    ) AS candidates
    WHERE distance_km <= $6::float8 / tier
    ORDER BY tier ASC, distance_km ASC
    LIMIT 1";

const NAME_LEVENSHTEIN_SQL: &str = "
    SELECT id, source, name, search_name, lat, lon, category, county,
        levenshtein(search_name, $1::text)::float8 AS distance
    FROM meteo.ranked_locations
    WHERE category = ANY($2::text[]) AND NOT (id = ANY($3::text[]))
    ORDER BY distance ASC, tier ASC
    LIMIT 1";

const NAME_TRIGRAM_SQL: &str = "
    SELECT id, source, name, search_name, lat, lon, category, county,
        (search_name <-> $1::text)::float8 AS distance
    FROM meteo.ranked_locations
    WHERE category = ANY($2::text[]) AND NOT (id = ANY($3::text[]))
    ORDER BY distance ASC, tier ASC
    LIMIT 1";

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct PgStore {
    client: Client,
    name_distance: NameDistance,
}

impl PgStore {
    pub fn new(client: Client, name_distance: NameDistance) -> Self {
        Self {
            client,
            name_distance,
        }
    }

    /// Connects through `DATABASE_URL` and verifies the schema and the
    /// string-distance extension before handing out a store.
    pub fn connect(name_distance: NameDistance) -> Result<Self, DbConfigError> {
        let mut client = db::connect_and_verify(&[db::SCHEMA])?;
        db::verify_extension(&mut client, name_distance.extension())?;
        Ok(Self::new(client, name_distance))
    }
}

/// Maps a location row (first eight columns) plus the distance column.
fn row_to_match(row: &Row) -> Option<LocationMatch> {
    let label: String = row.get(6);
    let Some(category) = Category::from_label(&label) else {
        warn!("Skipping location with unknown category '{}'", label);
        return None;
    };

    Some(LocationMatch {
        location: Location {
            id: row.get(0),
            source: row.get(1),
            name: row.get(2),
            search_name: row.get(3),
            lat: row.get(4),
            lon: row.get(5),
            category,
            county: row.get::<_, Option<String>>(7).unwrap_or_default(),
        },
        distance: row.get(8),
    })
}

impl ForecastStore for PgStore {
    fn closest_location(
        &mut self,
        query: &ProximityQuery<'_>,
    ) -> Result<Option<LocationMatch>, StoreError> {
        let labels = query.filter.category_labels();
        let excluded = &query.filter.exclude_ids;

        let rows = match query.proximity {
            Proximity::Tiered { radius_km } => self.client.query(
                TIERED_SQL,
                &[
                    &query.lat,
                    &query.lon,
                    &labels,
                    excluded,
                    &EARTH_RADIUS_KM,
                    &radius_km,
                ],
            )?,
            Proximity::ClosestOnly => self.client.query(
                CLOSEST_ONLY_SQL,
                &[&query.lat, &query.lon, &labels, excluded, &EARTH_RADIUS_KM],
            )?,
        };

        Ok(rows.iter().find_map(row_to_match))
    }

    fn best_name_match(
        &mut self,
        search_name: &str,
        filter: &LocationFilter,
    ) -> Result<Option<LocationMatch>, StoreError> {
        let sql = match self.name_distance {
            NameDistance::Levenshtein => NAME_LEVENSHTEIN_SQL,
            NameDistance::Trigram => NAME_TRIGRAM_SQL,
        };
        let labels = filter.category_labels();

        let rows = self
            .client
            .query(sql, &[&search_name, &labels, &filter.exclude_ids])?;

        Ok(rows.iter().find_map(row_to_match))
    }

    fn locations_missing_parameters(&mut self) -> Result<Vec<String>, StoreError> {
        let rows = self
            .client
            .query("SELECT DISTINCT location_id FROM meteo.missing_params", &[])?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    fn forecast_params(&mut self, ids: &[ParamId]) -> Result<Vec<ForecastParam>, StoreError> {
        let rows = self.client.query(
            "SELECT id, title_lv, title_en
             FROM meteo.forecast_params
             WHERE id = ANY($1::int4[])",
            &[&ids],
        )?;

        Ok(rows
            .iter()
            .map(|row| ForecastParam {
                id: row.get(0),
                title_lv: row.get(1),
                title_en: row.get(2),
            })
            .collect())
    }

    fn observations(
        &mut self,
        location_id: &str,
        from: &str,
        param_ids: &[ParamId],
    ) -> Result<Vec<Observation>, StoreError> {
        let rows = self.client.query(
            "SELECT location_id, param_id, obs_time, value
             FROM meteo.forecast_observations
             WHERE location_id = $1 AND obs_time >= $2 AND param_id = ANY($3::int4[])
             ORDER BY obs_time, param_id",
            &[&location_id, &from, &param_ids],
        )?;

        Ok(rows
            .iter()
            .map(|row| Observation {
                location_id: row.get(0),
                param_id: row.get(1),
                time: row.get(2),
                value: row.get(3),
            })
            .collect())
    }

    fn warning_ids_at(&mut self, lat: f64, lon: f64) -> Result<Vec<i64>, StoreError> {
        // Inverted boxes fail both comparisons and never match.
        let rows = self.client.query(
            "SELECT DISTINCT warning_id
             FROM meteo.warning_bounds
             WHERE $1::float8 >= min_lat AND $1::float8 <= max_lat
               AND $2::float8 >= min_lon AND $2::float8 <= max_lon
             ORDER BY warning_id",
            &[&lat, &lon],
        )?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    fn warnings_by_ids(&mut self, ids: &[i64]) -> Result<Vec<Warning>, StoreError> {
        let rows = self.client.query(
            "SELECT DISTINCT id, intensity_lv, intensity_en, regions_lv, regions_en,
                    type_lv, type_en, time_from, time_to, description_lv, description_en
             FROM meteo.warnings
             WHERE id = ANY($1::int8[])",
            &[&ids],
        )?;

        Ok(rows
            .iter()
            .map(|row| Warning {
                id: row.get(0),
                intensity_lv: row.get(1),
                intensity_en: row.get(2),
                regions_lv: row.get(3),
                regions_en: row.get(4),
                type_lv: row.get(5),
                type_en: row.get(6),
                time_from: row.get(7),
                time_to: row.get(8),
                description_lv: row.get(9),
                description_en: row.get(10),
            })
            .collect())
    }

    fn aurora_probability(&mut self, lat: i32, lon: i32) -> Result<Option<f64>, StoreError> {
        let rows = self.client.query(
            "SELECT probability FROM meteo.aurora_grid WHERE lat = $1 AND lon = $2 LIMIT 1",
            &[&lat, &lon],
        )?;
        Ok(rows.first().map(|row| row.get(0)))
    }
}
