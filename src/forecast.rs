//! Forecast pivoting.
//!
//! Observations come out of the store one (parameter, timestamp) fact per
//! row. `get_forecast` folds them into one record per timestamp with a
//! slot per requested parameter, in the configured parameter order.
//! `shape` then turns records into response entries according to the
//! configured layout and missing-value policy.

use chrono::{Duration, NaiveDateTime};
use log::warn;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::{MissingValues, ParamSpec, ResponseConfig, ValsLayout};
use crate::error::StoreError;
use crate::model::{Cadence, Location, ParamId};
use crate::store::ForecastStore;

/// Timestamp layout used by the store and in responses.
pub const TIME_FORMAT: &str = "%Y%m%d%H%M";

/// A configured parameter slot confirmed to exist in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParam {
    pub id: ParamId,
    /// Key used by the named layout.
    pub name: String,
}

/// Looks the configured slots up in the store, keeping config order.
///
/// Ids the store does not know are dropped with a warning. A slot with an
/// empty name takes the parameter's English title.
pub fn resolve_params(
    store: &mut dyn ForecastStore,
    specs: &[ParamSpec],
) -> Result<Vec<ResolvedParam>, StoreError> {
    let ids: Vec<ParamId> = specs.iter().map(|s| s.id).collect();
    let known = store.forecast_params(&ids)?;

    let mut resolved = Vec::with_capacity(specs.len());
    for spec in specs {
        match known.iter().find(|p| p.id == spec.id) {
            Some(param) => resolved.push(ResolvedParam {
                id: spec.id,
                name: if spec.name.is_empty() {
                    param.title_en.clone()
                } else {
                    spec.name.clone()
                },
            }),
            None => warn!(
                "Forecast parameter {} ({}) is not in the store; dropping it",
                spec.id, spec.name
            ),
        }
    }
    Ok(resolved)
}

/// One timestamp of a pivoted forecast. `values[i]` belongs to the i-th
/// requested parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRecord {
    pub time: String,
    pub values: Vec<Option<f64>>,
}

/// Pivots a location's observations at or after `from` into per-timestamp
/// records, ascending by time.
///
/// Daily timestamps ending in `rollback_suffix` are moved one hour forward
/// so they land on the following day's bucket. When a shifted row meets a
/// native row for the same parameter and bucket, the larger value is kept.
/// An unresolved location yields an empty forecast.
pub fn get_forecast(
    store: &mut dyn ForecastStore,
    location: Option<&Location>,
    from: &str,
    params: &[ResolvedParam],
    cadence: Cadence,
    rollback_suffix: &str,
) -> Result<Vec<ForecastRecord>, StoreError> {
    let Some(location) = location else {
        return Ok(Vec::new());
    };
    if params.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<ParamId> = params.iter().map(|p| p.id).collect();
    let observations = store.observations(&location.id, from, &ids)?;

    let mut pivot: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
    for obs in observations {
        let Some(slot) = ids.iter().position(|id| *id == obs.param_id) else {
            continue;
        };
        let time = match cadence {
            Cadence::Daily if !rollback_suffix.is_empty() && obs.time.ends_with(rollback_suffix) => {
                shift_one_hour(&obs.time)
            }
            _ => obs.time,
        };
        let values = pivot.entry(time).or_insert_with(|| vec![None; ids.len()]);
        values[slot] = Some(values[slot].map_or(obs.value, |v| v.max(obs.value)));
    }

    Ok(pivot
        .into_iter()
        .map(|(time, values)| ForecastRecord { time, values })
        .collect())
}

fn shift_one_hour(time: &str) -> String {
    match NaiveDateTime::parse_from_str(time, TIME_FORMAT) {
        Ok(t) => (t + Duration::hours(1)).format(TIME_FORMAT).to_string(),
        Err(e) => {
            warn!("Unparsable forecast timestamp '{}': {}", time, e);
            time.to_string()
        }
    }
}

// ---------------------------------------------------------------------------
// Response shaping
// ---------------------------------------------------------------------------

/// Values of one forecast entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Vals {
    List(Vec<Option<f64>>),
    Named(BTreeMap<String, f64>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastEntry {
    pub time: String,
    pub vals: Vals,
}

pub fn shape(
    records: Vec<ForecastRecord>,
    params: &[ResolvedParam],
    response: &ResponseConfig,
) -> Vec<ForecastEntry> {
    let fill = |v: Option<f64>| match response.missing_values {
        MissingValues::Omit => v,
        MissingValues::Sentinel => Some(v.unwrap_or(response.missing_sentinel)),
    };

    records
        .into_iter()
        .map(|record| {
            let vals = match response.vals_layout {
                ValsLayout::List => Vals::List(record.values.into_iter().map(fill).collect()),
                ValsLayout::Named => Vals::Named(
                    params
                        .iter()
                        .zip(record.values)
                        .filter_map(|(param, v)| fill(v).map(|v| (param.name.clone(), v)))
                        .collect(),
                ),
            };
            ForecastEntry {
                time: record.time,
                vals,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
