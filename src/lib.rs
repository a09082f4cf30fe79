/// meteo_service: location-resolved weather forecasts and hazard warnings.
///
/// # Module structure
///
/// ```text
/// meteo_service
/// ├── model       - shared data types (Location, Category, Observation, Warning, …)
/// ├── error       - StoreError, ConfigError, ServiceError
/// ├── config      - service configuration loader (meteo.toml)
/// ├── db          - PostgreSQL connection and schema validation
/// ├── normalize   - place-name folding and edit distance
/// ├── geo         - haversine distance
/// ├── store
/// │   ├── pg      - PostgreSQL-backed ForecastStore
/// │   └── memory  - in-process ForecastStore for fixtures and tests
/// ├── degraded    - emergency / missing-parameter sentinels and override policy
/// ├── resolver    - nearest-location search (tiered and closest-only regimes)
/// ├── name_search - free-text location lookup
/// ├── forecast    - observation pivoting and vals shaping
/// ├── warnings    - bounding-box lookup and severity consolidation
/// ├── aurora      - aurora probability grid lookup
/// ├── freshness   - dataset last-updated / last-downloaded stamps
/// ├── composer    - per-request response assembly
/// └── endpoint    - tiny_http JSON API
/// ```

pub mod aurora;
pub mod composer;
pub mod config;
pub mod db;
pub mod degraded;
pub mod endpoint;
pub mod error;
pub mod forecast;
pub mod freshness;
pub mod geo;
pub mod model;
pub mod name_search;
pub mod normalize;
pub mod resolver;
pub mod store;
pub mod warnings;
