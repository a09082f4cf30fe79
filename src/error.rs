//! Error types shared across the service.
//!
//! Only `StoreError` is a hard failure for a request. Everything else a
//! request can run into (no nearby location, malformed bounding boxes,
//! missing metadata files) degrades inside the component that sees it.

use thiserror::Error;

/// Failures talking to the relational store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database query failed: {0}")]
    Query(#[from] postgres::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Failures loading or validating `meteo.toml`.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level error for a forecast request.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The request itself was malformed (bad coordinates, missing name).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<postgres::Error> for ServiceError {
    fn from(e: postgres::Error) -> Self {
        ServiceError::Store(StoreError::Query(e))
    }
}
