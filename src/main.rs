//! Forecast Service - HTTP daemon
//!
//! Serves forecasts, hazard warnings and aurora probabilities for the
//! location nearest to a coordinate or a place name. Data is loaded into
//! PostgreSQL by a separate ingestion job; this process only reads it.
//!
//! Usage:
//!   cargo run --release                          # meteo.toml, port from config
//!   cargo run --release -- --port 8080           # override the port
//!   cargo run --release -- --config /etc/meteo.toml
//!
//! Environment:
//!   DATABASE_URL - PostgreSQL connection string
//!   METEO_CONFIG - config path when --config is not given
//!   RUST_LOG     - log filter (default: info)

use log::{error, info};
use meteo_service::composer::ServiceContext;
use meteo_service::config::Config;
use meteo_service::{db, endpoint};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

fn main() {
    let filters = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();

    let args: Vec<String> = env::args().collect();
    let mut port: Option<u16> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                match args.get(i + 1).and_then(|p| p.parse().ok()) {
                    Some(p) => port = Some(p),
                    None => {
                        eprintln!("Error: --port requires a port number");
                        std::process::exit(1);
                    }
                }
                i += 2;
            }
            "--config" => {
                match args.get(i + 1) {
                    Some(path) => config_path = Some(PathBuf::from(path)),
                    None => {
                        eprintln!("Error: --config requires a file path");
                        std::process::exit(1);
                    }
                }
                i += 2;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!("Usage: {} [--port PORT] [--config PATH]", args[0]);
                std::process::exit(1);
            }
        }
    }

    let config_path = config_path.unwrap_or_else(Config::default_path);
    let mut config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    if let Some(port) = port {
        config.server.port = port;
    }
    info!("Loaded configuration from {}", config_path.display());

    // Fail fast on database setup problems before spawning workers.
    let name_distance = config.search.name_distance;
    match db::connect_and_verify(&[db::SCHEMA]) {
        Ok(mut client) => {
            if let Err(e) = db::verify_extension(&mut client, name_distance.extension()) {
                error!("Database validation failed:\n{}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("Database validation failed:\n{}", e);
            std::process::exit(1);
        }
    }
    info!("Database schema '{}' verified", db::SCHEMA);

    let ctx = match ServiceContext::new(config) {
        Ok(ctx) => Arc::new(ctx),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = endpoint::start_endpoint_server(ctx) {
        error!("Endpoint server error: {}", e);
        std::process::exit(1);
    }
}
