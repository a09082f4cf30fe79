//! Forecast Lookup
//!
//! Composes one forecast response against the production database and
//! prints it, together with how the location was resolved. Handy for
//! checking what a user at a given point (or typing a given name) sees.
//!
//! Usage:
//!   cargo run --bin forecast_lookup -- --lat 56.9730 --lon 24.1327
//!   cargo run --bin forecast_lookup -- --name vamier --simple-warnings
//!
//! Flags:
//!   --config PATH       config file (default: $METEO_CONFIG or meteo.toml)
//!   --simple-warnings   grouped warning view
//!   --coords            echo resolved coordinates
//!   --last-no-skip      include last complete download stamp
//!   --extended          include foreign locations
//!
//! Environment:
//!   DATABASE_URL - PostgreSQL connection string (from .env)

use chrono::Utc;
use meteo_service::composer::{self, ForecastRequest, RequestFlags, ServiceContext};
use meteo_service::config::Config;
use meteo_service::store::PgStore;
use std::env;
use std::path::PathBuf;

fn usage(program: &str) -> ! {
    eprintln!(
        "Usage: {} (--lat LAT --lon LON | --name NAME) [--config PATH] \
         [--simple-warnings] [--coords] [--last-no-skip] [--extended]",
        program
    );
    std::process::exit(1);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let args: Vec<String> = env::args().collect();
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;
    let mut name: Option<String> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut flags = RequestFlags::default();

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--lat" => {
                lat = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "--lon" => {
                lon = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "--name" => {
                name = value.cloned();
                i += 1;
            }
            "--config" => {
                config_path = value.map(PathBuf::from);
                i += 1;
            }
            "--simple-warnings" => flags.use_simple_warnings = true,
            "--coords" => flags.add_city_coords = true,
            "--last-no-skip" => flags.add_last_no_skip = true,
            "--extended" => flags.extended_search = true,
            _ => usage(&args[0]),
        }
        i += 1;
    }

    let request = match (lat, lon, name) {
        (Some(lat), Some(lon), None) => ForecastRequest::at(lat, lon),
        (None, None, Some(name)) => ForecastRequest::named(&name),
        _ => usage(&args[0]),
    }
    .with_flags(flags);

    let config = Config::load(&config_path.unwrap_or_else(Config::default_path))?;
    let name_distance = config.search.name_distance;
    let ctx = ServiceContext::new(config)?;

    let mut store = PgStore::connect(name_distance).unwrap_or_else(|e| {
        eprintln!("\n{}\n", e);
        std::process::exit(1);
    });

    let response = composer::compose(&mut store, &ctx, &request, Utc::now())?;

    match (&response.resolved, &response.hourly_source) {
        (Some(resolved), Some(hourly)) => {
            eprintln!(
                "Resolved: {} [{}] ({:?}, {:.4}, {:.4})",
                resolved.name, resolved.id, resolved.category, resolved.lat, resolved.lon
            );
            if hourly.id != resolved.id {
                eprintln!("Hourly override: {} [{}] ({:?})", hourly.name, hourly.id, hourly.category);
            }
        }
        _ => eprintln!("No location resolved"),
    }
    eprintln!(
        "{} hourly, {} daily, {} warning entries\n",
        response.hourly_forecast.len(),
        response.daily_forecast.len(),
        response.warnings.len()
    );

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
