/// HTTP endpoint for forecast lookups
///
/// Thin JSON surface over the composer. Every worker owns its own store
/// connection and pulls requests from the shared server socket.
///
/// Endpoints:
/// - GET|HEAD /api/v1/forecast/cities?lat=..&lon=.. - Forecast for the nearest location
/// - GET|HEAD /api/v1/forecast/cities/name?city_name=.. - Forecast for a place name
/// - GET|HEAD /api/v1/meta - Emergency and aurora status
/// - GET /api/v1/version - Service version
/// - GET /health - Service health check

use crate::composer::{self, ForecastRequest, RequestFlags, ServiceContext};
use crate::error::ServiceError;
use crate::store::{ForecastStore, PgStore};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use threadpool::ThreadPool;

pub const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const ENDPOINTS: [&str; 5] = [
    "/api/v1/forecast/cities",
    "/api/v1/forecast/cities/name",
    "/api/v1/meta",
    "/api/v1/version",
    "/health",
];

type JsonResponse = tiny_http::Response<std::io::Cursor<Vec<u8>>>;

// ---------------------------------------------------------------------------
// Query parsing
// ---------------------------------------------------------------------------

/// Splits a request URL into its path and decoded query parameters.
pub fn parse_url(url: &str) -> (&str, HashMap<String, String>) {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    let params = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect();
    (path, params)
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Parses a boolean query flag. Absent means false.
pub fn parse_flag(params: &HashMap<String, String>, name: &str) -> Result<bool, ServiceError> {
    let Some(raw) = params.get(name) else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ServiceError::InvalidRequest(format!(
            "'{}' is not a valid boolean for {}",
            raw, name
        ))),
    }
}

fn parse_coordinate(params: &HashMap<String, String>, name: &str) -> Result<f64, ServiceError> {
    let raw = params.get(name).ok_or_else(|| {
        ServiceError::InvalidRequest(format!("missing required parameter '{}'", name))
    })?;
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ServiceError::InvalidRequest(format!(
            "'{}' is not a valid number for {}",
            raw, name
        ))),
    }
}

fn parse_flags(params: &HashMap<String, String>) -> Result<RequestFlags, ServiceError> {
    Ok(RequestFlags {
        add_last_no_skip: parse_flag(params, "add_last_no_skip")?,
        use_simple_warnings: parse_flag(params, "use_simple_warnings")?,
        add_city_coords: parse_flag(params, "add_city_coords")?,
        extended_search: parse_flag(params, "extended_search")?,
    })
}

/// Builds a forecast request from a query string, or explains what is wrong.
pub fn parse_forecast_request(
    path: &str,
    params: &HashMap<String, String>,
) -> Result<ForecastRequest, ServiceError> {
    let flags = parse_flags(params)?;
    let request = if path == "/api/v1/forecast/cities/name" {
        // A blank name is still a lookup; only an absent one is rejected.
        let name = params
            .get("city_name")
            .map(|n| n.trim())
            .ok_or_else(|| {
                ServiceError::InvalidRequest("missing required parameter 'city_name'".to_string())
            })?;
        ForecastRequest::named(name)
    } else {
        let lat = parse_coordinate(params, "lat")?;
        let lon = parse_coordinate(params, "lon")?;
        ForecastRequest::at(lat, lon)
    };
    Ok(request.with_flags(flags))
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Routes one request to a status code and JSON body.
pub fn route(
    store: &mut dyn ForecastStore,
    ctx: &ServiceContext,
    method: &tiny_http::Method,
    url: &str,
    now: DateTime<Utc>,
) -> (u16, serde_json::Value) {
    let (path, params) = parse_url(url);
    let readable = matches!(method, tiny_http::Method::Get | tiny_http::Method::Head);
    if !readable {
        return (
            405,
            serde_json::json!({ "error": format!("Method {} not allowed", method) }),
        );
    }

    match path {
        "/health" => (
            200,
            serde_json::json!({
                "status": "ok",
                "service": SERVICE_NAME,
                "version": VERSION
            }),
        ),
        "/api/v1/version" => (200, serde_json::json!({ "version": VERSION })),
        "/api/v1/meta" => to_json(&composer::meta(ctx, now)),
        "/api/v1/forecast/cities" | "/api/v1/forecast/cities/name" => {
            let request = match parse_forecast_request(path, &params) {
                Ok(request) => request,
                Err(e) => return (422, serde_json::json!({ "error": e.to_string() })),
            };
            match composer::compose(store, ctx, &request, now) {
                Ok(forecast) => to_json(&forecast),
                Err(e) => {
                    error!("Forecast request {} failed: {}", url, e);
                    (500, serde_json::json!({ "error": e.to_string() }))
                }
            }
        }
        _ => (
            404,
            serde_json::json!({
                "error": "Not found",
                "available_endpoints": ENDPOINTS
            }),
        ),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> (u16, serde_json::Value) {
    match serde_json::to_value(value) {
        Ok(json) => (200, json),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            (500, serde_json::json!({ "error": "serialization failed" }))
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// Start the HTTP server and block until every worker exits.
pub fn start_endpoint_server(ctx: Arc<ServiceContext>) -> Result<(), String> {
    let port = ctx.config.server.port;
    let workers = ctx.config.server.workers;
    let server = tiny_http::Server::http(format!("0.0.0.0:{}", port))
        .map_err(|e| format!("Failed to start HTTP server: {}", e))?;
    let server = Arc::new(server);

    info!("HTTP endpoint listening on http://0.0.0.0:{} with {} workers", port, workers);
    for endpoint in ENDPOINTS {
        info!("   {}", endpoint);
    }

    let failed_connects = Arc::new(AtomicUsize::new(0));
    let pool = ThreadPool::new(workers);
    for worker in 0..workers {
        let server = Arc::clone(&server);
        let ctx = Arc::clone(&ctx);
        let failed_connects = Arc::clone(&failed_connects);
        pool.execute(move || {
            let mut store = match PgStore::connect(ctx.config.search.name_distance) {
                Ok(store) => store,
                Err(e) => {
                    let failed = failed_connects.fetch_add(1, Ordering::SeqCst) + 1;
                    error!(
                        "Worker {} could not connect to the database ({} of {} workers down):\n{}",
                        worker, failed, workers, e
                    );
                    return;
                }
            };
            serve(&server, &mut store, &ctx);
        });
    }
    pool.join();

    worker_outcome(workers, failed_connects.load(Ordering::SeqCst), pool.panic_count())
}

/// Turns the state of a drained pool into the server's result. Workers
/// only return once the socket closes, so a drained pool with failed or
/// panicked workers is an error.
fn worker_outcome(workers: usize, failed_connects: usize, panicked: usize) -> Result<(), String> {
    if failed_connects >= workers {
        return Err(format!(
            "No worker could connect to the database ({} of {} failed)",
            failed_connects, workers
        ));
    }
    if failed_connects > 0 {
        return Err(format!(
            "{} of {} worker(s) never connected to the database",
            failed_connects, workers
        ));
    }
    if panicked > 0 {
        return Err(format!("{} worker(s) panicked", panicked));
    }
    Ok(())
}

fn serve(server: &tiny_http::Server, store: &mut dyn ForecastStore, ctx: &ServiceContext) {
    for request in server.incoming_requests() {
        let (status, json) = route(store, ctx, request.method(), request.url(), Utc::now());
        if status >= 400 {
            warn!("{} {} -> {}", request.method(), request.url(), status);
        }
        // HEAD responses go out without a body.
        if let Err(e) = request.respond(create_response(status, &json)) {
            warn!("Failed to send response: {}", e);
        }
    }
}

/// Create HTTP response with JSON body
fn create_response(status_code: u16, json: &serde_json::Value) -> JsonResponse {
    let body = json.to_string().into_bytes();
    let response = tiny_http::Response::from_data(body)
        .with_status_code(tiny_http::StatusCode::from(status_code));

    match tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
