// src/api.rs
use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::scan::ScanEngine;
use crate::types::ScanRequest;

/// Build the application router around an injected engine
pub fn router(engine: Arc<ScanEngine>) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route("/scan", post(scan_handler))
        .layer(middleware::from_fn(version_headers))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(engine)
}

/// Liveness probe
async fn status_handler() -> &'static str {
    "ct-backscan is running\n"
}

/// POST /scan: parse the cutoff, run the full scan, return the summary.
///
/// The request body itself is the only fatal error surface; once the engine
/// starts, failure is always partial and lands in the summary's failures
/// array.
async fn scan_handler(
    State(engine): State<Arc<ScanEngine>>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Invalid request body"})),
        )
            .into_response();
    };

    let cutoff = match parse_cutoff(request.cut_off_date.as_deref(), engine.default_cutoff()) {
        Ok(cutoff) => cutoff,
        Err(message) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": message})),
            )
                .into_response();
        }
    };

    info!(
        "Scan requested: cutoff {}, {} registered logs",
        cutoff,
        engine.sources().len()
    );

    // Scan-wide cancellation signal; the optional deadline fires it so
    // in-flight workers stop promptly instead of running every queued job.
    // The timer is scoped to this scan: it is aborted as soon as the engine
    // returns, not left sleeping out the full duration.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let deadline_task = engine.scan_timeout().map(|deadline| {
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            let _ = shutdown_tx.send(true);
        })
    });

    let summary = engine.run(cutoff, shutdown_rx).await;
    if let Some(task) = deadline_task {
        task.abort();
    }
    drop(shutdown_tx);

    (StatusCode::OK, Json(summary)).into_response()
}

/// Interpret the caller's cutoff string.
///
/// Accepts RFC 3339 or a bare YYYY-MM-DD (taken as UTC midnight); a missing
/// or empty value falls back to the configured default.
fn parse_cutoff(
    raw: Option<&str>,
    default: DateTime<Utc>,
) -> Result<DateTime<Utc>, String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(default);
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(format!(
        "Invalid cut_off_date '{raw}': expected RFC 3339 or YYYY-MM-DD"
    ))
}

/// Custom response headers sent with every response
async fn version_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-powered-by", HeaderValue::from_static("ct-backscan"));
    headers.insert("x-api-version", HeaderValue::from_static("v1.0.0"));
    response
}
