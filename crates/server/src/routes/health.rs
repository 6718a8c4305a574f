use crate::state::ServerState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use futures::future::join_all;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::SystemTime;

/// Global server start time for uptime calculation
static SERVER_START_TIME: once_cell::sync::Lazy<SystemTime> =
    once_cell::sync::Lazy::new(SystemTime::now);

fn uptime_seconds() -> u64 {
    SERVER_START_TIME
        .elapsed()
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Health check endpoint (liveness)
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "talentmatch",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds(),
    }))
}

/// Readiness check endpoint
///
/// Pings every default collection; 503 unless all of them answer.
pub async fn readiness_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let collections = &state.session.config().default_collections;
    let store = state.session.store();
    let pings = join_all(collections.iter().map(|c| store.ping(c))).await;

    let mut components = Map::new();
    let mut ready = true;
    for (collection, ping) in collections.iter().zip(pings) {
        let status = match ping {
            Ok(()) => "ready".to_string(),
            Err(err) => {
                ready = false;
                tracing::warn!(collection = %collection, error = %err, "collection_not_ready");
                format!("unavailable: {err}")
            }
        };
        components.insert(collection.clone(), Value::String(status));
    }

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if ready { "ready" } else { "not_ready" },
            "service": "talentmatch",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "uptime_seconds": uptime_seconds(),
            "components": components,
        })),
    )
}
