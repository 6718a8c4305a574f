//! API route handlers
//!
//! - `health`: liveness and store readiness
//! - `search`: intent and job-profile searches
//! - `collections`: collection maintenance

pub mod collections;
pub mod health;
pub mod search;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info (GET /, no authentication).
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "talentmatch",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "/api/v1/search",
            "/api/v1/search/profile",
            "/api/v1/collections/{name}",
            "/health",
            "/ready"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
