use crate::error::ServerError;
use crate::state::ServerState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const API_KEY_HEADER: &str = "x-api-key";

/// Correlation id of the current request, available to handlers as an
/// `Extension`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    fn from_headers(headers: &HeaderMap) -> Self {
        let supplied = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= 128);
        match supplied {
            Some(id) => Self(id.to_string()),
            None => Self(uuid::Uuid::new_v4().to_string()),
        }
    }
}

/// Key from `X-API-Key`, or from `Authorization: Bearer <key>`.
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(key) = headers.get(API_KEY_HEADER) {
        return key.to_str().ok().map(str::trim);
    }
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Rejects `/api/v1` calls without a configured key, then applies the
/// per-key rate limit.
pub async fn api_key_auth(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let key = presented_key(request.headers()).ok_or_else(|| {
        ServerError::Authentication(format!(
            "API key required in '{API_KEY_HEADER}' or 'Authorization: Bearer <key>'"
        ))
    })?;
    if !state.is_valid_api_key(key) {
        return Err(ServerError::Authentication("Invalid API key".into()));
    }
    if !state.check_rate_limit(key) {
        tracing::warn!(limit = state.config.rate_limit_per_minute, "rate_limited");
        return Err(ServerError::RateLimitExceeded);
    }
    Ok(next.run(request).await)
}

/// Assigns the request id and runs the rest of the stack inside a
/// `request` span, so session, store and audit events carry the id too.
pub async fn request_context(mut request: Request, next: Next) -> Response {
    let id = RequestId::from_headers(request.headers());
    let span = tracing::info_span!(
        "request",
        request_id = %id.0,
        method = %request.method(),
        path = %request.uri().path(),
    );
    request.extensions_mut().insert(id.clone());

    let started = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;

    span.in_scope(|| {
        tracing::info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request_completed"
        );
    });
    if let Ok(value) = HeaderValue::from_str(&id.0) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
