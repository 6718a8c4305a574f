use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use query::CompileError;
use retrieval::SessionError;
use serde::{Deserialize, Serialize};
use store::StoreError;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Request timeout")]
    Timeout,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid search intent: {0}")]
    Compile(#[from] CompileError),

    #[error("Document store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ServerError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ServerError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Compile(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Store(StoreError::Rejected { status: 404, .. }) => StatusCode::NOT_FOUND,
            ServerError::Store(StoreError::Config(_)) => StatusCode::BAD_REQUEST,
            ServerError::Store(StoreError::Transient(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Store(_) => StatusCode::BAD_GATEWAY,
            ServerError::Internal(_) | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::Authentication(_) => "AUTH_FAILED",
            ServerError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ServerError::Timeout => "REQUEST_TIMEOUT",
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::Compile(CompileError::DimensionMismatch { .. }) => "DIMENSION_MISMATCH",
            ServerError::Compile(_) => "INVALID_INTENT",
            ServerError::Store(_) => "STORE_ERROR",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }
}

impl From<SessionError> for ServerError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Compile(e) => ServerError::Compile(e),
            SessionError::Store(e) => ServerError::Store(e),
            SessionError::DeadlineExceeded { .. } => ServerError::Timeout,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::net::AddrParseError> for ServerError {
    fn from(err: std::net::AddrParseError) -> Self {
        ServerError::Config(format!("Invalid address: {err}"))
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::BadRequest(format!("JSON parse error: {err}"))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_errors_are_unprocessable() {
        let err: ServerError = CompileError::DimensionMismatch {
            field: "work_experience_job_titles_embedding".into(),
            expected: 1024,
            actual: 3,
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.error_code(), "DIMENSION_MISMATCH");
    }

    #[test]
    fn store_errors_map_to_gateway_statuses() {
        let missing: ServerError = StoreError::Rejected {
            status: 404,
            body: String::new(),
        }
        .into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let down: ServerError = StoreError::Transient("connection refused".into()).into();
        assert_eq!(down.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let bad: ServerError = StoreError::Rejected {
            status: 400,
            body: "syntax".into(),
        }
        .into();
        assert_eq!(bad.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn session_errors_convert() {
        let err: ServerError = SessionError::DeadlineExceeded { attempts: 1 }.into();
        assert!(matches!(err, ServerError::Timeout));
    }
}
