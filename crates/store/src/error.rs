use resilience::is_retryable_message;
use thiserror::Error;

/// Failures talking to a document store.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// Network failure, timeout, throttling or a 5xx. Worth retrying.
    #[error("transient store error: {0}")]
    Transient(String),
    /// The store understood the request and refused it (bad query, unknown
    /// collection, auth). Retrying will not help.
    #[error("store rejected request with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    /// 2xx response whose body is not JSON.
    #[error("store returned an unreadable body: {0}")]
    InvalidBody(String),
    #[error("store configuration error: {0}")]
    Config(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        if status == 408 || status == 429 || status >= 500 {
            StoreError::Transient(format!("HTTP {status}: {body}"))
        } else {
            StoreError::Rejected { status, body }
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        let failure = if err.is_timeout() || err.is_connect() {
            TransportFailure::Network
        } else if err.is_decode() || err.is_body() {
            TransportFailure::Body
        } else if err.is_builder() {
            TransportFailure::Builder
        } else if err.is_request() {
            TransportFailure::Network
        } else {
            TransportFailure::Other
        };
        failure.classify(err.to_string())
    }
}

/// What part of an HTTP exchange failed, before the status was known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransportFailure {
    Network,
    /// The response arrived but its body could not be read or decoded.
    Body,
    Builder,
    Other,
}

impl TransportFailure {
    pub(crate) fn classify(self, msg: String) -> StoreError {
        match self {
            TransportFailure::Network => StoreError::Transient(msg),
            TransportFailure::Body => StoreError::InvalidBody(msg),
            TransportFailure::Builder => StoreError::Config(msg),
            TransportFailure::Other if is_retryable_message(&msg) => StoreError::Transient(msg),
            TransportFailure::Other => StoreError::Rejected {
                status: 0,
                body: msg,
            },
        }
    }
}
