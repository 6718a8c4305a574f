use resilience::is_retryable_message;
use thiserror::Error;

/// Errors raised inside an encoder.
///
/// They never cross the [`VectorEncoder`](crate::VectorEncoder) boundary: `embed`
/// logs them and returns the zero vector. [`ApiEncoder::try_embed`](crate::ApiEncoder::try_embed)
/// exposes them for callers that want to know.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EncoderError {
    /// Missing URL, unusable client settings, etc.
    #[error("invalid encoder config: {0}")]
    InvalidConfig(String),
    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("embedding request failed: {0}")]
    Transport(String),
    /// The provider answered with a non-success status.
    #[error("embedding provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// The provider answered 2xx but the body is not an embedding.
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),
    /// The provider returned a vector of the wrong length.
    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Too many consecutive failures; the provider is being given a rest.
    #[error("circuit breaker open for provider '{0}'")]
    CircuitOpen(String),
}

impl EncoderError {
    /// Whether another attempt could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            EncoderError::Transport(msg) => is_retryable_message(msg),
            EncoderError::Status { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        let busy = EncoderError::Status {
            status: 429,
            body: String::new(),
        };
        let down = EncoderError::Status {
            status: 503,
            body: String::new(),
        };
        let auth = EncoderError::Status {
            status: 401,
            body: "bad key".into(),
        };
        assert!(busy.is_transient());
        assert!(down.is_transient());
        assert!(!auth.is_transient());
        assert!(auth.to_string().contains("HTTP 401"));
    }

    #[test]
    fn transport_and_shape_errors() {
        assert!(EncoderError::Transport("operation timed out".into()).is_transient());
        assert!(!EncoderError::InvalidResponse("no data".into()).is_transient());
        assert!(!EncoderError::CircuitOpen("openai".into()).is_transient());
        let err = EncoderError::DimensionMismatch {
            expected: 1024,
            actual: 3,
        };
        assert!(err.to_string().contains("expected 1024"));
    }
}
