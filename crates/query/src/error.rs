use thiserror::Error;

/// Rejections raised by [`QueryCompiler`](crate::QueryCompiler).
///
/// All of them are caller errors detected before anything is sent to the
/// document store.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("invalid search intent: {0}")]
    InvalidIntent(String),
    #[error("vector for field '{field}' has {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },
    #[error("invalid compiler config: {0}")]
    InvalidConfig(String),
}

/// The store answered with something that is not a ranked response.
///
/// Recoverable: callers treat it as zero results plus a warning.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed store response: {0}")]
    MalformedResponse(String),
}
