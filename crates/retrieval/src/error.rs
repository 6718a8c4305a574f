use query::CompileError;
use store::StoreError;
use thiserror::Error;

/// Errors produced by [`RetrievalSession`](crate::RetrievalSession).
///
/// `Compile` aborts the whole search. The other variants are recorded per
/// collection in [`SearchOutcome::failures`](crate::SearchOutcome::failures).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("deadline exceeded after {attempts} attempt(s)")]
    DeadlineExceeded { attempts: u32 },
}

impl SessionError {
    /// Short machine-readable category.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Compile(CompileError::DimensionMismatch { .. }) => "dimension_mismatch",
            SessionError::Compile(_) => "invalid_intent",
            SessionError::Store(StoreError::Transient(_)) => "transient_store_error",
            SessionError::Store(StoreError::Rejected { .. }) => "store_rejected",
            SessionError::Store(StoreError::InvalidBody(_)) => "malformed_response",
            SessionError::Store(StoreError::Config(_)) => "store_config",
            SessionError::DeadlineExceeded { .. } => "deadline_exceeded",
        }
    }
}

/// Persisting an audit record failed. Logged, never returned from a search.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("audit serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
