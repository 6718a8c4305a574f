//! Text-to-vector encoders for talentmatch.
//!
//! Everything that turns free text into an [`EmbeddingVector`] lives behind the
//! [`VectorEncoder`] trait, so the retrieval layer never knows which provider
//! it is talking to:
//!
//! - **API mode** ([`ApiEncoder`]): OpenAI-compatible `/embeddings`, Hugging Face
//!   feature extraction, or a custom JSON endpoint. Retries transient failures
//!   and trips a circuit breaker when the provider keeps failing.
//! - **Stub mode** ([`StubEncoder`]): hash-seeded vectors, no network. Used by
//!   tests and offline runs.
//!
//! Encoders fail closed. Blank input or a provider error yields the zero vector
//! of the configured dimension; callers never see an error from `embed`.
//!
//! ```no_run
//! use encoder::{build_encoder, EncoderConfig};
//!
//! # async fn run() -> Result<(), encoder::EncoderError> {
//! let encoder = build_encoder(&EncoderConfig {
//!     api_key: std::env::var("TALENT_OPENAI_API_KEY").ok(),
//!     ..Default::default()
//! })?;
//! let title = encoder.embed("Senior Backend Engineer").await;
//! assert_eq!(title.dim(), 1024);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

pub mod config;
pub mod error;
pub mod types;

mod api;
mod normalize;
mod stub;

pub use crate::api::ApiEncoder;
pub use crate::config::{ApiProvider, EncoderConfig};
pub use crate::error::EncoderError;
pub use crate::stub::StubEncoder;
pub use crate::types::{EmbeddingVector, DEFAULT_DIMENSION};

/// Turns text into a fixed-length vector.
///
/// `embed` never fails: empty input and provider errors both map to
/// [`EmbeddingVector::zeros`] of [`dimension`](VectorEncoder::dimension).
#[async_trait]
pub trait VectorEncoder: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> EmbeddingVector;
}

/// Build the encoder selected by `cfg.mode` (`"api"` or `"stub"`).
pub fn build_encoder(cfg: &EncoderConfig) -> Result<Arc<dyn VectorEncoder>, EncoderError> {
    match cfg.mode.as_str() {
        "api" => Ok(Arc::new(ApiEncoder::new(cfg.clone())?)),
        "stub" => Ok(Arc::new(
            StubEncoder::new(cfg.dimension).with_normalize(cfg.normalize),
        )),
        other => Err(EncoderError::InvalidConfig(format!(
            "unknown encoder mode '{other}' (expected 'api' or 'stub')"
        ))),
    }
}
