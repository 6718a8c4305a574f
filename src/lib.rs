//! Workspace umbrella crate for talentmatch.
//!
//! Ranks candidate documents for a job posting by combining several embedding
//! similarities with text filters, executed against Solr collections. The
//! work is split across the member crates and re-exported here:
//!
//! - [`query`]: [`SearchIntent`] → [`CompiledQuery`] and raw response → [`RankedResult`]
//! - [`store`]: the [`DocumentStore`] trait plus Solr and in-memory backends
//! - [`encoder`]: the [`VectorEncoder`] trait plus API and stub encoders
//! - [`retrieval`]: [`RetrievalSession`] and the job-profile intent builder
//! - [`server`]: the HTTP API
//!
//! This crate adds the YAML configuration ([`TalentConfig`]) and the factory
//! functions that wire a configured stack together.

pub mod config;

pub use config::{ConfigLoadError, TalentConfig};
pub use encoder::{
    build_encoder, ApiEncoder, ApiProvider, EmbeddingVector, EncoderConfig, EncoderError,
    StubEncoder, VectorEncoder,
};
pub use query::{
    CompileError, CompiledQuery, CompilerConfig, DecodeError, FieldValue, FilterPredicate,
    LocationMatch, LocationPolicy, QueryCompiler, RankedResult, ResultDecoder, SearchIntent,
    SecondaryVector, SimilarityTerm, TextConstraint, TextFilter, TextMatch,
};
pub use resilience::{CircuitBreakerConfig, RetryConfig};
pub use retrieval::{
    set_search_metrics, CollectionFailure, CollectionStatus, CollectionWarning, JobProfile,
    ProfileIntentBuilder, ProfileWeights, RetrievalSession, SearchMetrics, SearchOutcome,
    SessionConfig, SessionError,
};
pub use store::{DocumentStore, InMemoryStore, SolrConfig, SolrStore, StoreError};

use std::sync::Arc;
use thiserror::Error;

/// Errors raised while wiring a stack from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid compiler configuration: {0}")]
    Compiler(#[from] CompileError),

    #[error("cannot create document store: {0}")]
    Store(#[from] StoreError),

    #[error("cannot create encoder: {0}")]
    Encoder(#[from] EncoderError),
}

/// A ready-to-use session and profile builder sharing one configuration.
#[derive(Clone)]
pub struct TalentStack {
    pub session: Arc<RetrievalSession>,
    pub profiles: Arc<ProfileIntentBuilder>,
}

/// Solr store from `cfg.solr`.
pub fn build_store(cfg: &TalentConfig) -> Result<Arc<dyn DocumentStore>, SetupError> {
    Ok(Arc::new(SolrStore::new(cfg.solr.clone())?))
}

/// Session over `store` using the compiler and session sections of `cfg`.
pub fn build_session(
    cfg: &TalentConfig,
    store: Arc<dyn DocumentStore>,
) -> Result<RetrievalSession, SetupError> {
    let compiler = QueryCompiler::new(cfg.compiler.clone())?;
    Ok(RetrievalSession::new(
        compiler,
        ResultDecoder::new(cfg.compiler.id_field.clone()),
        store,
        cfg.session.clone(),
    ))
}

/// Profile builder embedding through `encoder`, following the compiler's
/// location policy.
pub fn build_profile_builder(
    cfg: &TalentConfig,
    encoder: Arc<dyn VectorEncoder>,
) -> ProfileIntentBuilder {
    ProfileIntentBuilder::new(encoder, cfg.profile.clone())
        .with_location_policy(cfg.compiler.location_policy.clone())
}

/// Full stack from configuration: Solr store, configured encoder, session.
pub fn build_stack(cfg: &TalentConfig) -> Result<TalentStack, SetupError> {
    let store = build_store(cfg)?;
    build_stack_with(cfg, store, build_encoder(&cfg.encoder)?)
}

/// Like [`build_stack`] with caller-supplied collaborators.
pub fn build_stack_with(
    cfg: &TalentConfig,
    store: Arc<dyn DocumentStore>,
    encoder: Arc<dyn VectorEncoder>,
) -> Result<TalentStack, SetupError> {
    let session = build_session(cfg, store)?;
    let profiles = build_profile_builder(cfg, encoder);
    tracing::info!(
        dimension = cfg.compiler.dimension,
        collections = ?cfg.session.default_collections,
        audit = cfg.session.audit_dir.is_some(),
        "stack_ready"
    );
    Ok(TalentStack {
        session: Arc::new(session),
        profiles: Arc::new(profiles),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_stack_with_doubles() {
        let cfg = TalentConfig {
            session: SessionConfig {
                audit_dir: None,
                ..Default::default()
            },
            ..Default::default()
        };
        let stack = build_stack_with(
            &cfg,
            Arc::new(InMemoryStore::new()),
            Arc::new(StubEncoder::new(cfg.compiler.dimension)),
        )
        .unwrap();
        assert_eq!(stack.session.compiler().config().dimension, 1024);
    }

    #[test]
    fn rejects_invalid_compiler_config() {
        let mut cfg = TalentConfig::default();
        cfg.compiler.dimension = 0;
        let err = build_session(&cfg, Arc::new(InMemoryStore::new())).err().unwrap();
        assert!(matches!(err, SetupError::Compiler(_)));
    }

    #[test]
    fn stub_encoder_mode_builds_without_network() {
        let mut cfg = TalentConfig::default();
        cfg.encoder.mode = "stub".into();
        cfg.session.audit_dir = None;
        assert!(build_stack(&cfg).is_ok());
    }
}
