//! Retrieval orchestration for talentmatch.
//!
//! [`RetrievalSession`] is the entry point the CLI and HTTP server call: it
//! compiles a [`SearchIntent`](query::SearchIntent) once, runs it against every
//! requested collection concurrently, decodes each response and aggregates
//! everything into a [`SearchOutcome`].
//!
//! - Compile errors abort the call before any I/O.
//! - Transient store failures are retried with bounded backoff; a collection
//!   that still fails is listed in [`SearchOutcome::failures`] while the others
//!   return normally.
//! - Malformed store responses count as zero results plus a warning.
//! - Every compiled query is written to the audit directory first. Audit
//!   failures are logged and otherwise ignored.
//!
//! ```no_run
//! use std::sync::Arc;
//! use query::{CompilerConfig, QueryCompiler, ResultDecoder, SearchIntent};
//! use retrieval::{RetrievalSession, SessionConfig};
//! use store::{SolrConfig, SolrStore};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let session = RetrievalSession::new(
//!     QueryCompiler::new(CompilerConfig::default())?,
//!     ResultDecoder::default(),
//!     Arc::new(SolrStore::new(SolrConfig::default())?),
//!     SessionConfig::default(),
//! );
//! let intent = SearchIntent::new(vec![0.0; 1024]);
//! let outcome = session.search(&intent, &["cv_collection", "profile_collection"]).await?;
//! for failure in &outcome.failures {
//!     eprintln!("{} failed: {}", failure.collection, failure.error);
//! }
//! # Ok(())
//! # }
//! ```

mod audit;
mod error;
mod metrics;
pub mod profile;
mod session;

pub use audit::AuditLog;
pub use error::{AuditError, SessionError};
pub use metrics::{set_search_metrics, CollectionStatus, SearchMetrics};
pub use profile::{JobProfile, ProfileIntentBuilder, ProfileWeights};
pub use session::{
    CollectionFailure, CollectionWarning, RetrievalSession, SearchOutcome, SessionConfig,
};
