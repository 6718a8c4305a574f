//! Hybrid ranked-retrieval query construction and result decoding.
//!
//! A [`SearchIntent`] describes a target profile as several embeddings plus
//! structured metadata. [`QueryCompiler`] turns it into a [`CompiledQuery`]:
//!
//! - one k-nearest-neighbour term per vector, each with its own boost, summed
//!   into a single relevance score. The primary term always carries the
//!   highest boost;
//! - hard filters for equality values (case-normalized) and for free-text
//!   locations, which become an OR over settlement tokens;
//! - an optional minimum-score cutoff.
//!
//! [`ResultDecoder`] goes the other way, from the store's raw ranked response
//! to [`RankedResult`]s, unwrapping list-wrapped scalars and never reordering.
//!
//! ```
//! use query::{CompilerConfig, QueryCompiler, ResultDecoder, SearchIntent};
//! use serde_json::json;
//!
//! let compiler = QueryCompiler::new(CompilerConfig { dimension: 3, ..Default::default() }).unwrap();
//! let intent = SearchIntent::new(vec![0.1, 0.2, 0.3])
//!     .with_secondary("skills_embedding", vec![0.3, 0.2, 0.1], 3.0, 50)
//!     .with_exact_filter("work_experience_seniority", "Senior")
//!     .with_location_filter("contact_information_address", "Lahore, Pakistan")
//!     .with_result_fields(["document_id", "skills", "score"]);
//! let compiled = compiler.compile(&intent).unwrap();
//! assert_eq!(compiled.terms().len(), 2);
//! assert_eq!(compiled.filters().len(), 2);
//!
//! let raw = json!({"response": {"docs": [{"document_id": ["cv-1"], "skills": ["Go"], "score": 3.2}]}});
//! let hits = ResultDecoder::default().decode(&raw, compiled.result_fields()).unwrap();
//! assert_eq!(hits[0].field("skills").unwrap(), &"Go");
//! ```

mod compiled;
mod compiler;
mod decoder;
mod error;
mod intent;
pub mod location;

pub use compiled::{CompiledQuery, FilterPredicate, SimilarityTerm, TextMatch, SCORE_FIELD};
pub use compiler::{is_valid_field_name, CompilerConfig, LocationMatch, LocationPolicy, QueryCompiler};
pub use decoder::{DecodedPage, FieldValue, RankedResult, ResultDecoder};
pub use error::{CompileError, DecodeError};
pub use intent::{
    SearchIntent, SecondaryVector, TextConstraint, TextFilter, DEFAULT_PAGE_SIZE,
    DEFAULT_RESULT_FIELDS,
};

pub use encoder::EmbeddingVector;
