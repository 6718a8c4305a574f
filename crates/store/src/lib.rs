//! Document store collaborators for talentmatch.
//!
//! The retrieval layer only sees [`DocumentStore`]. Two implementations ship:
//!
//! - [`SolrStore`]: Solr's HTTP API (`/select`, `/update`, `/admin/ping`).
//! - [`InMemoryStore`]: scripted responses per collection, for tests and demos.

use async_trait::async_trait;
use query::CompiledQuery;
use serde_json::Value;

mod error;
mod memory;
mod solr;

pub use error::StoreError;
pub use memory::{InMemoryStore, RecordedCall};
pub use solr::{SolrConfig, SolrStore};

/// A search engine holding scalar and embedding fields per document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run `compiled` against `collection` and return the raw response tree.
    async fn query(&self, collection: &str, compiled: &CompiledQuery) -> Result<Value, StoreError>;

    /// Remove every document from `collection` and commit.
    async fn delete_all(&self, collection: &str) -> Result<(), StoreError>;

    /// Check that `collection` is reachable and serving.
    async fn ping(&self, collection: &str) -> Result<(), StoreError>;
}

/// Collection names end up in URL paths; keep them to `[A-Za-z0-9_.-]+`.
pub fn validate_collection(collection: &str) -> Result<(), StoreError> {
    let valid = !collection.is_empty()
        && !collection.starts_with('.')
        && collection
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::Config(format!(
            "invalid collection name '{collection}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names() {
        assert!(validate_collection("cv_collection").is_ok());
        assert!(validate_collection("profile-collection.v2").is_ok());
        for bad in ["", "../admin", "cv collection", "a/b", ".hidden"] {
            assert!(validate_collection(bad).is_err(), "{bad}");
        }
    }
}
