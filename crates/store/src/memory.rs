use async_trait::async_trait;
use query::CompiledQuery;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::{validate_collection, DocumentStore, StoreError};

/// A request observed by [`InMemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub collection: String,
    pub params: Vec<(String, String)>,
}

#[derive(Default)]
struct Scripts {
    queued: HashMap<String, VecDeque<Result<Value, StoreError>>>,
    docs: HashMap<String, Vec<Value>>,
    calls: Vec<RecordedCall>,
    cleared: Vec<String>,
    delay: Option<Duration>,
}

/// Scripted [`DocumentStore`] for tests and offline demos.
///
/// Each collection answers with its queued responses first (in order) and then
/// with its stored documents, in insertion order. Unknown collections are
/// rejected with a 404, as Solr does.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Scripts>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `collection` holding `docs`.
    pub fn with_docs(self, collection: &str, docs: Vec<Value>) -> Self {
        self.lock().docs.insert(collection.to_string(), docs);
        self
    }

    /// Answer the next query on `collection` with `response` instead of the
    /// stored documents.
    pub fn push_response(&self, collection: &str, response: Result<Value, StoreError>) {
        self.lock()
            .queued
            .entry(collection.to_string())
            .or_default()
            .push_back(response);
    }

    /// Sleep this long before answering each query.
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, collection: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.collection == collection)
            .count()
    }

    pub fn cleared(&self) -> Vec<String> {
        self.lock().cleared.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Scripts> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn not_found(collection: &str) -> StoreError {
        StoreError::Rejected {
            status: 404,
            body: format!("collection '{collection}' not found"),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn query(&self, collection: &str, compiled: &CompiledQuery) -> Result<Value, StoreError> {
        validate_collection(collection)?;
        let (delay, outcome) = {
            let mut scripts = self.lock();
            scripts.calls.push(RecordedCall {
                collection: collection.to_string(),
                params: compiled.to_solr_params(),
            });
            let queued = scripts
                .queued
                .get_mut(collection)
                .and_then(VecDeque::pop_front);
            let outcome = match queued {
                Some(outcome) => outcome,
                None => match scripts.docs.get(collection) {
                    Some(docs) => {
                        let page: Vec<Value> =
                            docs.iter().take(compiled.page_size()).cloned().collect();
                        Ok(json!({
                            "responseHeader": { "status": 0 },
                            "response": { "numFound": docs.len(), "start": 0, "docs": page }
                        }))
                    }
                    None => Err(Self::not_found(collection)),
                },
            };
            (scripts.delay, outcome)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        outcome
    }

    async fn delete_all(&self, collection: &str) -> Result<(), StoreError> {
        validate_collection(collection)?;
        let mut guard = self.lock();
        let scripts = &mut *guard;
        match scripts.docs.get_mut(collection) {
            Some(docs) => {
                docs.clear();
                scripts.cleared.push(collection.to_string());
                Ok(())
            }
            None => Err(Self::not_found(collection)),
        }
    }

    async fn ping(&self, collection: &str) -> Result<(), StoreError> {
        validate_collection(collection)?;
        if self.lock().docs.contains_key(collection) {
            Ok(())
        } else {
            Err(Self::not_found(collection))
        }
    }
}
