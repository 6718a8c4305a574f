// Metrics hooks for retrieval.
//
// Callers install a global `SearchMetrics` implementation via [`set_search_metrics`];
// every `RetrievalSession` then reports latency, hit count and outcome per
// collection. This keeps the session independent of any metrics backend.
use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;

/// How a single collection fared within one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    Ok,
    /// The store answered but the response could not be decoded.
    Malformed,
    Failed,
}

impl CollectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionStatus::Ok => "ok",
            CollectionStatus::Malformed => "malformed",
            CollectionStatus::Failed => "failed",
        }
    }
}

/// Metrics observer for retrieval operations.
pub trait SearchMetrics: Send + Sync {
    /// `latency` covers all attempts against `collection`, backoff included.
    fn record_collection(
        &self,
        collection: &str,
        status: CollectionStatus,
        latency: Duration,
        hit_count: usize,
        attempts: u32,
    );
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn SearchMetrics>>> {
    static METRICS: OnceCell<RwLock<Option<Arc<dyn SearchMetrics>>>> = OnceCell::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn SearchMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the global search metrics recorder.
pub fn set_search_metrics(recorder: Option<Arc<dyn SearchMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}
