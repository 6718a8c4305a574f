use chrono::{DateTime, Utc};
use futures::future::join_all;
use query::{CompiledQuery, QueryCompiler, RankedResult, ResultDecoder, SearchIntent};
use resilience::{execute_with_retry, RetryConfig};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use store::{validate_collection, DocumentStore, StoreError};
use tokio::time::Instant as Deadline;
use tracing::{debug, info, warn};

use crate::audit::AuditLog;
use crate::error::SessionError;
use crate::metrics::{metrics_recorder, CollectionStatus};

/// Settings for a [`RetrievalSession`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Retry policy for transient store failures, per collection.
    pub retry: RetryConfig,
    /// Where compiled queries are recorded; `None` disables the audit trail.
    pub audit_dir: Option<PathBuf>,
    /// Searched when the caller names no collection.
    pub default_collections: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            audit_dir: Some(PathBuf::from("data/generated_query")),
            default_collections: vec!["cv_collection".into(), "profile_collection".into()],
        }
    }
}

/// A collection that produced no results because its query failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionFailure {
    pub collection: String,
    pub kind: &'static str,
    #[serde(serialize_with = "serialize_display")]
    pub error: SessionError,
    pub attempts: u32,
}

/// A collection that answered with something undecodable, or with hits
/// that had to be dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionWarning {
    pub collection: String,
    pub message: String,
}

fn serialize_display<S: Serializer>(err: &SessionError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(err)
}

/// Aggregate of one search across collections.
///
/// Failed collections are absent from `results` and listed in `failures`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub results: BTreeMap<String, Vec<RankedResult>>,
    pub failures: Vec<CollectionFailure>,
    pub warnings: Vec<CollectionWarning>,
}

impl SearchOutcome {
    /// True when every collection returned results.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_collections(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.collection.as_str()).collect()
    }

    pub fn hits(&self, collection: &str) -> Option<&[RankedResult]> {
        self.results.get(collection).map(Vec::as_slice)
    }
}

enum Executed {
    Hits {
        hits: Vec<RankedResult>,
        skipped: usize,
    },
    Malformed(String),
}

struct CollectionReport {
    collection: String,
    attempts: u32,
    result: Result<Executed, SessionError>,
}

/// Compiles an intent once and runs it against several collections.
///
/// Collections are queried concurrently and independently: a failure in one
/// is reported in the outcome without affecting the others. Only a compile
/// error fails the whole call, and it does so before any I/O.
pub struct RetrievalSession {
    compiler: QueryCompiler,
    decoder: ResultDecoder,
    store: Arc<dyn DocumentStore>,
    cfg: SessionConfig,
    audit: Option<AuditLog>,
}

impl RetrievalSession {
    pub fn new(
        compiler: QueryCompiler,
        decoder: ResultDecoder,
        store: Arc<dyn DocumentStore>,
        cfg: SessionConfig,
    ) -> Self {
        let audit = cfg.audit_dir.clone().map(AuditLog::new);
        Self {
            compiler,
            decoder,
            store,
            cfg,
            audit,
        }
    }

    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    pub fn config(&self) -> &SessionConfig {
        &self.cfg
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub async fn search<S: AsRef<str>>(
        &self,
        intent: &SearchIntent,
        collections: &[S],
    ) -> Result<SearchOutcome, SessionError> {
        self.run(intent, collections, None).await
    }

    /// Like [`search`](Self::search), but collections still running at
    /// `deadline` are abandoned and reported as
    /// [`SessionError::DeadlineExceeded`].
    pub async fn search_with_deadline<S: AsRef<str>>(
        &self,
        intent: &SearchIntent,
        collections: &[S],
        deadline: Deadline,
    ) -> Result<SearchOutcome, SessionError> {
        self.run(intent, collections, Some(deadline)).await
    }

    async fn run<S: AsRef<str>>(
        &self,
        intent: &SearchIntent,
        collections: &[S],
        deadline: Option<Deadline>,
    ) -> Result<SearchOutcome, SessionError> {
        let compiled = self.compiler.compile(intent)?;
        let targets = self.targets(collections);
        let started = Instant::now();
        let at = Utc::now();

        let reports = join_all(
            targets
                .iter()
                .map(|collection| self.run_collection(collection, &compiled, at, deadline)),
        )
        .await;

        let mut outcome = SearchOutcome::default();
        for report in reports {
            match report.result {
                Ok(Executed::Hits { hits, skipped }) => {
                    if skipped > 0 {
                        outcome.warnings.push(CollectionWarning {
                            collection: report.collection.clone(),
                            message: format!(
                                "{skipped} hit(s) skipped: not an object or no `{}`",
                                self.decoder.id_field()
                            ),
                        });
                    }
                    outcome.results.insert(report.collection, hits);
                }
                Ok(Executed::Malformed(message)) => {
                    outcome.warnings.push(CollectionWarning {
                        collection: report.collection.clone(),
                        message,
                    });
                    outcome.results.insert(report.collection, Vec::new());
                }
                Err(error) => outcome.failures.push(CollectionFailure {
                    collection: report.collection,
                    kind: error.kind(),
                    error,
                    attempts: report.attempts,
                }),
            }
        }

        info!(
            collections = targets.len(),
            succeeded = outcome.results.len(),
            failed = outcome.failures.len(),
            warnings = outcome.warnings.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search_completed"
        );
        Ok(outcome)
    }

    /// Requested collections in order, duplicates removed; the configured
    /// defaults when none are given.
    fn targets<S: AsRef<str>>(&self, collections: &[S]) -> Vec<String> {
        let requested: Vec<&str> = if collections.is_empty() {
            self.cfg
                .default_collections
                .iter()
                .map(String::as_str)
                .collect()
        } else {
            collections.iter().map(AsRef::as_ref).collect()
        };
        let mut targets: Vec<String> = Vec::with_capacity(requested.len());
        for name in requested {
            if !targets.iter().any(|t| t == name) {
                targets.push(name.to_string());
            }
        }
        targets
    }

    async fn run_collection(
        &self,
        collection: &str,
        compiled: &CompiledQuery,
        at: DateTime<Utc>,
        deadline: Option<Deadline>,
    ) -> CollectionReport {
        let started = Instant::now();
        let attempts = AtomicU32::new(0);

        let result = match validate_collection(collection) {
            Err(err) => Err(SessionError::Store(err)),
            Ok(()) => {
                let execution = async {
                    self.write_audit(collection, compiled, at).await;
                    self.execute(collection, compiled, &attempts).await
                };
                let response = match deadline {
                    Some(deadline) => match tokio::time::timeout_at(deadline, execution).await {
                        Ok(response) => response,
                        Err(_) => Err(SessionError::DeadlineExceeded {
                            attempts: attempts.load(Ordering::Relaxed),
                        }),
                    },
                    None => execution.await,
                };
                response.map(|raw| self.decode(collection, compiled, raw))
            }
        };

        let attempts = attempts.load(Ordering::Relaxed);
        let latency = started.elapsed();
        self.report(collection, &result, attempts, latency);

        CollectionReport {
            collection: collection.to_string(),
            attempts,
            result,
        }
    }

    async fn execute(
        &self,
        collection: &str,
        compiled: &CompiledQuery,
        attempts: &AtomicU32,
    ) -> Result<Option<serde_json::Value>, SessionError> {
        let outcome = execute_with_retry(&self.cfg.retry, StoreError::is_transient, |attempt| {
            attempts.store(attempt + 1, Ordering::Relaxed);
            if attempt > 0 {
                debug!(collection, attempt, "store_query_retry");
            }
            self.store.query(collection, compiled)
        })
        .await;

        match outcome.result {
            Ok(raw) => Ok(Some(raw)),
            // Unreadable body is a malformed response, not a failed collection.
            Err(StoreError::InvalidBody(msg)) => {
                warn!(collection, error = %msg, "store_body_unreadable");
                Ok(None)
            }
            Err(err) => {
                warn!(
                    collection,
                    attempts = outcome.attempts,
                    error = %err,
                    "store_query_failed"
                );
                Err(SessionError::Store(err))
            }
        }
    }

    fn decode(
        &self,
        collection: &str,
        compiled: &CompiledQuery,
        raw: Option<serde_json::Value>,
    ) -> Executed {
        let Some(raw) = raw else {
            return Executed::Malformed("store returned an unreadable body".into());
        };
        match self.decoder.decode_page(&raw, compiled.result_fields()) {
            Ok(page) => Executed::Hits {
                hits: page.hits,
                skipped: page.skipped,
            },
            Err(err) => {
                warn!(collection, error = %err, "store_response_malformed");
                Executed::Malformed(err.to_string())
            }
        }
    }

    async fn write_audit(&self, collection: &str, compiled: &CompiledQuery, at: DateTime<Utc>) {
        let Some(audit) = &self.audit else {
            return;
        };
        match audit.record(collection, compiled, at).await {
            Ok(path) => debug!(collection, path = %path.display(), "audit_written"),
            Err(err) => warn!(collection, error = %err, "audit_write_failed"),
        }
    }

    fn report(
        &self,
        collection: &str,
        result: &Result<Executed, SessionError>,
        attempts: u32,
        latency: Duration,
    ) {
        let Some(metrics) = metrics_recorder() else {
            return;
        };
        let (status, hits) = match result {
            Ok(Executed::Hits { hits, .. }) => (CollectionStatus::Ok, hits.len()),
            Ok(Executed::Malformed(_)) => (CollectionStatus::Malformed, 0),
            Err(_) => (CollectionStatus::Failed, 0),
        };
        metrics.record_collection(collection, status, latency, hits, attempts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query::CompilerConfig;
    use serde_json::json;
    use store::InMemoryStore;

    const DIM: usize = 8;

    fn session(store: Arc<InMemoryStore>, retry: RetryConfig) -> RetrievalSession {
        let compiler = QueryCompiler::new(CompilerConfig {
            dimension: DIM,
            ..Default::default()
        })
        .unwrap();
        RetrievalSession::new(
            compiler,
            ResultDecoder::default(),
            store,
            SessionConfig {
                retry,
                audit_dir: None,
                ..Default::default()
            },
        )
    }

    fn fast_retry(max_retries: u32) -> RetryConfig {
        RetryConfig::default()
            .with_max_retries(max_retries)
            .with_base_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(2))
            .with_jitter(false)
    }

    fn intent() -> SearchIntent {
        SearchIntent::new(vec![0.1; DIM]).with_result_fields(["document_id", "skills", "score"])
    }

    fn hit(id: &str, score: f64) -> serde_json::Value {
        json!({"document_id": [id], "skills": ["Rust"], "score": score})
    }

    #[tokio::test]
    async fn failing_collection_does_not_sink_the_others() {
        let store = Arc::new(
            InMemoryStore::new()
                .with_docs("cv_collection", vec![])
                .with_docs("profile_collection", vec![hit("p-1", 3.0)]),
        );
        for _ in 0..3 {
            store.push_response("cv_collection", Err(StoreError::Transient("timed out".into())));
        }
        let s = session(store.clone(), fast_retry(2));

        let outcome = s
            .search(&intent(), &["cv_collection", "profile_collection"])
            .await
            .unwrap();

        assert_eq!(outcome.hits("profile_collection").unwrap().len(), 1);
        assert!(!outcome.results.contains_key("cv_collection"));
        assert_eq!(outcome.failed_collections(), ["cv_collection"]);
        assert_eq!(outcome.failures[0].attempts, 3);
        assert_eq!(outcome.failures[0].kind, "transient_store_error");
        assert_eq!(store.call_count("cv_collection"), 3);
    }

    #[tokio::test]
    async fn transient_error_recovers_on_retry() {
        let store = Arc::new(InMemoryStore::new().with_docs("cv_collection", vec![hit("c-1", 1.0)]));
        store.push_response("cv_collection", Err(StoreError::Transient("503".into())));
        let s = session(store.clone(), fast_retry(3));

        let outcome = s.search(&intent(), &["cv_collection"]).await.unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.hits("cv_collection").unwrap()[0].document_id, "c-1");
        assert_eq!(store.call_count("cv_collection"), 2);
    }

    #[tokio::test]
    async fn rejected_queries_are_not_retried() {
        let store = Arc::new(InMemoryStore::new().with_docs("cv_collection", vec![]));
        store.push_response(
            "cv_collection",
            Err(StoreError::Rejected {
                status: 400,
                body: "undefined field".into(),
            }),
        );
        let s = session(store.clone(), fast_retry(3));

        let outcome = s.search(&intent(), &["cv_collection"]).await.unwrap();
        assert_eq!(outcome.failures[0].kind, "store_rejected");
        assert_eq!(store.call_count("cv_collection"), 1);
    }

    #[tokio::test]
    async fn invalid_intent_aborts_before_io() {
        let store = Arc::new(InMemoryStore::new().with_docs("cv_collection", vec![]));
        let s = session(store.clone(), fast_retry(0));

        let bad = SearchIntent::new(vec![0.1; DIM + 1]);
        let err = s.search(&bad, &["cv_collection"]).await.unwrap_err();
        assert!(matches!(err, SessionError::Compile(_)));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn malformed_response_is_a_warning_with_no_hits() {
        let store = Arc::new(InMemoryStore::new().with_docs("cv_collection", vec![]));
        store.push_response("cv_collection", Ok(json!({"unexpected": true})));
        store.push_response("cv_collection", Err(StoreError::InvalidBody("<html>".into())));
        let s = session(store, fast_retry(0));

        for _ in 0..2 {
            let outcome = s.search(&intent(), &["cv_collection"]).await.unwrap();
            assert!(outcome.is_complete());
            assert_eq!(outcome.hits("cv_collection"), Some(&[][..]));
            assert_eq!(outcome.warnings.len(), 1);
        }
    }

    #[tokio::test]
    async fn deadline_abandons_slow_collections() {
        let store = Arc::new(InMemoryStore::new().with_docs("cv_collection", vec![hit("c-1", 1.0)]));
        store.set_delay(Duration::from_secs(5));
        let s = session(store, fast_retry(0));

        let deadline = Deadline::now() + Duration::from_millis(50);
        let outcome = s
            .search_with_deadline(&intent(), &["cv_collection"], deadline)
            .await
            .unwrap();
        assert_eq!(outcome.failures[0].kind, "deadline_exceeded");
        assert_eq!(outcome.failures[0].attempts, 1);
    }

    #[tokio::test]
    async fn skipped_hits_are_reported_as_warnings() {
        let store = Arc::new(InMemoryStore::new().with_docs(
            "cv_collection",
            vec![hit("c-1", 2.0), json!({"skills": ["Go"]}), json!("stray")],
        ));
        let s = session(store, fast_retry(0));

        let outcome = s.search(&intent(), &["cv_collection"]).await.unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.hits("cv_collection").unwrap().len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].collection, "cv_collection");
        assert!(outcome.warnings[0].message.starts_with("2 hit(s) skipped"));
    }

    #[tokio::test]
    async fn clean_response_has_no_warnings() {
        let store = Arc::new(InMemoryStore::new().with_docs("cv_collection", vec![hit("c-1", 2.0)]));
        let outcome = session(store, fast_retry(0))
            .search(&intent(), &["cv_collection"])
            .await
            .unwrap();
        assert!(outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn audit_write_counts_against_the_deadline() {
        let audit = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryStore::new().with_docs("cv_collection", vec![hit("c-1", 1.0)]));
        let s = RetrievalSession::new(
            QueryCompiler::new(CompilerConfig {
                dimension: DIM,
                ..Default::default()
            })
            .unwrap(),
            ResultDecoder::default(),
            store.clone(),
            SessionConfig {
                retry: fast_retry(0),
                audit_dir: Some(audit.path().join("records")),
                ..Default::default()
            },
        );

        // Already expired: the audit write cannot finish before the deadline,
        // so the store is never reached.
        let deadline = Deadline::now() - Duration::from_millis(1);
        let outcome = s
            .search_with_deadline(&intent(), &["cv_collection"], deadline)
            .await
            .unwrap();
        assert_eq!(outcome.failures[0].kind, "deadline_exceeded");
        assert_eq!(outcome.failures[0].attempts, 0);
        assert_eq!(store.call_count("cv_collection"), 0);
    }

    #[tokio::test]
    async fn defaults_and_duplicates() {
        let store = Arc::new(
            InMemoryStore::new()
                .with_docs("cv_collection", vec![])
                .with_docs("profile_collection", vec![]),
        );
        let s = session(store.clone(), fast_retry(0));

        let outcome = s.search::<&str>(&intent(), &[]).await.unwrap();
        assert_eq!(
            outcome.results.keys().collect::<Vec<_>>(),
            ["cv_collection", "profile_collection"]
        );

        s.search(&intent(), &["cv_collection", "cv_collection"])
            .await
            .unwrap();
        assert_eq!(store.call_count("cv_collection"), 2);
    }

    #[tokio::test]
    async fn bad_collection_name_is_a_failure_entry() {
        let store = Arc::new(InMemoryStore::new().with_docs("cv_collection", vec![]));
        let s = session(store, fast_retry(0));
        let outcome = s
            .search(&intent(), &["cv_collection", "../etc"])
            .await
            .unwrap();
        assert!(outcome.results.contains_key("cv_collection"));
        assert_eq!(outcome.failures[0].kind, "store_config");
    }

    #[derive(Default)]
    struct Recorder(std::sync::Mutex<Vec<(String, CollectionStatus, usize)>>);

    impl crate::SearchMetrics for Recorder {
        fn record_collection(
            &self,
            collection: &str,
            status: CollectionStatus,
            _latency: Duration,
            hit_count: usize,
            _attempts: u32,
        ) {
            self.0
                .lock()
                .unwrap()
                .push((collection.to_string(), status, hit_count));
        }
    }

    #[tokio::test]
    async fn metrics_observer_sees_each_collection() {
        let recorder = Arc::new(Recorder::default());
        crate::set_search_metrics(Some(recorder.clone() as Arc<dyn crate::SearchMetrics>));

        let store = Arc::new(
            InMemoryStore::new()
                .with_docs("metrics_ok", vec![hit("m-1", 1.0), hit("m-2", 0.5)])
                .with_docs("metrics_down", vec![]),
        );
        store.push_response("metrics_down", Err(StoreError::Transient("reset".into())));
        let s = session(store, fast_retry(0));
        s.search(&intent(), &["metrics_ok", "metrics_down"])
            .await
            .unwrap();
        crate::set_search_metrics(None);

        let mut seen: Vec<_> = recorder
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _, _)| c.starts_with("metrics_"))
            .cloned()
            .collect();
        seen.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            seen,
            [
                ("metrics_down".to_string(), CollectionStatus::Failed, 0),
                ("metrics_ok".to_string(), CollectionStatus::Ok, 2),
            ]
        );
    }

    #[test]
    fn outcome_serializes_failures_as_messages() {
        let outcome = SearchOutcome {
            results: BTreeMap::new(),
            failures: vec![CollectionFailure {
                collection: "cv_collection".into(),
                kind: "transient_store_error",
                error: SessionError::Store(StoreError::Transient("timed out".into())),
                attempts: 4,
            }],
            warnings: vec![],
        };
        let v = serde_json::to_value(&outcome).unwrap();
        assert_eq!(v["failures"][0]["error"], "transient store error: timed out");
        assert_eq!(v["failures"][0]["attempts"], 4);
    }
}
