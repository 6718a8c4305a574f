use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use talentmatch::{
    CompilerConfig, InMemoryStore, QueryCompiler, ResultDecoder, RetrievalSession, RetryConfig,
    SearchIntent, SessionConfig,
};

const DIM: usize = 8;

fn shared_session(
    store: Arc<InMemoryStore>,
    audit: Option<std::path::PathBuf>,
) -> Arc<RetrievalSession> {
    Arc::new(RetrievalSession::new(
        QueryCompiler::new(CompilerConfig {
            dimension: DIM,
            ..Default::default()
        })
        .unwrap(),
        ResultDecoder::default(),
        store,
        SessionConfig {
            retry: RetryConfig::none(),
            audit_dir: audit,
            ..Default::default()
        },
    ))
}

fn store_with(collections: &[&str]) -> InMemoryStore {
    collections.iter().fold(InMemoryStore::new(), |store, c| {
        store.with_docs(c, vec![json!({"document_id": format!("{c}-1"), "score": 1.0})])
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn collections_are_queried_concurrently() {
    let collections = ["c0", "c1", "c2", "c3"];
    let store = Arc::new(store_with(&collections));
    store.set_delay(Duration::from_millis(200));
    let session = shared_session(store, None);

    let started = Instant::now();
    let outcome = session
        .search(&SearchIntent::new(vec![0.1; DIM]), &collections)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(outcome.results.len(), 4);
    // Sequential execution would take at least 800ms.
    assert!(elapsed < Duration::from_millis(600), "took {elapsed:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shared_session_serves_parallel_searches() {
    let audit = tempfile::tempdir().unwrap();
    let store = Arc::new(store_with(&["cv_collection", "profile_collection"]));
    let session = shared_session(store.clone(), Some(audit.path().to_path_buf()));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                let intent = SearchIntent::new(vec![i as f32 / 16.0; DIM]);
                session
                    .search(&intent, &["cv_collection", "profile_collection"])
                    .await
            })
        })
        .collect();

    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.results.len(), 2);
    }

    assert_eq!(store.call_count("cv_collection"), 16);
    assert_eq!(store.call_count("profile_collection"), 16);

    // One audit record per collection per search, none overwritten.
    let audited = std::fs::read_dir(audit.path()).unwrap().count();
    assert_eq!(audited, 32);
}

#[tokio::test]
async fn duplicate_collections_are_queried_once() {
    let store = Arc::new(store_with(&["cv_collection"]));
    let session = shared_session(store.clone(), None);

    let outcome = session
        .search(
            &SearchIntent::new(vec![0.1; DIM]),
            &["cv_collection", "cv_collection"],
        )
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(store.call_count("cv_collection"), 1);
}
