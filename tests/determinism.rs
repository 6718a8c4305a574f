use std::sync::Arc;

use serde_json::json;
use talentmatch::{
    CompilerConfig, InMemoryStore, QueryCompiler, ResultDecoder, RetrievalSession, SearchIntent,
    SessionConfig, StubEncoder, VectorEncoder,
};

const DIM: usize = 16;

fn compiler() -> QueryCompiler {
    QueryCompiler::new(CompilerConfig {
        dimension: DIM,
        ..Default::default()
    })
    .unwrap()
}

fn intent() -> SearchIntent {
    SearchIntent::new(vec![0.25; DIM])
        .with_secondary("skills_embedding", vec![-0.5; DIM], 3.0, 50)
        .with_secondary("work_experience_descriptions_embedding", vec![0.125; DIM], 2.0, 30)
        .with_exact_filter("work_experience_seniority", "Senior")
        .with_location_filter("contact_information_address", "Gulberg, Lahore, Pakistan")
        .with_score_threshold(0.5)
}

#[test]
fn compile_is_repeatable() {
    let compiler = compiler();
    let first = compiler.compile(&intent()).unwrap();
    for _ in 0..10 {
        let again = compiler.compile(&intent()).unwrap();
        assert_eq!(first, again);
        assert_eq!(first.to_solr_params(), again.to_solr_params());
    }
}

#[test]
fn decode_is_repeatable() {
    let raw = json!({
        "responseHeader": {"status": 0},
        "response": {"numFound": 3, "docs": [
            {"document_id": ["a"], "skills": ["Python"], "score": 3.0},
            {"document_id": "b", "skills": ["Python", "Go"], "score": 2.0},
            {"document_id": 7, "score": 1.0}
        ]}
    });
    let declared: Vec<String> = ["document_id", "skills", "score"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let decoder = ResultDecoder::default();
    let first = decoder.decode(&raw, &declared).unwrap();
    assert_eq!(first.len(), 3);
    for _ in 0..10 {
        assert_eq!(decoder.decode(&raw, &declared).unwrap(), first);
    }
    // Missing fields stay missing.
    assert!(first[2].field("skills").is_none());
    assert_eq!(first[2].document_id, "7");
}

#[tokio::test]
async fn session_outcomes_are_repeatable() {
    let docs = vec![
        json!({"document_id": "cv-1", "score": 4.0, "skills": ["Rust"]}),
        json!({"document_id": "cv-2", "score": 3.0, "skills": ["Go", "Rust"]}),
    ];
    let session = RetrievalSession::new(
        compiler(),
        ResultDecoder::default(),
        Arc::new(InMemoryStore::new().with_docs("cv_collection", docs)),
        SessionConfig {
            audit_dir: None,
            ..Default::default()
        },
    );

    let first = session.search(&intent(), &["cv_collection"]).await.unwrap();
    let second = session.search(&intent(), &["cv_collection"]).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn stub_embeddings_are_stable() {
    let encoder = StubEncoder::new(DIM);
    let a = encoder.embed("Senior Rust Engineer").await;
    let b = encoder.embed("Senior Rust Engineer").await;
    assert_eq!(a, b);
    assert_eq!(a.dim(), DIM);
    assert_ne!(a, encoder.embed("Junior Go Developer").await);
}
