use std::sync::Arc;

use serde_json::json;
use talentmatch::{
    build_stack_with, FieldValue, FilterPredicate, InMemoryStore, JobProfile, QueryCompiler,
    CompilerConfig, ResultDecoder, RetrievalSession, SearchIntent, SessionConfig, StubEncoder,
    TalentConfig, TextMatch,
};

const DIM: usize = 50;

fn ramp(start: f32) -> Vec<f32> {
    (0..DIM).map(|i| start + i as f32 * 0.01).collect()
}

fn scenario_intent() -> SearchIntent {
    SearchIntent::new(ramp(0.1))
        .with_secondary("skills", ramp(0.3), 3.0, 50)
        .with_exact_filter("seniority", "senior")
        .with_location_filter("location", "Lahore, Pakistan")
        .with_result_fields(["document_id", "skills", "score"])
        .with_page_size(20)
}

fn compiler() -> QueryCompiler {
    QueryCompiler::new(CompilerConfig {
        dimension: DIM,
        ..Default::default()
    })
    .expect("valid compiler config")
}

#[tokio::test]
async fn two_collections_one_empty() {
    let audit = tempfile::tempdir().unwrap();
    let store = Arc::new(
        InMemoryStore::new()
            .with_docs(
                "cv_collection",
                vec![
                    json!({"document_id": ["cv-17"], "skills": ["Python"], "score": 7.5, "location": ["Lahore"]}),
                    json!({"document_id": "cv-4", "skills": ["Python", "Go"], "score": 6.25}),
                ],
            )
            .with_docs("profile_collection", vec![]),
    );
    let session = RetrievalSession::new(
        compiler(),
        ResultDecoder::default(),
        store.clone(),
        SessionConfig {
            audit_dir: Some(audit.path().to_path_buf()),
            ..Default::default()
        },
    );

    let outcome = session
        .search(&scenario_intent(), &["cv_collection", "profile_collection"])
        .await
        .expect("search succeeds");

    assert!(outcome.is_complete());
    assert!(outcome.warnings.is_empty());

    let cv = outcome.hits("cv_collection").unwrap();
    assert_eq!(cv.len(), 2);
    assert_eq!(cv[0].document_id, "cv-17");
    assert_eq!(cv[0].field("skills"), Some(&FieldValue::Single(json!("Python"))));
    // `location` was not requested.
    assert!(cv[0].field("location").is_none());
    assert_eq!(
        cv[1].field("skills"),
        Some(&FieldValue::Multi(vec![json!("Python"), json!("Go")]))
    );
    assert_eq!(outcome.hits("profile_collection"), Some(&[][..]));

    // Both collections received the same compiled query.
    let calls = store.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].params, calls[1].params);

    let fq: Vec<&str> = calls[0]
        .params
        .iter()
        .filter(|(k, _)| k == "fq")
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(fq, vec!["seniority:\"senior\"", "(location:*Lahore*)"]);
    assert!(calls[0].params.iter().all(|(_, v)| !v.contains("Pakistan")));

    let mut audited: Vec<String> = std::fs::read_dir(audit.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    audited.sort();
    assert_eq!(audited.len(), 2);
    assert!(audited[0].starts_with("query_cv_collection_"));
    assert!(audited[1].starts_with("query_profile_collection_"));
}

#[test]
fn scenario_compiles_to_weighted_terms_and_single_location_token() {
    let compiled = compiler().compile(&scenario_intent()).unwrap();

    let terms = compiled.terms();
    assert_eq!(terms.len(), 2);
    assert_eq!(terms[1].field, "skills");
    assert!(terms[0].boost > terms[1].boost);

    let location = compiled
        .filters()
        .iter()
        .find_map(|f| match f {
            FilterPredicate::AnyOf { field, matches } if field == "location" => Some(matches),
            _ => None,
        })
        .expect("location filter");
    assert_eq!(
        location,
        &vec![TextMatch::Substring {
            token: "Lahore".into()
        }]
    );
    assert_eq!(compiled.page_size(), 20);
}

#[tokio::test]
async fn profile_search_through_configured_stack() {
    let mut cfg = TalentConfig::default();
    cfg.compiler.dimension = DIM;
    cfg.encoder.dimension = DIM;
    cfg.session.audit_dir = None;

    let store = Arc::new(InMemoryStore::new().with_docs(
        "cv_collection",
        vec![json!({"document_id": "cv-1", "score": 3.0, "skills": ["Rust"]})],
    ));
    let stack = build_stack_with(&cfg, store.clone(), Arc::new(StubEncoder::new(DIM))).unwrap();

    let profile = JobProfile {
        title: "Senior Rust Engineer".into(),
        skills: "Rust, Tokio, Solr".into(),
        location: "Lahore, Punjab".into(),
        seniority: "senior".into(),
        ..Default::default()
    };
    let intent = stack.profiles.build(&profile).await.unwrap();
    let outcome = stack
        .session
        .search(&intent, &["cv_collection"])
        .await
        .unwrap();

    assert_eq!(outcome.hits("cv_collection").unwrap()[0].document_id, "cv-1");

    let params = &store.calls()[0].params;
    let value = |key: &str| {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap()
    };
    assert!(value("v0").starts_with("{!knn f=work_experience_job_titles_embedding topK=50}["));
    assert!(value("v1").starts_with("{!knn f=skills_embedding topK=50}["));
    // Blank description contributes no term.
    assert!(params.iter().all(|(k, _)| k != "v2"));
    assert!(params
        .iter()
        .any(|(k, v)| k == "fq" && v == "work_experience_seniority:\"senior\""));
}

#[tokio::test]
async fn narrow_projection_still_ranks_by_configured_id() {
    let mut cfg = TalentConfig::default();
    cfg.compiler.dimension = DIM;
    cfg.compiler.id_field = "id".into();
    cfg.encoder.dimension = DIM;
    cfg.session.audit_dir = None;

    let store = Arc::new(InMemoryStore::new().with_docs(
        "cv_collection",
        vec![
            json!({"id": "cv-9", "score": 5.0, "skills": ["Go"]}),
            json!({"id": "cv-3", "score": 4.0, "skills": ["Rust"]}),
        ],
    ));
    let stack = build_stack_with(&cfg, store.clone(), Arc::new(StubEncoder::new(DIM))).unwrap();

    let intent = SearchIntent::new(ramp(0.2)).with_result_fields(["skills"]);
    let outcome = stack
        .session
        .search(&intent, &["cv_collection"])
        .await
        .unwrap();

    let hits = outcome.hits("cv_collection").unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].document_id, "cv-9");
    assert_eq!(hits[0].score, 5.0);
    assert!(outcome.warnings.is_empty());

    let fl = store.calls()[0]
        .params
        .iter()
        .find(|(k, _)| k == "fl")
        .map(|(_, v)| v.clone());
    assert_eq!(fl.as_deref(), Some("skills,id,score"));
}
