use crate::error::ServerResult;
use crate::middleware::RequestId;
use crate::state::ServerState;
use axum::extract::State;
use axum::{Extension, Json};
use query::SearchIntent;
use retrieval::{JobProfile, SearchOutcome};
use serde::Deserialize;
use std::sync::Arc;
use tokio::time::Instant;

/// Search by explicit intent.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub intent: SearchIntent,
    /// Empty means the session's default collections.
    #[serde(default)]
    pub collections: Vec<String>,
}

/// Search by job profile; the server embeds it first.
#[derive(Debug, Deserialize)]
pub struct ProfileSearchRequest {
    pub profile: JobProfile,
    #[serde(default)]
    pub collections: Vec<String>,
}

/// POST /api/v1/search
pub async fn search(
    State(state): State<Arc<ServerState>>,
    Extension(id): Extension<RequestId>,
    Json(request): Json<SearchRequest>,
) -> ServerResult<Json<SearchOutcome>> {
    run(&state, &id, &request.intent, &request.collections).await
}

/// POST /api/v1/search/profile
pub async fn search_profile(
    State(state): State<Arc<ServerState>>,
    Extension(id): Extension<RequestId>,
    Json(request): Json<ProfileSearchRequest>,
) -> ServerResult<Json<SearchOutcome>> {
    let intent = state.profiles.build(&request.profile).await?;
    run(&state, &id, &intent, &request.collections).await
}

async fn run(
    state: &ServerState,
    id: &RequestId,
    intent: &SearchIntent,
    collections: &[String],
) -> ServerResult<Json<SearchOutcome>> {
    let deadline = Instant::now() + state.config.search_budget();
    let outcome = state
        .session
        .search_with_deadline(intent, collections, deadline)
        .await?;

    let hits: usize = outcome.results.values().map(Vec::len).sum();
    if outcome.is_complete() {
        tracing::info!(request_id = %id.0, hits, warnings = outcome.warnings.len(), "search_served");
    } else {
        tracing::warn!(
            request_id = %id.0,
            hits,
            failed = ?outcome.failed_collections(),
            "search_partially_failed"
        );
    }

    Ok(Json(outcome))
}
