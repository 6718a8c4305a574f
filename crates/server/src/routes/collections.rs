use crate::error::ServerResult;
use crate::state::ServerState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

/// DELETE /api/v1/collections/{name}: remove every document and commit.
pub async fn clear_collection(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> ServerResult<impl IntoResponse> {
    state.session.store().delete_all(&name).await?;
    tracing::info!(collection = %name, "collection_cleared");

    Ok(Json(json!({
        "collection": name,
        "cleared": true,
    })))
}
