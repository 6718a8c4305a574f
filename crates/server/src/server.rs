//! Server initialization and routing
//!
//! Public routes (`/`, `/health`, `/ready`) need no key. Everything under
//! `/api/v1` goes through [`api_key_auth`].

use crate::config::ServerConfig;
use crate::middleware::{api_key_auth, request_context};
use crate::routes::{api_info, collections, health, not_found, search};
use crate::state::ServerState;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post};
use axum::Router;
use retrieval::{ProfileIntentBuilder, RetrievalSession};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: Arc<ServerState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let public_routes = Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check));

    let protected_routes = Router::new()
        .route("/api/v1/search", post(search::search))
        .route("/api/v1/search/profile", post(search::search_profile))
        .route(
            "/api/v1/collections/{name}",
            delete(collections::clear_collection),
        )
        .layer(DefaultBodyLimit::max(state.config.max_body_size()))
        .layer(from_fn_with_state(state.clone(), api_key_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.timeout(),
        ))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(from_fn(request_context))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the talentmatch HTTP server.
///
/// Blocks until SIGTERM or Ctrl+C. A global tracing subscriber is installed
/// unless the caller already set one.
pub async fn start_server(
    config: ServerConfig,
    session: Arc<RetrievalSession>,
    profiles: Arc<ProfileIntentBuilder>,
) -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json()
        .try_init();

    let addr: SocketAddr = config.socket_addr()?;
    let state = Arc::new(ServerState::new(config.clone(), session, profiles));
    let app = build_router(state);

    tracing::info!(
        "Starting talentmatch server on {} with {} API keys",
        addr,
        config.api_keys.len()
    );
    tracing::info!(
        "Timeout: {}s (search budget {}ms), Max body: {}MB",
        config.timeout_secs,
        config.search_budget().as_millis(),
        config.max_body_size_mb
    );
    tracing::info!(
        "Rate limit: {} requests/minute, CORS: {}",
        config.rate_limit_per_minute,
        config.enable_cors
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
