//! talentmatch server: HTTP API over a [`RetrievalSession`](retrieval::RetrievalSession).
//!
//! - API key authentication with per-key rate limiting
//! - Compression, CORS, request IDs and structured request logs
//! - Searches bounded by a deadline slightly shorter than the request timeout,
//!   so slow collections come back as failures rather than a timed-out request
//!
//! # Endpoints
//!
//! Public: `GET /`, `GET /health`, `GET /ready` (pings the default collections).
//!
//! Protected:
//!
//! - `POST /api/v1/search` with `{"intent": {...}, "collections": [...]}`
//! - `POST /api/v1/search/profile` with `{"profile": {...}, "collections": [...]}`
//! - `DELETE /api/v1/collections/{name}`
//!
//! Searches answer with the [`SearchOutcome`](retrieval::SearchOutcome) as JSON;
//! a collection failing is reported inside it, not as an HTTP error.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
