//! Banker Server
//!
//! HTTP front end for `banker-service`. Every body and response is JSON;
//! errors come back as `{"error": "..."}`. Invalid ledger input is a 400,
//! an unreadable body keeps axum's rejection status (400, 413, 415 or 422),
//! unknown sessions are 404 and ledger contract violations are 500.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod sessions;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use error::ApiError;
pub use sessions::SessionRegistry;

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            sessions: SessionRegistry::new(config.max_sessions),
            config: Arc::new(config),
        }
    }
}

/// Build the router with tracing and CORS layers applied.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/deadlock/bankers", post(routes::bankers))
        .route("/deadlock/request", post(routes::request))
        .route("/deadlock/detect", post(routes::detect))
        .route("/resource_allocation/allocate", post(routes::allocate))
        .route("/resource_allocation/release", post(routes::release))
        .route("/resource_allocation/starvation", post(routes::starvation))
        .route("/sessions", post(routes::create_session))
        .route(
            "/sessions/{id}",
            get(routes::show_session).delete(routes::delete_session),
        )
        .route("/sessions/{id}/safety", get(routes::session_safety))
        .route("/sessions/{id}/detect", get(routes::session_detect))
        .route("/sessions/{id}/starvation", get(routes::session_starvation))
        .route("/sessions/{id}/request", post(routes::session_request))
        .route("/sessions/{id}/release", post(routes::session_release))
        .route("/sessions/{id}/allocate", post(routes::session_allocate))
        .route("/sessions/{id}/retire", post(routes::session_retire))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
