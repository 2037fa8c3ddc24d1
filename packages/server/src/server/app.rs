//! Application setup and liveness router.

use std::sync::Arc;

use axum::{extract::Extension, routing::get, Router};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use crate::domains::session::SessionController;
use crate::kernel::PipelineStats;
use crate::server::routes::{alive_handler, health_handler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub session: Arc<SessionController>,
    pub stats: Arc<PipelineStats>,
}

/// Build the Axum application router
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(alive_handler))
        .route("/health", get(health_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}
