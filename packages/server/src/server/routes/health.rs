use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::common::SessionState;
use crate::kernel::StatsSnapshot;
use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    session: SessionState,
    database: DatabaseHealth,
    pipeline: StatsSnapshot,
}

#[derive(Serialize)]
pub struct DatabaseHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Plain liveness probe for hosting platforms.
pub async fn alive_handler() -> &'static str {
    "Relay is alive"
}

/// Health check endpoint
///
/// Reports session state, dedup store reachability and pipeline counters.
/// Always 200: the process is alive even while the portal or store is not.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let database = match tokio::time::timeout(
        std::time::Duration::from_secs(5),
        sqlx::query("SELECT 1").execute(&state.db_pool),
    )
    .await
    {
        Ok(Ok(_)) => DatabaseHealth {
            status: "ok".to_string(),
            error: None,
        },
        Ok(Err(e)) => DatabaseHealth {
            status: "error".to_string(),
            error: Some(format!("Query failed: {}", e)),
        },
        Err(_) => DatabaseHealth {
            status: "error".to_string(),
            error: Some("Query timeout (>5s)".to_string()),
        },
    };

    let session = state.session.state();
    let status = if database.status == "ok" && session == SessionState::Authenticated {
        "ok"
    } else {
        "degraded"
    };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: status.to_string(),
            session,
            database,
            pipeline: state.stats.snapshot(),
        }),
    )
}
