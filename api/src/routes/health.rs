use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use chrono::Utc;
use serde_json::json;

use crate::response::ApiResponse;
use crate::state::AppState;

/// Builds the `/health` route group.
///
/// This includes a single `GET /health` endpoint reporting API liveness and
/// database reachability. Useful for uptime checks, load balancers, or
/// deployment health monitoring.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

/// GET /health
///
/// ### Response
/// - `200 OK`
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "status": "healthy",
///     "database": true,
///     "timestamp": "2026-08-25T12:00:00Z"
///   },
///   "message": "Health check passed"
/// }
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database_ok = state.db().ping().await.is_ok();
    let status = if database_ok { "healthy" } else { "unhealthy" };

    let payload = json!({
        "status": status,
        "database": database_ok,
        "timestamp": Utc::now().to_rfc3339(),
    });

    let message = if database_ok {
        "Health check passed"
    } else {
        "Database unreachable"
    };

    Json(ApiResponse::success(payload, message))
}
