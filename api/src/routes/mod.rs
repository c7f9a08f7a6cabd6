//! HTTP route entry point for `/api/...`.
//!
//! The biometric flow itself runs over `/ws`; the HTTP surface is limited to
//! the health probe used by uptime checks and deployments.

use axum::Router;

use crate::routes::health::health_routes;
use crate::state::AppState;

pub mod health;

/// Builds the complete application router for all HTTP endpoints.
pub fn routes() -> Router<AppState> {
    Router::new().nest("/health", health_routes())
}
