//! Application state shared across Axum route handlers and sessions.
//!
//! Holds the database connection plus the recognition collaborators. The
//! matcher and detector are resolved once at startup and injected here so
//! sessions never reach for hidden globals.

use sea_orm::DatabaseConnection;
use services::recognition::{FaceMatcher, GestureDetector};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    matcher: Arc<dyn FaceMatcher>,
    detector: Arc<dyn GestureDetector>,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        matcher: Arc<dyn FaceMatcher>,
        detector: Arc<dyn GestureDetector>,
    ) -> Self {
        Self {
            db,
            matcher,
            detector,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn matcher(&self) -> &dyn FaceMatcher {
        self.matcher.as_ref()
    }

    pub fn detector(&self) -> &dyn GestureDetector {
        self.detector.as_ref()
    }
}
