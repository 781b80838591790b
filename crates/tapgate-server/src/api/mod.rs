//! HTTP API surface.

pub mod health;
pub mod scan;

use axum::Router;
use axum::routing::{get, post};

/// Build the API router.
pub fn router() -> Router {
    Router::new()
        .route("/api/scan", post(scan::scan))
        .route("/api/health", get(health::health))
}
