pub mod analysis;
pub mod categories;
pub mod health;
pub mod reports;

use axum::{routing::get, routing::post, Router};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        // Analysis
        .route("/api/analyze", post(analysis::analyze))
        .route("/api/analyze-document", post(analysis::analyze_document))
        .route("/api/analyze-image", post(analysis::analyze_image))
        // Reports
        .route("/api/generate-report", post(reports::generate_report))
        // Upload helpers
        .route("/api/categorize", post(categories::categorize_upload))
}
