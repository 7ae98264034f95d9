use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: ServiceHealth,
}

#[derive(Serialize)]
pub struct ServiceHealth {
    pub inference: String,
}

/// Health check endpoint. The service stays up when the provider is not;
/// that is reported as "degraded".
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let inference = state.pipeline.health_check().await;

    if let Err(e) = &inference {
        tracing::warn!(error = %e, "Inference provider health check failed");
    }

    let (status, inference_status) = match inference {
        Ok(()) => ("healthy", "ok"),
        Err(_) => ("degraded", "error"),
    };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            services: ServiceHealth {
                inference: inference_status.to_string(),
            },
        }),
    )
}
