//! Analyze endpoints.
//!
//! `/api/analyze` takes the unified request shape; the two legacy routes
//! accept the field names the web front end has always sent.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::Success;
use crate::app::AppState;
use crate::domain::{AnalysisResult, AnalyzeInput, SourceKind};
use crate::error::ApiResult;
use crate::middleware::RequestIdExt;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeDocumentRequest {
    #[serde(default)]
    pub document_text: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeImageRequest {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeImageResponse {
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub image_type: String,
}

/// Analyze a document or image.
///
/// POST /api/analyze
pub async fn analyze(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(input) = payload?;
    tracing::debug!(
        request_id = headers.request_id(),
        source_kind = input.source_kind.as_str(),
        "Analyze request"
    );

    let result = state.pipeline.analyze(input).await?;
    Ok(Success::new(result))
}

/// Analyze a text document.
///
/// POST /api/analyze-document
pub async fn analyze_document(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeDocumentRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    tracing::debug!(request_id = headers.request_id(), "Analyze document request");

    let result = state
        .pipeline
        .analyze(AnalyzeInput {
            source_kind: SourceKind::Document,
            category: req.document_type,
            content: req.document_text,
            display_name: req.file_name,
        })
        .await?;

    Ok(Success::new(result))
}

/// Analyze a medical image.
///
/// POST /api/analyze-image
pub async fn analyze_image(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeImageRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    tracing::debug!(request_id = headers.request_id(), "Analyze image request");

    let result = state
        .pipeline
        .analyze(AnalyzeInput {
            source_kind: SourceKind::Image,
            category: req.image_type,
            content: req.image_url,
            display_name: req.file_name,
        })
        .await?;

    let image_type = result.category.to_string();
    Ok(Success::new(AnalyzeImageResponse { result, image_type }))
}
