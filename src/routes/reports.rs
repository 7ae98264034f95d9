//! Report generation endpoint.

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
use crate::domain::{PriorAnalysis, Report};
use crate::error::ApiResult;
use crate::middleware::RequestIdExt;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportRequest {
    #[serde(default, alias = "documentData")]
    pub prior_analysis: Option<PriorAnalysis>,
    #[serde(default, alias = "reportType")]
    pub audience: Option<String>,
    #[serde(default)]
    pub subject_name: Option<String>,
    #[serde(default)]
    pub patient_info: Option<PatientInfo>,
}

#[derive(Debug, Deserialize)]
pub struct PatientInfo {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateReportResponse {
    pub report: Report,
}

/// Generate a clinical or patient report from a prior analysis.
///
/// POST /api/generate-report
pub async fn generate_report(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateReportRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    tracing::debug!(request_id = headers.request_id(), "Generate report request");

    let subject_name = req
        .subject_name
        .or_else(|| req.patient_info.and_then(|p| p.name));

    let report = state
        .pipeline
        .generate_report(req.prior_analysis, req.audience.as_deref(), subject_name)
        .await?;

    Ok(Success::new(GenerateReportResponse { report }))
}
