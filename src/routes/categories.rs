use axum::{extract::rejection::JsonRejection, response::IntoResponse, Json};
use serde::Deserialize;

use crate::api::Success;
use crate::domain::categorize;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizeRequest {
    #[serde(default, alias = "fileName")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Suggest a source kind and category for an upload.
///
/// POST /api/categorize
pub async fn categorize_upload(
    payload: Result<Json<CategorizeRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let name = req
        .display_name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("displayName is required".to_string()))?;

    Ok(Success::new(categorize(&name, req.mime_type.as_deref())))
}
