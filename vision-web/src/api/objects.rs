//! Object localization endpoint
//!
//! Only Cloud Storage references are accepted. Failures are returned to the
//! caller like every other endpoint.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;
use vision_common::LocalizedObjectAnnotation;

use super::{required, tracked, GcsQuery};
use crate::error::{ApiError, ApiResult};
use crate::vision::ImageRef;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LocalizeObjectsResponse {
    #[serde(rename = "gcsPath")]
    pub gcs_path: String,
    pub objects: Vec<LocalizedObjectAnnotation>,
}

/// GET /localizeObjects?gcsPath=gs://bucket/object
pub async fn localize_objects(
    State(state): State<AppState>,
    Query(query): Query<GcsQuery>,
) -> ApiResult<Json<LocalizeObjectsResponse>> {
    let result = objects_body(&state, &query).await;
    tracked(&state, "localizeObjects", result).await
}

async fn objects_body(
    state: &AppState,
    query: &GcsQuery,
) -> ApiResult<Json<LocalizeObjectsResponse>> {
    let gcs_path = required(&query.gcs_path, "gcsPath")?;
    let image = ImageRef::parse(gcs_path)?;
    if !image.is_gcs() {
        return Err(ApiError::BadRequest(format!(
            "gcsPath must be a gs://bucket/object reference, got {}",
            gcs_path
        )));
    }

    let objects = state.analyzer.localize_objects(&image).await?;
    tracing::info!(gcs_path = %gcs_path, objects = objects.len(), "Objects localized");

    Ok(Json(LocalizeObjectsResponse {
        gcs_path: gcs_path.to_string(),
        objects,
    }))
}
