//! Label extraction endpoints
//!
//! GET /extractLabels?imageUrl=...  (HTML result view)
//! GET /api/labels?imageUrl=...     (JSON)

use axum::{
    extract::{Query, State},
    response::Html,
    Json,
};
use serde::Serialize;
use vision_common::LabelResultSet;

use super::{required, tracked, ImageQuery};
use crate::api::ui::render_result_page;
use crate::error::ApiResult;
use crate::vision::ImageRef;
use crate::AppState;

/// JSON label response; `annotations` keys keep detection order
#[derive(Debug, Serialize)]
pub struct LabelsResponse {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    pub annotations: LabelResultSet,
}

/// Run label detection and build the ordered result set
pub async fn detect_labels(state: &AppState, image_url: &str) -> ApiResult<LabelResultSet> {
    let image = ImageRef::parse(image_url)?;
    let labels = state.analyzer.analyze_labels(&image).await?;
    let annotations = LabelResultSet::from_annotations(labels)?;

    tracing::info!(
        image_url = %image_url,
        labels = annotations.len(),
        "Labels extracted"
    );
    Ok(annotations)
}

/// GET /extractLabels
pub async fn extract_labels(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
) -> ApiResult<Html<String>> {
    let result = labels_page(&state, &query).await;
    tracked(&state, "extractLabels", result).await
}

async fn labels_page(state: &AppState, query: &ImageQuery) -> ApiResult<Html<String>> {
    let image_url = required(&query.image_url, "imageUrl")?;
    let annotations = detect_labels(state, image_url).await?;
    Ok(Html(render_result_page(image_url, &annotations)))
}

/// GET /api/labels
pub async fn labels_json(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
) -> ApiResult<Json<LabelsResponse>> {
    let result = labels_body(&state, &query).await;
    tracked(&state, "labels", result).await
}

async fn labels_body(state: &AppState, query: &ImageQuery) -> ApiResult<Json<LabelsResponse>> {
    let image_url = required(&query.image_url, "imageUrl")?;
    let annotations = detect_labels(state, image_url).await?;
    Ok(Json(LabelsResponse {
        image_url: image_url.to_string(),
        annotations,
    }))
}
