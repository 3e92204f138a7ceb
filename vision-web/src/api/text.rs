//! Text extraction endpoint

use axum::extract::{Query, State};

use super::{required, tracked, ImageQuery};
use crate::error::ApiResult;
use crate::vision::ImageRef;
use crate::AppState;

/// GET /extractText?imageUrl=...
///
/// Returns `text/plain`: "Text from image: <text>"
pub async fn extract_text(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
) -> ApiResult<String> {
    let result = text_body(&state, &query).await;
    tracked(&state, "extractText", result).await
}

async fn text_body(state: &AppState, query: &ImageQuery) -> ApiResult<String> {
    let image_url = required(&query.image_url, "imageUrl")?;
    let image = ImageRef::parse(image_url)?;
    let text = state.analyzer.extract_text(&image).await?;

    tracing::info!(image_url = %image_url, chars = text.chars().count(), "Text extracted");
    Ok(format!("Text from image: {}", text))
}
