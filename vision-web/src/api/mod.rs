//! HTTP API handlers for vision-web

pub mod buildinfo;
pub mod health;
pub mod labels;
pub mod objects;
pub mod text;
pub mod ui;

pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use labels::{extract_labels, labels_json};
pub use objects::localize_objects;
pub use text::extract_text;
pub use ui::serve_index;

use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// `?imageUrl=` query parameter
#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
}

/// `?gcsPath=` query parameter
#[derive(Debug, Deserialize)]
pub struct GcsQuery {
    #[serde(rename = "gcsPath")]
    pub gcs_path: Option<String>,
}

/// Non-blank value of a required query parameter
fn required<'a>(value: &'a Option<String>, name: &str) -> ApiResult<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::BadRequest(format!(
            "Missing required query parameter '{}'",
            name
        ))),
    }
}

/// Log and remember a handler failure before it becomes a response
async fn tracked<T>(state: &AppState, operation: &str, result: ApiResult<T>) -> ApiResult<T> {
    if let Err(err) = &result {
        tracing::error!(operation = operation, error = %err, "Request failed");
        state.record_error(err).await;
    }
    result
}
