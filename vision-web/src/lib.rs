//! vision-web library interface
//!
//! Exposes the router and application state for the binary and for
//! integration tests.

pub mod api;
pub mod error;
pub mod vision;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::vision::ImageAnalyzer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// External image-analysis capability
    pub analyzer: Arc<dyn ImageAnalyzer>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last handler error, reported by /health
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(analyzer: Arc<dyn ImageAnalyzer>) -> Self {
        Self {
            analyzer,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember a failure for diagnostics
    pub async fn record_error(&self, err: &ApiError) {
        *self.last_error.write().await = Some(err.to_string());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/", get(api::serve_index))
        .route("/extractLabels", get(api::extract_labels))
        .route("/api/labels", get(api::labels_json))
        .route("/extractText", get(api::extract_text))
        .route("/localizeObjects", get(api::localize_objects))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
