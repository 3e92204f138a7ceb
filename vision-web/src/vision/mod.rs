//! Image-analysis capability
//!
//! [`ImageAnalyzer`] is the seam between the HTTP handlers and the external
//! vision service. [`CloudVisionClient`] is the production implementation.

use async_trait::async_trait;
use thiserror::Error;
use vision_common::{LabelAnnotation, LocalizedObjectAnnotation};

pub mod batch;
pub mod client;
pub mod image_source;
pub mod wire;

pub use batch::BatchSession;
pub use client::CloudVisionClient;
pub use image_source::{ImageLoader, ImagePayload, ImageRef, ImageSourceError};

/// Vision client errors
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Vision API key not configured")]
    MissingApiKey,

    #[error(transparent)]
    Image(#[from] ImageSourceError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Vision API error {code}: {message}")]
    Api { code: i32, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Vision API returned no response for the image")]
    EmptyResponse,

    #[error("Batch annotator is shut down")]
    Closed,
}

/// Operations offered by the external image-analysis service
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    /// Labels with confidence scores, in the order the service returned them
    async fn analyze_labels(&self, image: &ImageRef) -> Result<Vec<LabelAnnotation>, VisionError>;

    /// All text detected in the image; empty when there is none
    async fn extract_text(&self, image: &ImageRef) -> Result<String, VisionError>;

    /// Detected objects with normalized bounding polygons
    async fn localize_objects(
        &self,
        image: &ImageRef,
    ) -> Result<Vec<LocalizedObjectAnnotation>, VisionError>;
}
