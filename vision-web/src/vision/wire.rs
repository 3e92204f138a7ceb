//! JSON wire types for the Cloud Vision `images:annotate` REST method
//!
//! Only the fields this service reads or writes are modelled. Unknown
//! response fields are ignored.

use serde::{Deserialize, Serialize};
use vision_common::{LabelAnnotation, LocalizedObjectAnnotation, NormalizedVertex};

/// Detection feature requested for an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureType {
    LabelDetection,
    TextDetection,
    ObjectLocalization,
}

#[derive(Debug, Clone, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub feature_type: FeatureType,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSource {
    pub gcs_image_uri: String,
}

/// Image to annotate: base64 content or a Cloud Storage source
#[derive(Debug, Clone, Default, Serialize)]
pub struct Image {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ImageSource>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotateImageRequest {
    pub image: Image,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchAnnotateImagesRequest {
    pub requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAnnotateImagesResponse {
    #[serde(default)]
    pub responses: Vec<AnnotateImageResponse>,
}

/// Per-image result
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateImageResponse {
    #[serde(default)]
    pub label_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    pub text_annotations: Vec<EntityAnnotation>,
    pub full_text_annotation: Option<TextAnnotation>,
    #[serde(default)]
    pub localized_object_annotations: Vec<WireLocalizedObject>,
    pub error: Option<Status>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityAnnotation {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub score: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextAnnotation {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLocalizedObject {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub score: f32,
    pub bounding_poly: Option<BoundingPoly>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingPoly {
    #[serde(default)]
    pub normalized_vertices: Vec<WireVertex>,
}

/// Zero-valued coordinates are omitted by the API
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct WireVertex {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

/// google.rpc.Status
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// Envelope of a non-2xx response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorEnvelope {
    pub error: Status,
}

impl From<EntityAnnotation> for LabelAnnotation {
    fn from(entity: EntityAnnotation) -> Self {
        LabelAnnotation::new(entity.description, entity.score)
    }
}

impl From<WireLocalizedObject> for LocalizedObjectAnnotation {
    fn from(object: WireLocalizedObject) -> Self {
        let vertices = object
            .bounding_poly
            .map(|poly| {
                poly.normalized_vertices
                    .into_iter()
                    .map(|v| NormalizedVertex { x: v.x, y: v.y })
                    .collect()
            })
            .unwrap_or_default();

        LocalizedObjectAnnotation {
            name: object.name,
            score: object.score,
            vertices,
        }
    }
}

impl AnnotateImageResponse {
    /// Full text of the image, empty when no text was detected
    ///
    /// Falls back to the first text annotation, which carries the whole
    /// detected text block, when the full text annotation is absent.
    pub fn full_text(&self) -> String {
        match &self.full_text_annotation {
            Some(annotation) => annotation.text.clone(),
            None => self
                .text_annotations
                .first()
                .map(|a| a.description.clone())
                .unwrap_or_default(),
        }
    }
}
