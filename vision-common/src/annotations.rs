//! Object localization annotation types

use serde::{Deserialize, Serialize};

/// Point of a bounding polygon, both coordinates in 0.0..=1.0 of the image size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedVertex {
    pub x: f32,
    pub y: f32,
}

/// A detected object with its confidence and normalized bounding polygon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizedObjectAnnotation {
    /// Object name, e.g. "Bicycle wheel"
    pub name: String,
    /// Confidence score in 0.0..=1.0
    pub score: f32,
    /// Bounding polygon vertices
    pub vertices: Vec<NormalizedVertex>,
}
