//! # Vision Gateway Common Library
//!
//! Shared code for the vision gateway service:
//! - Annotation types returned by the image-analysis capability
//! - Label result set construction (ordered, duplicate-free)
//! - Configuration loading and resolution
//! - Common error type

pub mod annotations;
pub mod config;
pub mod error;
pub mod labels;

pub use annotations::{LocalizedObjectAnnotation, NormalizedVertex};
pub use error::{Error, Result};
pub use labels::{DuplicateLabel, LabelAnnotation, LabelResultSet};
