//! Label annotations and the ordered label result set
//!
//! A [`LabelResultSet`] is built once per request from the labels returned by
//! the image-analysis capability. Descriptions keep the order in which they
//! were received, and a repeated description is a hard error rather than an
//! overwrite.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// A (description, confidence) pair produced by label detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelAnnotation {
    /// Human-readable label, e.g. "Dog"
    pub description: String,
    /// Confidence score in 0.0..=1.0
    pub score: f32,
}

impl LabelAnnotation {
    pub fn new(description: impl Into<String>, score: f32) -> Self {
        Self {
            description: description.into(),
            score,
        }
    }
}

/// Raised when two annotations share a description
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Duplicate key {0}")]
pub struct DuplicateLabel(pub String);

/// Insertion-ordered mapping from label description to score
///
/// Serializes as a JSON object whose keys appear in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelResultSet {
    entries: Vec<(String, f32)>,
    index: HashMap<String, usize>,
}

impl LabelResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a result set from annotations in the order received
    ///
    /// Fails on the first description that has already been inserted.
    pub fn from_annotations<I>(annotations: I) -> Result<Self, DuplicateLabel>
    where
        I: IntoIterator<Item = LabelAnnotation>,
    {
        let iter = annotations.into_iter();
        let mut set = Self {
            entries: Vec::with_capacity(iter.size_hint().0),
            index: HashMap::with_capacity(iter.size_hint().0),
        };

        for annotation in iter {
            set.insert(annotation.description, annotation.score)?;
        }

        Ok(set)
    }

    /// Append a description/score pair
    ///
    /// The set is left unchanged when the description is already present.
    pub fn insert(&mut self, description: String, score: f32) -> Result<(), DuplicateLabel> {
        if self.index.contains_key(&description) {
            return Err(DuplicateLabel(description));
        }

        self.index.insert(description.clone(), self.entries.len());
        self.entries.push((description, score));
        Ok(())
    }

    pub fn get(&self, description: &str) -> Option<f32> {
        self.index.get(description).map(|&i| self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> + '_ {
        self.entries.iter().map(|(d, s)| (d.as_str(), *s))
    }

    /// Descriptions in insertion order
    pub fn descriptions(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(d, _)| d.as_str())
    }
}

impl Serialize for LabelResultSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (description, score) in &self.entries {
            map.serialize_entry(description, score)?;
        }
        map.end()
    }
}
