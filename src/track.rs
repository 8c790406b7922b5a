//! Read-only track records consumed by the collection tree.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::field_order::Field;

/// Shared handle to a track; tree nodes and selections hold clones of it.
pub type TrackRef = Arc<Track>;

/// One collection record as returned by collection search.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Track {
    /// Stable location used for playlist queuing and drag-and-drop.
    pub location: String,
    /// Tag values keyed by lower-case field name.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Track {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            tags: BTreeMap::new(),
        }
    }

    /// Builder-style helper used when assembling records in memory.
    pub fn with_tag(mut self, field: Field, value: impl Into<String>) -> Self {
        self.tags.insert(field.as_str().to_string(), value.into());
        self
    }

    /// Field value, or an empty string when the tag is absent.
    pub fn field(&self, field: Field) -> &str {
        self.tags
            .get(field.as_str())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn into_ref(self) -> TrackRef {
        Arc::new(self)
    }
}
