//! Collection search seam consumed by the collection tree.
//!
//! Storage and indexing live outside this crate. The tree only needs an
//! ordered track list per keyword and field order, which [`CollectionSearch`]
//! provides. [`MemoryCollection`] serves a fixed in-process list.

use std::cmp::Ordering;

use crate::field_order::{Field, FieldOrder};
use crate::track::TrackRef;

const SEARCHABLE_FIELDS: [Field; 5] = [
    Field::Artist,
    Field::Album,
    Field::Title,
    Field::Genre,
    Field::Date,
];

/// Source of track sequences already sorted consistently with an order.
pub trait CollectionSearch: Send {
    fn search(&self, keyword: &str, order: &FieldOrder) -> Vec<TrackRef>;
}

/// Collection held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCollection {
    tracks: Vec<TrackRef>,
}

impl MemoryCollection {
    pub fn new(tracks: Vec<TrackRef>) -> Self {
        Self { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    fn matches(track: &TrackRef, keyword: &str) -> bool {
        keyword.is_empty()
            || SEARCHABLE_FIELDS
                .iter()
                .any(|field| track.field(*field).to_lowercase().contains(keyword))
    }

    fn compare_field(left: &TrackRef, right: &TrackRef, field: Field) -> Ordering {
        if field == Field::TrackNumber {
            return track_number(left.field(field)).cmp(&track_number(right.field(field)));
        }
        left.field(field)
            .to_lowercase()
            .cmp(&right.field(field).to_lowercase())
    }
}

/// Leading numeric part of a track number tag such as `3/12`.
fn track_number(value: &str) -> u32 {
    value
        .trim()
        .split('/')
        .next()
        .and_then(|number| number.trim().parse().ok())
        .unwrap_or(0)
}

impl CollectionSearch for MemoryCollection {
    fn search(&self, keyword: &str, order: &FieldOrder) -> Vec<TrackRef> {
        let keyword = keyword.trim().to_lowercase();
        let mut found: Vec<TrackRef> = self
            .tracks
            .iter()
            .filter(|track| Self::matches(track, &keyword))
            .cloned()
            .collect();
        found.sort_by(|left, right| {
            order
                .fields()
                .iter()
                .fold(Ordering::Equal, |ordering, field| {
                    ordering.then_with(|| Self::compare_field(left, right, *field))
                })
                .then_with(|| left.location.cmp(&right.location))
        });
        found
    }
}
