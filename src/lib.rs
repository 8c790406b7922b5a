//! Grouped collection tree for a media library.
//!
//! Tracks returned by a collection search are grouped into a tree by a
//! selectable field order, built incrementally on the event bus and published
//! atomically once complete.

pub mod collection_manager;
pub mod collection_search;
pub mod config;
pub mod field_order;
pub mod generation;
pub mod grouping;
pub mod protocol;
pub mod scheduler;
pub mod selection;
pub mod separator;
pub mod track;
pub mod tree;
