//! Persistent collection-tree configuration model and defaults.

use crate::field_order::field_order_count;
use crate::scheduler::DEFAULT_BATCH_SIZE;

/// Root configuration persisted to `collection_tree.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// Collection tree preferences.
    pub collection: CollectionConfig,
}

/// Grouping and search preferences for the collection tree.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CollectionConfig {
    /// Index into the field-order catalogue shown at startup.
    #[serde(default)]
    pub active_view: usize,
    /// Insert alphabetic separators between top-level groups.
    #[serde(default = "default_true")]
    pub use_alphabet: bool,
    /// Records appended per scheduling quantum.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Quiet period after the last keystroke before searching.
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
    /// Placeholder shown for missing tag values.
    #[serde(default = "default_unknown_label")]
    pub unknown_label: String,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            active_view: 0,
            use_alphabet: true,
            batch_size: default_batch_size(),
            search_debounce_ms: default_search_debounce_ms(),
            unknown_label: default_unknown_label(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_search_debounce_ms() -> u64 {
    500
}

fn default_unknown_label() -> String {
    "Unknown".to_string()
}

/// Clamps loaded values into ranges the runtime can use.
pub fn sanitize_config(mut config: Config) -> Config {
    let collection = &mut config.collection;
    collection.batch_size = collection.batch_size.max(1);
    if collection.active_view >= field_order_count() {
        collection.active_view = 0;
    }
    if collection.unknown_label.trim().is_empty() {
        collection.unknown_label = default_unknown_label();
    }
    config
}
