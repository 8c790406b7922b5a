//! Event-bus protocol shared by the collection tree and its host.
//!
//! The host UI, playlist component and collection-tree manager exchange these
//! payloads over one broadcast channel.

use crate::config::Config;
use crate::track::TrackRef;
use crate::tree::NodePath;

/// Top-level envelope for all bus traffic.
#[derive(Debug, Clone)]
pub enum Message {
    Collection(CollectionMessage),
    Playlist(PlaylistMessage),
    Config(ConfigMessage),
}

/// Collection-tree commands and notifications.
#[derive(Debug, Clone)]
pub enum CollectionMessage {
    /// Search entry text changed; restarts the debounce timer.
    KeywordEdited(String),
    /// Search entry activated; searches immediately.
    SubmitSearch(String),
    /// Field-order combo box changed.
    SelectOrder(usize),
    /// Explicit (re)load with a keyword and view index.
    Load {
        keyword: String,
        order_index: usize,
    },
    /// Debounce timer fired for the given ticket.
    KeywordDebounceElapsed {
        ticket: u64,
    },
    /// Resume the in-flight build with its next batch.
    ContinueBuild {
        generation: u64,
    },
    /// A freshly built tree replaced the visible one.
    TreePublished {
        generation: u64,
        leaf_count: usize,
        expand_hints: Vec<NodePath>,
    },
    /// Active view changed; hosts may persist the index.
    ActiveViewChanged(usize),
    /// Queue the selected rows onto the current playlist.
    AppendSelectionToPlaylist {
        selection: Vec<NodePath>,
        /// Locations already in the target playlist.
        existing_locations: Vec<String>,
    },
}

/// Playlist-domain requests emitted by the collection tree.
#[derive(Debug, Clone)]
pub enum PlaylistMessage {
    AppendTracks(Vec<TrackRef>),
}

/// Runtime configuration updates.
#[derive(Debug, Clone)]
pub enum ConfigMessage {
    ConfigChanged(Config),
}
