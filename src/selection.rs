//! Resolves selected tree rows to the tracks underneath them.

use std::collections::HashSet;

use crate::track::TrackRef;
use crate::tree::{GroupTree, NodeId, NodeKind, NodePath};

/// Collects tracks for the selected rows in tree order, each track once.
///
/// Leaf rows contribute their own track; group rows contribute every leaf
/// below them. Selecting a group together with one of its descendants does
/// not count the descendant twice. Paths that no longer exist are skipped.
pub fn collect_selected_tracks(tree: &GroupTree, selected: &[NodePath]) -> Vec<TrackRef> {
    let mut found = Vec::new();
    let mut seen = HashSet::new();
    for path in selected {
        let Some(id) = tree.node_at(path) else {
            continue;
        };
        collect_below(tree, id, &mut seen, &mut found);
    }
    found
}

fn collect_below(
    tree: &GroupTree,
    id: NodeId,
    seen: &mut HashSet<String>,
    found: &mut Vec<TrackRef>,
) {
    if let NodeKind::Leaf { track } = &tree.node(id).kind {
        if seen.insert(track.location.clone()) {
            found.push(track.clone());
        }
        return;
    }
    for child in tree.children(id) {
        collect_below(tree, *child, seen, found);
    }
}

/// Drops tracks already present in the target playlist.
pub fn exclude_present(tracks: Vec<TrackRef>, existing_locations: &[String]) -> Vec<TrackRef> {
    let existing: HashSet<&str> = existing_locations.iter().map(String::as_str).collect();
    tracks
        .into_iter()
        .filter(|track| !existing.contains(track.location.as_str()))
        .collect()
}

/// Percent-encodes track locations for drag-and-drop, keeping `/` intact.
pub fn selection_uris(tracks: &[TrackRef]) -> Vec<String> {
    tracks
        .iter()
        .map(|track| {
            track
                .location
                .split('/')
                .map(|segment| urlencoding::encode(segment).into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect()
}
