//! Grouping tree builder.
//!
//! A [`GroupingPass`] turns an ordered track sequence into nested group nodes
//! under one parent. The pass keeps its group-key index, separator state and
//! deferred list between batches, so feeding the sequence in slices produces
//! the same tree as feeding it at once.

use std::collections::{HashMap, HashSet};

use crate::field_order::{Field, FieldOrder};
use crate::separator::SeparatorPolicy;
use crate::track::TrackRef;
use crate::tree::{GroupTree, NodeId, NodeKind, NodePath};

/// Settings shared by every pass of one build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    /// Insert alphabetic separators between top-level groups.
    pub use_alphabet: bool,
    /// Placeholder for missing field values.
    pub unknown_label: String,
    /// Active search keyword; matching branches are recorded for expansion.
    pub keyword: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            use_alphabet: true,
            unknown_label: "Unknown".to_string(),
            keyword: String::new(),
        }
    }
}

/// Lower-cased field values from the outermost level down to the current one.
type GroupKey = Vec<String>;

pub struct GroupingPass {
    grouping_fields: Vec<Field>,
    flat: bool,
    parent: NodeId,
    include_unknown: bool,
    unknown_label: String,
    keyword: String,
    separators: SeparatorPolicy,
    group_index: Vec<HashMap<GroupKey, NodeId>>,
    placed_leaves: HashSet<(NodeId, String)>,
    deferred: Vec<TrackRef>,
}

impl GroupingPass {
    /// Starts a pass appending under `parent`. Separators are only produced
    /// when `parent` is the tree root.
    pub fn new(
        tree: &GroupTree,
        parent: NodeId,
        order: &FieldOrder,
        include_unknown: bool,
        options: &BuildOptions,
    ) -> Self {
        let grouping_fields = order.grouping_fields();
        let flat = order.is_flat();
        let separators_enabled = options.use_alphabet && !flat && parent == tree.root();
        Self {
            group_index: vec![HashMap::new(); grouping_fields.len()],
            grouping_fields,
            flat,
            parent,
            include_unknown,
            unknown_label: options.unknown_label.clone(),
            keyword: options.keyword.trim().to_lowercase(),
            separators: SeparatorPolicy::new(separators_enabled),
            placed_leaves: HashSet::new(),
            deferred: Vec::new(),
        }
    }

    pub fn include_unknown(&self) -> bool {
        self.include_unknown
    }

    /// Appends one slice of the input. Parents of keyword matches are pushed
    /// onto `expand_hints`.
    pub fn append_batch(
        &mut self,
        tree: &mut GroupTree,
        tracks: &[TrackRef],
        expand_hints: &mut Vec<NodeId>,
    ) {
        for track in tracks {
            if self.flat {
                place_leaf(&mut self.placed_leaves, tree, self.parent, track);
            } else {
                self.append_track(tree, track, expand_hints);
            }
        }
    }

    /// Hands back the tracks whose outermost field was empty so far.
    pub fn take_deferred(&mut self) -> Vec<TrackRef> {
        std::mem::take(&mut self.deferred)
    }

    fn append_track(
        &mut self,
        tree: &mut GroupTree,
        track: &TrackRef,
        expand_hints: &mut Vec<NodeId>,
    ) {
        let mut parent = self.parent;
        let mut last_parent: Option<NodeId> = None;
        let mut key: GroupKey = Vec::with_capacity(self.grouping_fields.len());

        for level in 0..self.grouping_fields.len() {
            let field = self.grouping_fields[level];
            let raw = track.field(field);
            if raw.is_empty() && level == 0 && !self.include_unknown {
                self.deferred.push(track.clone());
                return;
            }
            let value = if raw.is_empty() {
                self.unknown_label.as_str()
            } else {
                raw
            };

            if field == Field::Title {
                place_leaf(&mut self.placed_leaves, tree, parent, track);
            } else {
                key.push(value.to_lowercase());
                parent = match self.group_index[level].get(&key) {
                    Some(existing) => *existing,
                    None => {
                        if level == 0 && self.separators.observe(field, raw) {
                            tree.append(self.parent, NodeKind::Separator);
                        }
                        let created = tree.append(
                            parent,
                            NodeKind::Group {
                                field,
                                track: track.clone(),
                            },
                        );
                        self.group_index[level].insert(key.clone(), created);
                        created
                    }
                };
            }

            if let Some(above) = last_parent {
                if !self.keyword.is_empty() && value.to_lowercase().contains(&self.keyword) {
                    expand_hints.push(above);
                }
            }
            last_parent = Some(parent);
        }
    }
}

/// Leaves are never merged, but one track lands at most once per parent.
fn place_leaf(
    placed: &mut HashSet<(NodeId, String)>,
    tree: &mut GroupTree,
    parent: NodeId,
    track: &TrackRef,
) {
    if placed.insert((parent, track.location.clone())) {
        tree.append(
            parent,
            NodeKind::Leaf {
                track: track.clone(),
            },
        );
    }
}

/// Converts recorded hint nodes to paths, keeping first-seen order.
pub fn hint_paths(tree: &GroupTree, hints: &[NodeId]) -> Vec<NodePath> {
    let mut seen = HashSet::new();
    hints
        .iter()
        .filter(|id| seen.insert(**id))
        .map(|id| tree.path_of(*id))
        .collect()
}

/// Builds a complete tree in one go: the main pass, then the deferred
/// unknown pass appended at the end of the root.
pub fn build_tree(
    tracks: &[TrackRef],
    order: &FieldOrder,
    options: &BuildOptions,
) -> (GroupTree, Vec<NodePath>) {
    let mut tree = GroupTree::new();
    let mut hints = Vec::new();
    let root = tree.root();

    let mut pass = GroupingPass::new(&tree, root, order, false, options);
    pass.append_batch(&mut tree, tracks, &mut hints);
    let deferred = pass.take_deferred();

    if !deferred.is_empty() {
        let mut unknown_pass = GroupingPass::new(&tree, root, order, true, options);
        unknown_pass.append_batch(&mut tree, &deferred, &mut hints);
    }

    let paths = hint_paths(&tree, &hints);
    (tree, paths)
}
