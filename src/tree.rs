//! Arena-backed grouping tree.
//!
//! Nodes are addressed by [`NodeId`] and only ever appended, so a node's
//! [`NodePath`] (child positions from the root) never changes once created.

use crate::field_order::{Field, Glyph};
use crate::track::TrackRef;

/// Index of a node inside one [`GroupTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Child positions from the root down to a node. The root itself is `[]`.
pub type NodePath = Vec<usize>;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Root,
    /// Alphabetic section break between top-level groups.
    Separator,
    /// Intermediate grouping value; `track` only supplies display metadata.
    Group { field: Field, track: TrackRef },
    Leaf { track: TrackRef },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub kind: NodeKind,
    parent: Option<NodeId>,
    /// Index within the parent's children, fixed at append.
    position: usize,
    children: Vec<NodeId>,
}

impl TreeNode {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_separator(&self) -> bool {
        matches!(self.kind, NodeKind::Separator)
    }

    /// Field that produced this node, if any.
    pub fn field(&self) -> Option<Field> {
        match self.kind {
            NodeKind::Group { field, .. } => Some(field),
            NodeKind::Leaf { .. } => Some(Field::Title),
            NodeKind::Root | NodeKind::Separator => None,
        }
    }

    pub fn track(&self) -> Option<&TrackRef> {
        match &self.kind {
            NodeKind::Group { track, .. } | NodeKind::Leaf { track } => Some(track),
            NodeKind::Root | NodeKind::Separator => None,
        }
    }

    pub fn glyph(&self) -> Option<Glyph> {
        self.field().map(Field::glyph)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupTree {
    nodes: Vec<TreeNode>,
}

impl Default for GroupTree {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![TreeNode {
                kind: NodeKind::Root,
                parent: None,
                position: 0,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Total node count, root excluded.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        let position = self.nodes[parent.0].children.len();
        self.nodes.push(TreeNode {
            kind,
            parent: Some(parent),
            position,
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn path_of(&self, id: NodeId) -> NodePath {
        let mut path = Vec::new();
        let mut current = self.node(id);
        while let Some(parent) = current.parent() {
            path.push(current.position());
            current = self.node(parent);
        }
        path.reverse();
        path
    }

    pub fn node_at(&self, path: &[usize]) -> Option<NodeId> {
        let mut current = self.root();
        for position in path {
            current = *self.nodes[current.0].children.get(*position)?;
        }
        Some(current)
    }

    /// Text shown for a row; `None` for the root and separators.
    pub fn label(&self, id: NodeId, unknown_label: &str) -> Option<String> {
        let node = self.node(id);
        let field = node.field()?;
        let track = node.track()?;
        let value = track.field(field);
        if value.is_empty() {
            Some(unknown_label.to_string())
        } else {
            Some(value.to_string())
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node.kind, NodeKind::Leaf { .. }))
            .count()
    }

    /// Indented text rendering, one row per node; separators render as `---`.
    pub fn outline(&self, unknown_label: &str) -> Vec<String> {
        let mut lines = Vec::new();
        let mut pending: Vec<(NodeId, usize)> = self
            .children(self.root())
            .iter()
            .rev()
            .map(|child| (*child, 0))
            .collect();
        while let Some((id, depth)) = pending.pop() {
            let text = self
                .label(id, unknown_label)
                .unwrap_or_else(|| "---".to_string());
            lines.push(format!("{}{}", "  ".repeat(depth), text));
            for child in self.children(id).iter().rev() {
                pending.push((*child, depth + 1));
            }
        }
        lines
    }
}
