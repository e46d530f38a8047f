// ABOUTME: Binary split tree of player slots, stored in an arena.
// ABOUTME: Supports splitting, merging, swapping, resizing and stable leaf traversal.

use slotmap::SlotMap;
use wall_core::PlayerSlot;

slotmap::new_key_type! {
    /// Handle to a leaf or split in a [`LayoutTree`]. Never reused once removed.
    pub struct NodeId;
}

pub const MIN_RATIO: f32 = 0.05;
pub const MAX_RATIO: f32 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Children side by side, first on the left
    Horizontal,
    /// Children stacked, first on top
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitInfo {
    pub orientation: Orientation,
    pub ratio: f32,
    pub first: NodeId,
    pub second: NodeId,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Leaf(PlayerSlot),
    Split(SplitInfo),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    kind: NodeKind,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LayoutError {
    #[error("No such target: {0:?}")]
    InvalidTarget(NodeId),

    #[error("Invalid split ratio: {0}")]
    InvalidRatio(f32),
}

#[derive(Debug, Clone)]
pub struct LayoutTree {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
}

/// Rectangle in normalized coordinates (0.0 to 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn full() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }

    fn divide(self, orientation: Orientation, ratio: f32) -> (Rect, Rect) {
        match orientation {
            Orientation::Horizontal => (
                Rect {
                    width: self.width * ratio,
                    ..self
                },
                Rect {
                    x: self.x + self.width * ratio,
                    width: self.width * (1.0 - ratio),
                    ..self
                },
            ),
            Orientation::Vertical => (
                Rect {
                    height: self.height * ratio,
                    ..self
                },
                Rect {
                    y: self.y + self.height * ratio,
                    height: self.height * (1.0 - ratio),
                    ..self
                },
            ),
        }
    }
}

/// Clamp a split ratio so both sides stay visible
pub fn clamp_ratio(ratio: f32) -> Result<f32, LayoutError> {
    if !ratio.is_finite() {
        return Err(LayoutError::InvalidRatio(ratio));
    }
    Ok(ratio.clamp(MIN_RATIO, MAX_RATIO))
}

impl LayoutTree {
    /// A wall with one empty player
    pub fn new() -> Self {
        Self::with_slot(PlayerSlot::new())
    }

    /// A wall with one player
    pub fn with_slot(slot: PlayerSlot) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node {
            parent: None,
            kind: NodeKind::Leaf(slot),
        });
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        matches!(
            self.nodes.get(id),
            Some(Node {
                kind: NodeKind::Leaf(_),
                ..
            })
        )
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn slot(&self, id: NodeId) -> Option<&PlayerSlot> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Leaf(slot) => Some(slot),
            NodeKind::Split(_) => None,
        }
    }

    pub fn slot_mut(&mut self, id: NodeId) -> Option<&mut PlayerSlot> {
        match &mut self.nodes.get_mut(id)?.kind {
            NodeKind::Leaf(slot) => Some(slot),
            NodeKind::Split(_) => None,
        }
    }

    pub fn split_info(&self, id: NodeId) -> Option<SplitInfo> {
        match self.nodes.get(id)?.kind {
            NodeKind::Split(info) => Some(info),
            NodeKind::Leaf(_) => None,
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|n| matches!(n.kind, NodeKind::Leaf(_)))
            .count()
    }

    pub fn split_count(&self) -> usize {
        self.nodes.len() - self.leaf_count()
    }

    /// Leftmost/topmost leaf under `id`
    pub fn first_leaf(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            match self.nodes.get(current)?.kind {
                NodeKind::Leaf(_) => return Some(current),
                NodeKind::Split(info) => current = info.first,
            }
        }
    }

    /// Leaf ids in traversal order
    pub fn leaves(&self) -> Vec<NodeId> {
        self.traverse_leaves().map(|(id, _)| id).collect()
    }

    /// Leaves in a stable order: first child before second, so left-to-right
    /// and top-to-bottom. Each call starts a fresh traversal.
    pub fn traverse_leaves(&self) -> Leaves<'_> {
        Leaves {
            tree: self,
            stack: vec![self.root],
        }
    }

    /// Every leaf with its normalized rectangle, in traversal order
    pub fn leaf_rects(&self) -> Vec<(NodeId, Rect)> {
        let mut out = Vec::new();
        let mut stack = vec![(self.root, Rect::full())];
        while let Some((id, rect)) = stack.pop() {
            match self.nodes[id].kind {
                NodeKind::Leaf(_) => out.push((id, rect)),
                NodeKind::Split(info) => {
                    let (first, second) = rect.divide(info.orientation, info.ratio);
                    stack.push((info.second, second));
                    stack.push((info.first, first));
                }
            }
        }
        out
    }

    /// Replace a leaf with a split holding two fresh leaves.
    ///
    /// Both new leaves copy the target's volume, speed, end mode and mute
    /// flag but start without a source. Returns `(first, second)`.
    pub fn split(
        &mut self,
        target: NodeId,
        orientation: Orientation,
    ) -> Result<(NodeId, NodeId), LayoutError> {
        let template = self
            .slot(target)
            .ok_or(LayoutError::InvalidTarget(target))?
            .blank_copy();
        let parent = self.nodes[target].parent;

        let split = self.nodes.insert(Node {
            parent,
            kind: NodeKind::Leaf(PlayerSlot::new()),
        });
        let first = self.nodes.insert(Node {
            parent: Some(split),
            kind: NodeKind::Leaf(template.clone()),
        });
        let second = self.nodes.insert(Node {
            parent: Some(split),
            kind: NodeKind::Leaf(template),
        });
        self.nodes[split].kind = NodeKind::Split(SplitInfo {
            orientation,
            ratio: 0.5,
            first,
            second,
        });

        self.replace_child(parent, target, split);
        self.nodes.remove(target);
        Ok((first, second))
    }

    /// Remove a leaf, promoting its sibling subtree into the parent's place.
    ///
    /// Returns the sibling when it is a leaf, otherwise the sibling's first leaf.
    pub fn merge(&mut self, leaf: NodeId) -> Result<NodeId, LayoutError> {
        if !self.is_leaf(leaf) {
            return Err(LayoutError::InvalidTarget(leaf));
        }
        let parent = self.nodes[leaf]
            .parent
            .ok_or(LayoutError::InvalidTarget(leaf))?;
        let NodeKind::Split(info) = self.nodes[parent].kind else {
            return Err(LayoutError::InvalidTarget(leaf));
        };
        let sibling = if info.first == leaf {
            info.second
        } else {
            info.first
        };
        let grandparent = self.nodes[parent].parent;

        self.replace_child(grandparent, parent, sibling);
        self.nodes[sibling].parent = grandparent;
        self.nodes.remove(parent);
        self.nodes.remove(leaf);

        self.first_leaf(sibling)
            .ok_or(LayoutError::InvalidTarget(sibling))
    }

    /// Exchange the contents of two leaves; the tree shape does not change
    pub fn swap(&mut self, a: NodeId, b: NodeId) -> Result<(), LayoutError> {
        for id in [a, b] {
            if !self.is_leaf(id) {
                return Err(LayoutError::InvalidTarget(id));
            }
        }
        if a == b {
            return Ok(());
        }
        let slot_a = self.take_slot(a);
        let slot_b = self.take_slot(b);
        self.nodes[a].kind = NodeKind::Leaf(slot_b);
        self.nodes[b].kind = NodeKind::Leaf(slot_a);
        Ok(())
    }

    /// Set a split's ratio, clamped to keep both regions visible
    pub fn resize(&mut self, split: NodeId, ratio: f32) -> Result<f32, LayoutError> {
        let ratio = clamp_ratio(ratio)?;
        match self.nodes.get_mut(split) {
            Some(Node {
                kind: NodeKind::Split(info),
                ..
            }) => {
                info.ratio = ratio;
                Ok(ratio)
            }
            _ => Err(LayoutError::InvalidTarget(split)),
        }
    }

    /// Build a tree bottom-up: attach two existing subtrees under a new split
    pub(crate) fn join(
        mut first: LayoutTree,
        second: LayoutTree,
        orientation: Orientation,
        ratio: f32,
    ) -> LayoutTree {
        let first_root = first.root;
        let second_root = first.adopt(second);
        let split = first.nodes.insert(Node {
            parent: None,
            kind: NodeKind::Split(SplitInfo {
                orientation,
                ratio,
                first: first_root,
                second: second_root,
            }),
        });
        first.nodes[first_root].parent = Some(split);
        first.nodes[second_root].parent = Some(split);
        first.root = split;
        first
    }

    /// Move every node of `other` into this arena, returning its new root id
    fn adopt(&mut self, mut other: LayoutTree) -> NodeId {
        let order: Vec<NodeId> = other.postorder();
        let mut mapped = slotmap::SecondaryMap::new();
        for old in order {
            let Some(node) = other.nodes.remove(old) else {
                continue;
            };
            let kind = match node.kind {
                NodeKind::Leaf(slot) => NodeKind::Leaf(slot),
                NodeKind::Split(info) => NodeKind::Split(SplitInfo {
                    first: mapped[info.first],
                    second: mapped[info.second],
                    ..info
                }),
            };
            let new = self.nodes.insert(Node { parent: None, kind });
            if let NodeKind::Split(info) = self.nodes[new].kind {
                self.nodes[info.first].parent = Some(new);
                self.nodes[info.second].parent = Some(new);
            }
            mapped.insert(old, new);
        }
        mapped[other.root]
    }

    /// Children before parents
    fn postorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            if let NodeKind::Split(info) = self.nodes[id].kind {
                stack.push(info.first);
                stack.push(info.second);
            }
        }
        out.reverse();
        out
    }

    fn take_slot(&mut self, id: NodeId) -> PlayerSlot {
        match std::mem::replace(&mut self.nodes[id].kind, NodeKind::Leaf(PlayerSlot::new())) {
            NodeKind::Leaf(slot) => slot,
            NodeKind::Split(info) => {
                self.nodes[id].kind = NodeKind::Split(info);
                PlayerSlot::new()
            }
        }
    }

    /// Point `parent`'s child link (or the root) from `old` to `new`
    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: NodeId) {
        match parent {
            None => self.root = new,
            Some(parent) => {
                if let NodeKind::Split(info) = &mut self.nodes[parent].kind {
                    if info.first == old {
                        info.first = new;
                    } else if info.second == old {
                        info.second = new;
                    }
                }
            }
        }
    }
}

impl Default for LayoutTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over `(NodeId, &PlayerSlot)` in layout order
pub struct Leaves<'a> {
    tree: &'a LayoutTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = (NodeId, &'a PlayerSlot);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        while let Some(id) = self.stack.pop() {
            match &tree.nodes[id].kind {
                NodeKind::Leaf(slot) => return Some((id, slot)),
                NodeKind::Split(info) => {
                    self.stack.push(info.second);
                    self.stack.push(info.first);
                }
            }
        }
        None
    }
}
