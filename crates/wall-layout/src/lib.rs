// ABOUTME: Player wall layout management.
// ABOUTME: Binary split tree of player slots and its on-disk persistence.

mod store;
mod tree;

pub use store::{LayoutDocument, LayoutStore, SavedOrientation, ShapeNode, SlotConfig, StoreError};
pub use tree::{LayoutError, LayoutTree, Leaves, NodeId, Orientation, Rect, SplitInfo, MAX_RATIO, MIN_RATIO};
