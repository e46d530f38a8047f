// ABOUTME: Layout persistence for restoring a wall between runs.
// ABOUTME: Saves the split shape and per-player settings as JSON files in a layout folder.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use wall_core::{EndMode, PlayerSlot};

use crate::tree::{clamp_ratio, LayoutTree, NodeId, Orientation};

const LAST_LAYOUT: &str = "last_layout";
const EXTENSION: &str = "json";

/// Shape of the tree without any player data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeNode {
    Leaf,
    Split {
        orientation: SavedOrientation,
        ratio: f32,
        first: Box<ShapeNode>,
        second: Box<ShapeNode>,
    },
}

impl ShapeNode {
    pub fn leaf_count(&self) -> usize {
        match self {
            ShapeNode::Leaf => 1,
            ShapeNode::Split { first, second, .. } => first.leaf_count() + second.leaf_count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavedOrientation {
    Horizontal,
    Vertical,
}

impl From<Orientation> for SavedOrientation {
    fn from(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Horizontal => SavedOrientation::Horizontal,
            Orientation::Vertical => SavedOrientation::Vertical,
        }
    }
}

impl From<SavedOrientation> for Orientation {
    fn from(orientation: SavedOrientation) -> Self {
        match orientation {
            SavedOrientation::Horizontal => Orientation::Horizontal,
            SavedOrientation::Vertical => Orientation::Vertical,
        }
    }
}

/// Durable settings of one player. Position and primary are never saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotConfig {
    #[serde(default)]
    pub source: Option<PathBuf>,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default)]
    pub end_mode: EndMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<PathBuf>,
}

fn default_volume() -> f32 {
    1.0
}

fn default_speed() -> f32 {
    1.0
}

impl From<&PlayerSlot> for SlotConfig {
    fn from(slot: &PlayerSlot) -> Self {
        Self {
            source: slot.source().map(Path::to_path_buf),
            volume: slot.volume(),
            speed: slot.speed(),
            end_mode: slot.end_mode(),
            history: slot.history().to_vec(),
        }
    }
}

/// A saved wall: the shape plus one slot config per leaf, in traversal order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutDocument {
    pub version: u32,
    pub shape: ShapeNode,
    pub slots: Vec<SlotConfig>,
}

impl LayoutDocument {
    pub const CURRENT_VERSION: u32 = 1;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt layout: {0}")]
    CorruptLayout(String),

    #[error("Unsupported layout version: {0}")]
    UnsupportedVersion(u32),

    #[error("Invalid layout name: {0:?}")]
    InvalidName(String),

    #[error("Could not determine data directory")]
    NoDataPath,
}

/// Reads and writes layouts in a folder of `<name>.json` files
#[derive(Debug, Clone)]
pub struct LayoutStore {
    folder: PathBuf,
}

impl LayoutStore {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    /// Store in the default data folder (~/.local/share/videowall/layouts)
    pub fn open_default() -> Result<Self, StoreError> {
        dirs::data_dir()
            .map(|p| Self::new(p.join("videowall").join("layouts")))
            .ok_or(StoreError::NoDataPath)
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Capture a tree's shape and durable slot settings
    pub fn save(tree: &LayoutTree) -> LayoutDocument {
        LayoutDocument {
            version: LayoutDocument::CURRENT_VERSION,
            shape: shape_of(tree, tree.root()),
            slots: tree
                .traverse_leaves()
                .map(|(_, slot)| SlotConfig::from(slot))
                .collect(),
        }
    }

    /// Rebuild a tree from a document, rejecting inconsistent data
    pub fn load(doc: &LayoutDocument) -> Result<LayoutTree, StoreError> {
        if doc.version > LayoutDocument::CURRENT_VERSION {
            return Err(StoreError::UnsupportedVersion(doc.version));
        }
        let leaves = doc.shape.leaf_count();
        if leaves != doc.slots.len() {
            return Err(StoreError::CorruptLayout(format!(
                "shape has {} players but {} player settings were saved",
                leaves,
                doc.slots.len()
            )));
        }
        let mut configs = doc.slots.iter();
        build(&doc.shape, &mut configs)
    }

    pub fn to_json(tree: &LayoutTree) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(&Self::save(tree))?)
    }

    pub fn from_json(json: &str) -> Result<LayoutTree, StoreError> {
        let doc: LayoutDocument = serde_json::from_str(json)?;
        Self::load(&doc)
    }

    pub fn save_to(path: &Path, tree: &LayoutTree) -> Result<(), StoreError> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, Self::to_json(tree)?)?;
        Ok(())
    }

    pub fn load_from(path: &Path) -> Result<LayoutTree, StoreError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\', '\0']);
        if !valid {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.folder.join(format!("{}.{}", name, EXTENSION)))
    }

    pub fn save_named(&self, name: &str, tree: &LayoutTree) -> Result<PathBuf, StoreError> {
        let path = self.path_for(name)?;
        Self::save_to(&path, tree)?;
        tracing::info!("Saved layout {:?} to {}", name, path.display());
        Ok(path)
    }

    pub fn load_named(&self, name: &str) -> Result<LayoutTree, StoreError> {
        let path = self.path_for(name)?;
        let tree = Self::load_from(&path)?;
        tracing::info!("Loaded layout {:?} with {} players", name, tree.leaf_count());
        Ok(tree)
    }

    pub fn delete_named(&self, name: &str) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    pub fn save_last(&self, tree: &LayoutTree) -> Result<PathBuf, StoreError> {
        self.save_named(LAST_LAYOUT, tree)
    }

    /// Load the last layout, `None` when there is none saved
    pub fn load_last(&self) -> Result<Option<LayoutTree>, StoreError> {
        let path = self.path_for(LAST_LAYOUT)?;
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    /// Names of saved layouts, sorted; an absent folder lists as empty
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let read = match std::fs::read_dir(&self.folder) {
            Ok(read) => read,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names: Vec<String> = read
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == EXTENSION))
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .filter(|name| !name.starts_with('.'))
            .collect();
        names.sort();
        Ok(names)
    }
}

fn shape_of(tree: &LayoutTree, id: NodeId) -> ShapeNode {
    match tree.split_info(id) {
        None => ShapeNode::Leaf,
        Some(info) => ShapeNode::Split {
            orientation: info.orientation.into(),
            ratio: info.ratio,
            first: Box::new(shape_of(tree, info.first)),
            second: Box::new(shape_of(tree, info.second)),
        },
    }
}

fn build<'a>(
    shape: &ShapeNode,
    configs: &mut impl Iterator<Item = &'a SlotConfig>,
) -> Result<LayoutTree, StoreError> {
    match shape {
        ShapeNode::Leaf => {
            let config = configs
                .next()
                .ok_or_else(|| StoreError::CorruptLayout("ran out of player settings".into()))?;
            Ok(LayoutTree::with_slot(slot_from(config)?))
        }
        ShapeNode::Split {
            orientation,
            ratio,
            first,
            second,
        } => {
            if !(ratio.is_finite() && *ratio > 0.0 && *ratio < 1.0) {
                return Err(StoreError::CorruptLayout(format!(
                    "split ratio {} is outside (0, 1)",
                    ratio
                )));
            }
            let ratio =
                clamp_ratio(*ratio).map_err(|e| StoreError::CorruptLayout(e.to_string()))?;
            let first = build(first, configs)?;
            let second = build(second, configs)?;
            Ok(LayoutTree::join(first, second, (*orientation).into(), ratio))
        }
    }
}

fn slot_from(config: &SlotConfig) -> Result<PlayerSlot, StoreError> {
    if !config.volume.is_finite() || !config.speed.is_finite() {
        return Err(StoreError::CorruptLayout(format!(
            "volume {} / speed {} is not a number",
            config.volume, config.speed
        )));
    }
    for path in config.source.iter().chain(config.history.iter()) {
        check_source(path)?;
    }
    let mut slot = PlayerSlot::new();
    slot.set_volume(config.volume);
    slot.set_speed(config.speed);
    slot.set_end_mode(config.end_mode);
    slot.restore_history(config.history.clone());
    slot.restore_source(config.source.clone());
    Ok(slot)
}

/// A source must be a non-empty path without NUL bytes; whether the file exists is not checked
fn check_source(path: &Path) -> Result<(), StoreError> {
    let raw = path.as_os_str();
    if raw.is_empty() || raw.to_string_lossy().contains('\0') {
        return Err(StoreError::CorruptLayout(format!(
            "invalid source path {:?}",
            path
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn durable(tree: &LayoutTree) -> LayoutDocument {
        LayoutStore::save(tree)
    }

    fn random_tree(rng: &mut StdRng, leaves: usize) -> LayoutTree {
        let mut tree = LayoutTree::new();
        while tree.leaf_count() < leaves {
            let ids = tree.leaves();
            let pick = ids[rng.random_range(0..ids.len())];
            let orientation = if rng.random_bool(0.5) {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };
            let (first, _) = tree.split(pick, orientation).unwrap();
            let parent = tree.parent(first).unwrap();
            tree.resize(parent, rng.random_range(0.1..0.9)).unwrap();
        }
        for (i, id) in tree.leaves().into_iter().enumerate() {
            let slot = tree.slot_mut(id).unwrap();
            if rng.random_bool(0.8) {
                slot.load(PathBuf::from(format!("/movies/{}.mp4", i)));
            }
            slot.set_volume(rng.random_range(0.0..1.0));
            slot.set_speed(rng.random_range(0.0..2.0));
            slot.set_end_mode(EndMode::all()[rng.random_range(0..3)]);
            slot.set_duration(100_000);
            slot.set_position(rng.random_range(0..100_000));
        }
        tree
    }

    #[test]
    fn json_roundtrip_for_many_sizes() {
        let mut rng = StdRng::seed_from_u64(42);
        for leaves in 1..=50 {
            let tree = random_tree(&mut rng, leaves);
            let json = LayoutStore::to_json(&tree).unwrap();
            let restored = LayoutStore::from_json(&json).unwrap();
            assert_eq!(durable(&restored), durable(&tree));
            assert_eq!(restored.leaf_count(), leaves);
            assert_eq!(restored.leaf_count(), restored.split_count() + 1);
        }
    }

    #[test]
    fn position_is_not_persisted() {
        let mut slot = PlayerSlot::new();
        slot.load(PathBuf::from("a.mp4"));
        slot.set_duration(60_000);
        slot.set_position(5000);
        let tree = LayoutTree::with_slot(slot);

        let restored = LayoutStore::load(&LayoutStore::save(&tree)).unwrap();
        let slot = restored.slot(restored.root()).unwrap();
        assert_eq!(slot.position(), 0);
        assert_eq!(slot.source(), Some(Path::new("a.mp4")));
    }

    #[test]
    fn count_mismatch_is_corrupt() {
        let mut tree = LayoutTree::new();
        tree.split(tree.root(), Orientation::Horizontal).unwrap();
        let mut doc = LayoutStore::save(&tree);
        doc.slots.pop();
        assert!(matches!(
            LayoutStore::load(&doc),
            Err(StoreError::CorruptLayout(_))
        ));
    }

    #[test]
    fn empty_source_is_corrupt() {
        let mut doc = LayoutStore::save(&LayoutTree::new());
        doc.slots[0].source = Some(PathBuf::new());
        assert!(matches!(
            LayoutStore::load(&doc),
            Err(StoreError::CorruptLayout(_))
        ));
    }

    #[test]
    fn missing_movie_file_is_not_an_error() {
        let mut doc = LayoutStore::save(&LayoutTree::new());
        doc.slots[0].source = Some(PathBuf::from("/does/not/exist.mp4"));
        assert!(LayoutStore::load(&doc).is_ok());
    }

    #[test]
    fn out_of_range_ratio_is_corrupt() {
        let json = r#"{
            "version": 1,
            "shape": {"type": "split", "orientation": "vertical", "ratio": 1.5,
                      "first": {"type": "leaf"}, "second": {"type": "leaf"}},
            "slots": [{}, {}]
        }"#;
        assert!(matches!(
            LayoutStore::from_json(json),
            Err(StoreError::CorruptLayout(_))
        ));
    }

    #[test]
    fn small_ratio_is_clamped_and_defaults_fill_in() {
        let json = r#"{
            "version": 1,
            "shape": {"type": "split", "orientation": "horizontal", "ratio": 0.01,
                      "first": {"type": "leaf"}, "second": {"type": "leaf"}},
            "slots": [{"source": "a.mp4", "end_mode": "next"}, {}]
        }"#;
        let tree = LayoutStore::from_json(json).unwrap();
        let info = tree.split_info(tree.root()).unwrap();
        assert_eq!(info.ratio, crate::tree::MIN_RATIO);
        let first = tree.slot(info.first).unwrap();
        assert_eq!(first.end_mode(), EndMode::Next);
        assert_eq!(first.volume(), 1.0);
        assert_eq!(tree.slot(info.second).unwrap().source(), None);
    }

    #[test]
    fn newer_version_is_rejected() {
        let mut doc = LayoutStore::save(&LayoutTree::new());
        doc.version = LayoutDocument::CURRENT_VERSION + 1;
        assert!(matches!(
            LayoutStore::load(&doc),
            Err(StoreError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn named_layouts_in_folder() {
        let dir = tempfile::tempdir().unwrap();
        let store = LayoutStore::new(dir.path().join("layouts"));
        assert!(store.list().unwrap().is_empty());
        assert!(store.load_last().unwrap().is_none());

        let mut tree = LayoutTree::new();
        tree.split(tree.root(), Orientation::Vertical).unwrap();
        store.save_named("quad", &tree).unwrap();
        store.save_last(&tree).unwrap();
        std::fs::write(store.folder().join(".hidden.json"), "{}").unwrap();
        std::fs::write(store.folder().join("notes.txt"), "").unwrap();

        assert_eq!(store.list().unwrap(), vec!["last_layout", "quad"]);
        assert_eq!(store.load_named("quad").unwrap().leaf_count(), 2);
        assert!(store.load_last().unwrap().is_some());

        store.delete_named("quad").unwrap();
        assert_eq!(store.list().unwrap(), vec!["last_layout"]);
    }

    #[test]
    fn layout_names_cannot_escape_folder() {
        let store = LayoutStore::new("/tmp/layouts");
        for bad in ["", ".hidden", "../up", "a/b"] {
            assert!(matches!(
                store.path_for(bad),
                Err(StoreError::InvalidName(_))
            ));
        }
    }
}
