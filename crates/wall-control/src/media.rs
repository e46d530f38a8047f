// ABOUTME: Commands and events exchanged with the media playback backend.
// ABOUTME: The backend owns decoders; the wall only sends commands keyed by leaf.

use std::path::PathBuf;
use wall_layout::NodeId;

/// Instruction for the player behind one leaf
#[derive(Debug, Clone, PartialEq)]
pub enum MediaCommand {
    Load(PathBuf),
    Play,
    Pause,
    /// Milliseconds from the start
    Seek(u64),
    SetVolume(f32),
    SetRate(f32),
    SetMuted(bool),
    /// Release the player behind the leaf (leaf removed or emptied)
    Close,
}

/// Notification from the player behind one leaf
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    PositionChanged(u64),
    DurationChanged(u64),
    Ended,
    Error(String),
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("No player for leaf {0:?}")]
    UnknownLeaf(NodeId),

    #[error("Playback backend failed: {0}")]
    Backend(String),
}

/// Something that plays video for each leaf of the wall
pub trait MediaBackend {
    fn apply(&mut self, leaf: NodeId, command: &MediaCommand) -> Result<(), MediaError>;
}

/// Backend that only logs commands, for running the wall without a decoder
#[derive(Debug, Default)]
pub struct LoggingBackend {
    applied: usize,
}

impl LoggingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn applied(&self) -> usize {
        self.applied
    }
}

impl MediaBackend for LoggingBackend {
    fn apply(&mut self, leaf: NodeId, command: &MediaCommand) -> Result<(), MediaError> {
        self.applied += 1;
        tracing::debug!("{:?} <- {:?}", leaf, command);
        Ok(())
    }
}

/// Backend that records every command and never fails.
///
/// Public so crates driving a wall can check what it would send.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub commands: Vec<(NodeId, MediaCommand)>,
}

impl MediaBackend for RecordingBackend {
    fn apply(&mut self, leaf: NodeId, command: &MediaCommand) -> Result<(), MediaError> {
        self.commands.push((leaf, command.clone()));
        Ok(())
    }
}
