// ABOUTME: Wall controller routing transport commands to player slots.
// ABOUTME: Owns the layout tree, the primary pointer and end-of-video transitions.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use wall_core::volume::{slider_to_volume, volume_to_slider, SLIDER_MAX};
use wall_core::{EndMode, MovieLibrary, PlaybackState, PlayerSlot};
use wall_layout::{LayoutError, LayoutTree, NodeId, Orientation};

use crate::media::{MediaBackend, MediaCommand, MediaEvent};

/// Coordinates every player on one open wall.
///
/// All mutation goes through here so the primary pointer stays valid and the
/// media backend receives a command for every state change. Commands queue
/// up until [`WallController::flush`] or [`WallController::drain_commands`].
pub struct WallController {
    tree: LayoutTree,
    primary: Option<NodeId>,
    library: MovieLibrary,
    rng: StdRng,
    outbox: Vec<(NodeId, MediaCommand)>,
}

impl WallController {
    pub fn new(tree: LayoutTree, library: MovieLibrary) -> Self {
        Self::with_rng(tree, library, StdRng::from_os_rng())
    }

    /// Deterministic random picks, for tests and reproducible runs
    pub fn with_seed(tree: LayoutTree, library: MovieLibrary, seed: u64) -> Self {
        Self::with_rng(tree, library, StdRng::seed_from_u64(seed))
    }

    fn with_rng(tree: LayoutTree, library: MovieLibrary, rng: StdRng) -> Self {
        let mut controller = Self {
            tree,
            primary: None,
            library,
            rng,
            outbox: Vec::new(),
        };
        for leaf in controller.tree.leaves() {
            controller.sync(leaf);
        }
        controller
    }

    pub fn tree(&self) -> &LayoutTree {
        &self.tree
    }

    pub fn library(&self) -> &MovieLibrary {
        &self.library
    }

    pub fn set_library(&mut self, library: MovieLibrary) {
        self.library = library;
    }

    /// Swap in a whole new layout, closing every player of the old one
    pub fn replace_tree(&mut self, tree: LayoutTree) -> LayoutTree {
        for leaf in self.tree.leaves() {
            self.emit(leaf, MediaCommand::Close);
        }
        let old = std::mem::replace(&mut self.tree, tree);
        self.primary = None;
        for leaf in self.tree.leaves() {
            self.sync(leaf);
        }
        tracing::info!("Layout replaced, {} players", self.tree.leaf_count());
        old
    }

    pub fn primary(&self) -> Option<NodeId> {
        self.primary
    }

    pub fn is_primary(&self, leaf: NodeId) -> bool {
        self.primary == Some(leaf)
    }

    /// Make `leaf` the one slot receiving keyboard transport commands
    pub fn set_primary(&mut self, leaf: NodeId) -> Result<(), LayoutError> {
        if !self.tree.is_leaf(leaf) {
            return Err(LayoutError::InvalidTarget(leaf));
        }
        if let Some(previous) = self.primary.replace(leaf) {
            tracing::debug!("Primary moved from {:?} to {:?}", previous, leaf);
        }
        Ok(())
    }

    pub fn split(
        &mut self,
        leaf: NodeId,
        orientation: Orientation,
    ) -> Result<(NodeId, NodeId), LayoutError> {
        let (first, second) = self.tree.split(leaf, orientation)?;
        if self.primary == Some(leaf) {
            self.primary = Some(first);
        }
        self.emit(leaf, MediaCommand::Close);
        self.sync(first);
        self.sync(second);
        tracing::info!(
            "Split {:?} into {:?} and {:?}, total players: {}",
            leaf,
            first,
            second,
            self.tree.leaf_count()
        );
        Ok((first, second))
    }

    pub fn merge(&mut self, leaf: NodeId) -> Result<NodeId, LayoutError> {
        let survivor = self.tree.merge(leaf)?;
        if self.primary == Some(leaf) {
            self.primary = Some(survivor);
        }
        self.emit(leaf, MediaCommand::Close);
        tracing::info!(
            "Merged {:?} away, remaining players: {}",
            leaf,
            self.tree.leaf_count()
        );
        Ok(survivor)
    }

    /// Exchange two players' contents. The primary stays with its position.
    pub fn swap(&mut self, a: NodeId, b: NodeId) -> Result<(), LayoutError> {
        self.tree.swap(a, b)?;
        if a != b {
            self.sync(a);
            self.sync(b);
            tracing::debug!("Swapped {:?} and {:?}", a, b);
        }
        Ok(())
    }

    pub fn resize(&mut self, split: NodeId, ratio: f32) -> Result<f32, LayoutError> {
        self.tree.resize(split, ratio)
    }

    pub fn play_all(&mut self) {
        for leaf in self.tree.leaves() {
            if let Some(slot) = self.tree.slot_mut(leaf) {
                if slot.source().is_some() {
                    slot.set_state(PlaybackState::Playing);
                    self.outbox.push((leaf, MediaCommand::Play));
                }
            }
        }
    }

    pub fn pause_all(&mut self) {
        for leaf in self.tree.leaves() {
            if let Some(slot) = self.tree.slot_mut(leaf) {
                if slot.state() == PlaybackState::Playing {
                    slot.set_state(PlaybackState::Paused);
                    self.outbox.push((leaf, MediaCommand::Pause));
                }
            }
        }
    }

    pub fn mute_all(&mut self, muted: bool) {
        for leaf in self.tree.leaves() {
            if let Some(slot) = self.tree.slot_mut(leaf) {
                slot.set_muted(muted);
                self.outbox.push((leaf, MediaCommand::SetMuted(muted)));
            }
        }
    }

    /// Load a movie into a player. Returns false if it was already loaded.
    pub fn set_source(&mut self, leaf: NodeId, source: PathBuf) -> Result<bool, LayoutError> {
        let slot = self.slot_mut(leaf)?;
        if !slot.load(source.clone()) {
            return Ok(false);
        }
        tracing::info!("{:?} Setting source: {}", leaf, source.display());
        self.emit(leaf, MediaCommand::Load(source));
        self.emit(leaf, MediaCommand::Play);
        Ok(true)
    }

    pub fn clear_source(&mut self, leaf: NodeId) -> Result<(), LayoutError> {
        self.slot_mut(leaf)?.unload();
        self.emit(leaf, MediaCommand::Close);
        Ok(())
    }

    pub fn set_volume(&mut self, leaf: NodeId, volume: f32) -> Result<f32, LayoutError> {
        let slot = self.slot_mut(leaf)?;
        slot.set_volume(volume);
        let volume = slot.volume();
        self.emit(leaf, MediaCommand::SetVolume(volume));
        Ok(volume)
    }

    pub fn set_speed(&mut self, leaf: NodeId, speed: f32) -> Result<f32, LayoutError> {
        let slot = self.slot_mut(leaf)?;
        slot.set_speed(speed);
        let speed = slot.speed();
        self.emit(leaf, MediaCommand::SetRate(speed));
        Ok(speed)
    }

    pub fn set_muted(&mut self, leaf: NodeId, muted: bool) -> Result<(), LayoutError> {
        self.slot_mut(leaf)?.set_muted(muted);
        self.emit(leaf, MediaCommand::SetMuted(muted));
        Ok(())
    }

    pub fn set_end_mode(&mut self, leaf: NodeId, mode: EndMode) -> Result<(), LayoutError> {
        self.slot_mut(leaf)?.set_end_mode(mode);
        Ok(())
    }

    /// Move the position by `delta_millis`, saturating at the start and end
    pub fn jog(&mut self, leaf: NodeId, delta_millis: i64) -> Result<u64, LayoutError> {
        let position = self.slot_mut(leaf)?.jog(delta_millis);
        tracing::debug!("{:?} Jog to: {}", leaf, position);
        self.emit(leaf, MediaCommand::Seek(position));
        Ok(position)
    }

    pub fn seek(&mut self, leaf: NodeId, position: u64) -> Result<u64, LayoutError> {
        let slot = self.slot_mut(leaf)?;
        slot.set_position(position);
        let position = slot.position();
        self.emit(leaf, MediaCommand::Seek(position));
        Ok(position)
    }

    /// React to a player reaching the end of its video
    pub fn on_video_ended(&mut self, leaf: NodeId) -> Result<(), LayoutError> {
        let slot = self.slot(leaf)?;
        let (mode, browsing_history) = (slot.end_mode(), slot.at_history().is_some());
        match mode {
            EndMode::Loop => {
                tracing::info!("{:?} Looping", leaf);
                self.replay(leaf)
            }
            _ if browsing_history => self.move_in_history(leaf, true).map(|_| ()),
            EndMode::Next => {
                tracing::info!("{:?} Next movie", leaf);
                self.skip(leaf, 1).map(|_| ())
            }
            EndMode::Random => {
                tracing::info!("{:?} Random movie", leaf);
                self.skip_random(leaf).map(|_| ())
            }
        }
    }

    /// Move `offset` entries through the movie list, wrapping at both ends.
    ///
    /// A source that is not in the list counts as sitting just before the
    /// first entry. With an empty list the player stops.
    pub fn skip(&mut self, leaf: NodeId, offset: isize) -> Result<Option<PathBuf>, LayoutError> {
        let current = self.current_index(leaf)?;
        if self.library.is_empty() {
            return self.stop(leaf);
        }
        let count = self.library.len() as isize;
        let from = current.map_or(-1, |i| i as isize);
        let index = (from + offset.rem_euclid(count)).rem_euclid(count) as usize;
        self.load_index(leaf, index)
    }

    /// Jump to a random entry other than the current one.
    ///
    /// With one entry or fewer there is nothing else to pick, so the
    /// current video replays.
    pub fn skip_random(&mut self, leaf: NodeId) -> Result<Option<PathBuf>, LayoutError> {
        let current = self.current_index(leaf)?;
        let count = self.library.len();
        let has_source = self.slot(leaf)?.source().is_some();

        let index = match (count, current) {
            (0, _) if !has_source => return self.stop(leaf),
            (0, _) => None,
            (1, _) if has_source => None,
            (1, _) => Some(0),
            (_, Some(i)) => Some((i + self.rng.random_range(1..count)) % count),
            (_, None) => Some(self.rng.random_range(0..count)),
        };
        match index {
            Some(index) => self.load_index(leaf, index),
            None => {
                self.replay(leaf)?;
                Ok(self.slot(leaf)?.source().map(PathBuf::from))
            }
        }
    }

    /// Step back or forward through the movies this player has shown
    pub fn move_in_history(
        &mut self,
        leaf: NodeId,
        forward: bool,
    ) -> Result<Option<PathBuf>, LayoutError> {
        let target = self.slot_mut(leaf)?.step_history(forward);
        tracing::info!(
            "{:?} Moving {} in history",
            leaf,
            if forward { "forward" } else { "backward" }
        );
        match target {
            Some(path) => {
                self.load_or_replay(leaf, path.clone())?;
                Ok(Some(path))
            }
            None => Ok(None),
        }
    }

    /// Run the end-of-video action (`None`) or skip (`Some(offset)`) on the primary
    pub fn act(&mut self, offset: Option<isize>) -> Result<(), LayoutError> {
        let Some(primary) = self.primary else {
            return Ok(());
        };
        match offset {
            None => self.on_video_ended(primary),
            Some(offset) => self.skip(primary, offset).map(|_| ()),
        }
    }

    pub fn jog_primary(&mut self, forward: bool, interval_ms: u64) -> Result<(), LayoutError> {
        let Some(primary) = self.primary else {
            return Ok(());
        };
        let delta = i64::try_from(interval_ms).unwrap_or(i64::MAX);
        self.jog(primary, if forward { delta } else { -delta })
            .map(|_| ())
    }

    /// Move the primary's volume along the logarithmic slider by `step` positions
    pub fn nudge_primary_volume(&mut self, louder: bool, step: u8) -> Result<(), LayoutError> {
        let Some(primary) = self.primary else {
            return Ok(());
        };
        let current = volume_to_slider(self.slot(primary)?.volume());
        let target = if louder {
            current.saturating_add(step).min(SLIDER_MAX)
        } else {
            current.saturating_sub(step)
        };
        tracing::info!("{:?} Nudge volume slider to: {}", primary, target);
        self.set_volume(primary, slider_to_volume(target)).map(|_| ())
    }

    pub fn primary_history(&mut self, forward: bool) -> Result<(), LayoutError> {
        let Some(primary) = self.primary else {
            return Ok(());
        };
        self.move_in_history(primary, forward).map(|_| ())
    }

    /// Apply a notification from the media backend
    pub fn handle_event(&mut self, leaf: NodeId, event: MediaEvent) -> Result<(), LayoutError> {
        match event {
            MediaEvent::PositionChanged(position) => self.slot_mut(leaf)?.set_position(position),
            MediaEvent::DurationChanged(duration) => self.slot_mut(leaf)?.set_duration(duration),
            MediaEvent::Ended => self.on_video_ended(leaf)?,
            MediaEvent::Error(reason) => {
                tracing::warn!("{:?} Playback error: {}", leaf, reason);
                self.slot_mut(leaf)?.set_error(reason);
            }
        }
        Ok(())
    }

    /// Take all queued media commands
    pub fn drain_commands(&mut self) -> Vec<(NodeId, MediaCommand)> {
        std::mem::take(&mut self.outbox)
    }

    /// Send queued commands to a backend and return how many failed.
    /// Failures are recorded on the slot.
    pub fn flush(&mut self, backend: &mut impl MediaBackend) -> usize {
        let mut failed = 0;
        for (leaf, command) in self.drain_commands() {
            match backend.apply(leaf, &command) {
                Ok(()) => {}
                Err(e) => {
                    failed += 1;
                    tracing::warn!("{:?} Media command {:?} failed: {}", leaf, command, e);
                    if let Some(slot) = self.tree.slot_mut(leaf) {
                        slot.set_error(e.to_string());
                    }
                }
            }
        }
        failed
    }

    fn slot(&self, leaf: NodeId) -> Result<&PlayerSlot, LayoutError> {
        self.tree.slot(leaf).ok_or(LayoutError::InvalidTarget(leaf))
    }

    fn slot_mut(&mut self, leaf: NodeId) -> Result<&mut PlayerSlot, LayoutError> {
        self.tree
            .slot_mut(leaf)
            .ok_or(LayoutError::InvalidTarget(leaf))
    }

    fn emit(&mut self, leaf: NodeId, command: MediaCommand) {
        self.outbox.push((leaf, command));
    }

    fn current_index(&self, leaf: NodeId) -> Result<Option<usize>, LayoutError> {
        Ok(self
            .slot(leaf)?
            .source()
            .and_then(|source| self.library.position_of(source)))
    }

    fn load_index(&mut self, leaf: NodeId, index: usize) -> Result<Option<PathBuf>, LayoutError> {
        let Some(path) = self.library.get(index).map(PathBuf::from) else {
            return self.stop(leaf);
        };
        self.load_or_replay(leaf, path.clone())?;
        Ok(Some(path))
    }

    fn load_or_replay(&mut self, leaf: NodeId, path: PathBuf) -> Result<(), LayoutError> {
        if self.slot_mut(leaf)?.load(path.clone()) {
            self.emit(leaf, MediaCommand::Load(path));
            self.emit(leaf, MediaCommand::Play);
            Ok(())
        } else {
            self.replay(leaf)
        }
    }

    fn replay(&mut self, leaf: NodeId) -> Result<(), LayoutError> {
        let slot = self.slot_mut(leaf)?;
        if slot.source().is_none() {
            return Ok(());
        }
        slot.restart();
        self.emit(leaf, MediaCommand::Seek(0));
        self.emit(leaf, MediaCommand::Play);
        Ok(())
    }

    fn stop(&mut self, leaf: NodeId) -> Result<Option<PathBuf>, LayoutError> {
        self.slot_mut(leaf)?.set_state(PlaybackState::Stopped);
        tracing::info!("{:?} Nothing to play, stopped", leaf);
        Ok(None)
    }

    /// Queue the commands that bring the backend in line with a slot
    fn sync(&mut self, leaf: NodeId) {
        let Some(slot) = self.tree.slot(leaf) else {
            return;
        };
        let mut commands = Vec::with_capacity(7);
        match slot.source() {
            Some(source) => {
                commands.push(MediaCommand::Load(source.to_path_buf()));
                commands.push(MediaCommand::Seek(slot.position()));
            }
            None => commands.push(MediaCommand::Close),
        }
        commands.push(MediaCommand::SetVolume(slot.volume()));
        commands.push(MediaCommand::SetRate(slot.speed()));
        commands.push(MediaCommand::SetMuted(slot.muted()));
        match slot.state() {
            PlaybackState::Playing => commands.push(MediaCommand::Play),
            PlaybackState::Paused => commands.push(MediaCommand::Pause),
            PlaybackState::Stopped => {}
        }
        self.outbox
            .extend(commands.into_iter().map(|command| (leaf, command)));
    }
}
