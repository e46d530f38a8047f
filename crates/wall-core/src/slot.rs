// ABOUTME: Runtime state of a single player region on the wall.
// ABOUTME: Holds source, volume, speed, position, end-of-video mode and history.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MIN_VOLUME: f32 = 0.0;
pub const MAX_VOLUME: f32 = 1.0;
pub const MIN_SPEED: f32 = 0.0;
pub const MAX_SPEED: f32 = 2.0;

/// What a player does when its video reaches the end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EndMode {
    /// Rewind and play the same video again
    #[default]
    Loop,
    /// Advance to the next movie in the library, wrapping around
    Next,
    /// Jump to a random other movie in the library
    Random,
}

impl EndMode {
    pub fn all() -> &'static [EndMode] {
        &[EndMode::Loop, EndMode::Next, EndMode::Random]
    }

    pub fn label(&self) -> &'static str {
        match self {
            EndMode::Loop => "loop",
            EndMode::Next => "next",
            EndMode::Random => "random",
        }
    }

    pub fn from_label(label: &str) -> Option<EndMode> {
        Self::all()
            .iter()
            .copied()
            .find(|mode| mode.label().eq_ignore_ascii_case(label))
    }

    pub fn next(&self) -> EndMode {
        let all = EndMode::all();
        let idx = all.iter().position(|m| m == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    Playing,
    Paused,
    #[default]
    Stopped,
}

/// One player's state. Positions and durations are in milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSlot {
    source: Option<PathBuf>,
    volume: f32,
    speed: f32,
    position: u64,
    duration: u64,
    end_mode: EndMode,
    muted: bool,
    state: PlaybackState,
    history: Vec<PathBuf>,
    at_history: Option<usize>,
    last_error: Option<String>,
}

impl PlayerSlot {
    pub fn new() -> Self {
        Self {
            source: None,
            volume: MAX_VOLUME,
            speed: 1.0,
            position: 0,
            duration: 0,
            end_mode: EndMode::default(),
            muted: false,
            state: PlaybackState::Stopped,
            history: Vec::new(),
            at_history: None,
            last_error: None,
        }
    }

    /// An empty slot carrying this slot's volume, speed, end mode and mute flag
    pub fn blank_copy(&self) -> Self {
        Self {
            volume: self.volume,
            speed: self.speed,
            end_mode: self.end_mode,
            muted: self.muted,
            ..Self::new()
        }
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    /// Milliseconds left until the end, zero when the duration is unknown
    pub fn remaining(&self) -> u64 {
        self.duration.saturating_sub(self.position)
    }

    pub fn end_mode(&self) -> EndMode {
        self.end_mode
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn history(&self) -> &[PathBuf] {
        &self.history
    }

    pub fn at_history(&self) -> Option<usize> {
        self.at_history
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Volume is clamped to 0.0..=1.0; NaN is treated as silence
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_nan() {
            MIN_VOLUME
        } else {
            volume.clamp(MIN_VOLUME, MAX_VOLUME)
        };
    }

    /// Speed is clamped to 0.0..=2.0; NaN resets to normal rate
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = if speed.is_nan() {
            1.0
        } else {
            speed.clamp(MIN_SPEED, MAX_SPEED)
        };
    }

    pub fn set_end_mode(&mut self, mode: EndMode) {
        self.end_mode = mode;
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn set_state(&mut self, state: PlaybackState) {
        self.state = state;
    }

    /// Set the duration and pull the position back inside it
    pub fn set_duration(&mut self, duration: u64) {
        self.duration = duration;
        self.position = self.position.min(duration);
    }

    /// Set the position, saturating at the duration.
    ///
    /// Until a duration is known it is 0, which pins the position at the start.
    pub fn set_position(&mut self, position: u64) {
        self.position = position.min(self.duration);
    }

    /// Move the position by a signed offset, saturating at both ends
    pub fn jog(&mut self, delta_millis: i64) -> u64 {
        let target = if delta_millis < 0 {
            self.position.saturating_sub(delta_millis.unsigned_abs())
        } else {
            self.position.saturating_add(delta_millis as u64)
        };
        self.set_position(target);
        self.position
    }

    pub fn set_error(&mut self, reason: impl Into<String>) {
        self.last_error = Some(reason.into());
        self.state = PlaybackState::Stopped;
    }

    /// Load a new source. Returns false when the slot already holds it.
    ///
    /// Unless the slot is stepping through its history, a new source is
    /// appended to the history (consecutive duplicates are collapsed).
    pub fn load(&mut self, source: PathBuf) -> bool {
        if self.source.as_deref() == Some(source.as_path()) {
            return false;
        }
        if self.at_history.is_none() && self.history.last() != Some(&source) {
            self.history.push(source.clone());
        }
        self.source = Some(source);
        self.position = 0;
        self.duration = 0;
        self.last_error = None;
        self.state = PlaybackState::Playing;
        true
    }

    /// Remove the source, leaving the slot stopped
    pub fn unload(&mut self) {
        self.source = None;
        self.position = 0;
        self.duration = 0;
        self.state = PlaybackState::Stopped;
    }

    /// Rewind to the start and keep playing
    pub fn restart(&mut self) {
        self.position = 0;
        if self.source.is_some() {
            self.state = PlaybackState::Playing;
        }
    }

    /// Step the history cursor and return the source to load.
    ///
    /// Moving back from the live end lands on the second-to-last entry;
    /// moving forward past the second-to-last entry returns to the live end.
    pub fn step_history(&mut self, forward: bool) -> Option<PathBuf> {
        if self.history.is_empty() {
            return None;
        }
        let last = self.history.len() - 1;
        self.at_history = if forward {
            match self.at_history {
                Some(at) if at + 1 < last => Some(at + 1),
                _ => None,
            }
        } else {
            match self.at_history {
                None => Some(last.saturating_sub(1)),
                Some(at) => Some(at.saturating_sub(1)),
            }
        };
        let index = self.at_history.unwrap_or(last);
        self.history.get(index).cloned()
    }

    /// Replace the history, used when restoring a saved layout
    pub fn restore_history(&mut self, history: Vec<PathBuf>) {
        self.history = history;
        self.at_history = None;
    }

    /// Restore a persisted source without touching history or playback state
    pub fn restore_source(&mut self, source: Option<PathBuf>) {
        self.state = if source.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Stopped
        };
        self.source = source;
        self.position = 0;
        self.duration = 0;
    }
}

impl Default for PlayerSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_and_speed_are_clamped() {
        let mut slot = PlayerSlot::new();
        slot.set_volume(1.7);
        assert_eq!(slot.volume(), 1.0);
        slot.set_volume(-0.2);
        assert_eq!(slot.volume(), 0.0);
        slot.set_speed(5.0);
        assert_eq!(slot.speed(), 2.0);
        slot.set_speed(f32::NAN);
        assert_eq!(slot.speed(), 1.0);
    }

    #[test]
    fn jog_saturates_at_both_ends() {
        let mut slot = PlayerSlot::new();
        slot.set_duration(10_000);
        slot.set_position(5_000);
        assert_eq!(slot.jog(-999_999), 0);
        assert_eq!(slot.jog(i64::MAX), 10_000);
        assert_eq!(slot.jog(i64::MIN), 0);
    }

    #[test]
    fn position_stays_at_start_until_duration_is_known() {
        let mut slot = PlayerSlot::new();
        slot.load(PathBuf::from("a.mp4"));
        assert_eq!(slot.jog(5_000), 0);
        slot.set_position(3_000);
        assert_eq!(slot.position(), 0);

        slot.set_duration(8_000);
        assert_eq!(slot.jog(5_000), 5_000);
        slot.set_duration(4_000);
        assert_eq!(slot.position(), 4_000);
        assert!(slot.position() <= slot.duration());
    }

    #[test]
    fn blank_copy_keeps_settings_only() {
        let mut slot = PlayerSlot::new();
        slot.load(PathBuf::from("a.mp4"));
        slot.set_volume(0.3);
        slot.set_speed(1.5);
        slot.set_end_mode(EndMode::Random);
        slot.set_duration(60_000);
        slot.set_position(1234);

        let copy = slot.blank_copy();
        assert_eq!(copy.source(), None);
        assert_eq!(copy.position(), 0);
        assert_eq!(copy.volume(), 0.3);
        assert_eq!(copy.speed(), 1.5);
        assert_eq!(copy.end_mode(), EndMode::Random);
        assert!(copy.history().is_empty());
    }

    #[test]
    fn load_records_history_once() {
        let mut slot = PlayerSlot::new();
        assert!(slot.load(PathBuf::from("a")));
        assert!(!slot.load(PathBuf::from("a")));
        slot.load(PathBuf::from("b"));
        assert_eq!(slot.history(), &[PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(slot.state(), PlaybackState::Playing);
    }

    #[test]
    fn history_steps_back_and_returns_to_live_end() {
        let mut slot = PlayerSlot::new();
        for name in ["a", "b", "c"] {
            slot.load(PathBuf::from(name));
        }
        assert_eq!(slot.step_history(false), Some(PathBuf::from("b")));
        assert_eq!(slot.step_history(false), Some(PathBuf::from("a")));
        assert_eq!(slot.step_history(false), Some(PathBuf::from("a")));
        assert_eq!(slot.step_history(true), Some(PathBuf::from("b")));
        assert_eq!(slot.step_history(true), Some(PathBuf::from("c")));
        assert_eq!(slot.at_history(), None);
    }

    #[test]
    fn end_mode_labels_parse() {
        assert_eq!(EndMode::from_label("Next"), Some(EndMode::Next));
        assert_eq!(EndMode::from_label("bogus"), None);
        assert_eq!(EndMode::Random.next(), EndMode::Loop);
    }
}
