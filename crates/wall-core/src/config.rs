// ABOUTME: Application configuration handling.
// ABOUTME: Loads and saves startup options from TOML config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder scanned (recursively) for movies
    pub movie_folder: PathBuf,

    /// File extensions considered movies, without the leading dot
    pub movie_extensions: Vec<String>,

    /// Folder holding saved layouts
    pub layout_folder: PathBuf,

    /// Restore the last layout on startup instead of a single empty player
    pub open_last_on_startup: bool,

    /// Save the current layout when switching layouts or closing
    pub auto_save_layout: bool,

    /// Volume for players created without one (0.0 - 1.0)
    pub default_volume: f32,

    /// How far a jog moves the primary player, in milliseconds
    pub jog_interval_ms: u64,

    /// Slider steps per volume nudge (slider runs 0 - 100)
    pub volume_step: u8,

    /// Show remaining time instead of total duration
    pub remaining_time: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            movie_folder: dirs::video_dir().unwrap_or_else(|| PathBuf::from(".")),
            movie_extensions: ["mp4", "mov", "avi", "mkv", "wmv"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            layout_folder: dirs::data_dir()
                .map(|p| p.join("videowall").join("layouts"))
                .unwrap_or_else(|| PathBuf::from("layouts")),
            open_last_on_startup: true,
            auto_save_layout: true,
            default_volume: 1.0,
            jog_interval_ms: 10_000,
            volume_step: 5,
            remaining_time: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

impl Config {
    /// Get the default config file path (~/.config/videowall/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("videowall").join("config.toml"))
    }

    /// Load config from a path
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config from default path, or return default config if not found
    pub fn load_or_default() -> Self {
        Self::default_path()
            .and_then(|path| Self::load(&path).ok())
            .unwrap_or_default()
    }

    /// Save config to a path
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default volume clamped into the valid range
    pub fn initial_volume(&self) -> f32 {
        if self.default_volume.is_nan() {
            1.0
        } else {
            self.default_volume.clamp(0.0, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config {
            movie_folder: PathBuf::from("/movies"),
            jog_interval_ms: 2500,
            auto_save_layout: false,
            ..Config::default()
        };
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config: Config = toml::from_str("jog_interval_ms = 500\n").unwrap();
        assert_eq!(config.jog_interval_ms, 500);
        assert_eq!(config.volume_step, 5);
        assert!(config.open_last_on_startup);
    }

    #[test]
    fn initial_volume_is_clamped() {
        let config = Config {
            default_volume: 3.0,
            ..Config::default()
        };
        assert_eq!(config.initial_volume(), 1.0);
    }
}
