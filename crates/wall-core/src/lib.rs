// ABOUTME: Shared types and configuration for videowall.
// ABOUTME: Defines player slot state, the movie library, and config file handling.

pub mod config;
pub mod library;
pub mod slot;
pub mod volume;

pub use config::{Config, ConfigError};
pub use library::{LibraryError, MovieEntry, MovieLibrary};
pub use slot::{EndMode, PlaybackState, PlayerSlot};
