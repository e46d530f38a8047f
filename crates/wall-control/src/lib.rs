// ABOUTME: Wall transport control and media playback plumbing.
// ABOUTME: Routes user commands and player events to the slots of one wall.

pub mod controller;
pub mod media;

pub use controller::WallController;
pub use media::{LoggingBackend, MediaBackend, MediaCommand, MediaError, MediaEvent, RecordingBackend};
