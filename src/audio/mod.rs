//! Audio output.

pub mod playback;

pub use playback::{PlaybackEvent, PlaybackNotifier, PlaybackSink};
