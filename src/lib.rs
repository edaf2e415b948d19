//! Speakstream: progressive text-to-speech playback for chat messages.
//!
//! A message's markdown is normalized into plain speakable text, split into
//! paragraphs, and played back while later paragraphs are still being
//! synthesized:
//! Text → Normalize → Segment → Synthesize (background) → Queue → Playback
//!
//! # Architecture
//!
//! - **Text**: markup stripping and paragraph planning (`text`)
//! - **TTS**: the [`SynthesisProvider`] seam to a voice service (`tts`)
//! - **Audio**: the [`PlaybackSink`] seam to an audio device (`audio`)
//! - **Pipeline**: the [`StreamCoordinator`] state machine, background
//!   synthesis worker, playback controller and resource registry (`pipeline`)
//! - **Transcript**: grouping same-author chat messages into one request

pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod text;
pub mod transcript;
pub mod tts;

#[cfg(test)]
mod test_utils;

pub use audio::{PlaybackEvent, PlaybackNotifier, PlaybackSink};
pub use config::SpeakConfig;
pub use error::{Result, SpeechError};
pub use pipeline::{
    AudioUnit, PlaybackState, SessionEnd, SpeechEvent, SpeechRequest, SpeechStatus,
    StreamCoordinator, event_channel,
};
pub use tts::{AudioClip, SynthesisProvider, VoiceSelection};
