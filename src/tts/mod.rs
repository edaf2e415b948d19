//! Text-to-speech provider seam.
//!
//! The pipeline never talks to a voice service directly. Anything that can
//! turn a piece of text into an encoded audio clip implements
//! [`SynthesisProvider`]; the coordinator calls it once per segment and never
//! has more than one request in flight per session.

use crate::config::TtsConfig;
use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Prosody adjustments forwarded to the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prosody {
    /// Speaking rate, e.g. `+10%`.
    pub rate: Option<String>,
    /// Volume, e.g. `-5%`.
    pub volume: Option<String>,
    /// Pitch, e.g. `+2Hz`.
    pub pitch: Option<String>,
}

/// Voice and prosody for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSelection {
    /// Provider voice id, e.g. `es-MX-DaliaNeural`.
    pub voice: String,
    pub prosody: Prosody,
}

impl VoiceSelection {
    /// Resolve the voice for a request, falling back to the configured default.
    pub fn resolve(requested: Option<&str>, config: &TtsConfig) -> Self {
        let voice = requested
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(&config.default_voice)
            .to_owned();
        Self {
            voice,
            prosody: Prosody {
                rate: config.rate.clone(),
                volume: config.volume.clone(),
                pitch: config.pitch.clone(),
            },
        }
    }
}

/// Encoded audio returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    /// Encoded audio bytes (decoding is the playback sink's concern).
    pub data: Bytes,
    /// MIME type of `data`, e.g. `audio/mpeg`.
    pub mime_type: String,
}

impl AudioClip {
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// External speech synthesis service.
#[async_trait]
pub trait SynthesisProvider: Send + Sync {
    /// Synthesize `text` with the given voice.
    ///
    /// # Errors
    ///
    /// Returns an error when the provider rejects or fails the request.
    async fn synthesize(&self, text: &str, voice: &VoiceSelection) -> Result<AudioClip>;
}
