//! Configuration types for the speech pipeline.

use crate::error::{Result, SpeechError};
use crate::pipeline::messages::{SpeechEvent, event_channel};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::broadcast;

/// Voice used when a request does not name one.
pub const DEFAULT_VOICE: &str = "es-MX-DaliaNeural";

/// Top-level configuration for the speech pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeakConfig {
    /// Text-to-speech settings.
    pub tts: TtsConfig,
    /// Short/long path policy.
    pub segmenter: SegmenterConfig,
    /// Producer/consumer queue settings.
    pub playback: PlaybackConfig,
}

/// Text-to-speech configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Voice id passed to the provider when the request has none.
    pub default_voice: String,
    /// Speaking rate adjustment, e.g. `+10%` (None = provider default).
    pub rate: Option<String>,
    /// Volume adjustment, e.g. `-5%` (None = provider default).
    pub volume: Option<String>,
    /// Pitch adjustment, e.g. `+2Hz` (None = provider default).
    pub pitch: Option<String>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            default_voice: DEFAULT_VOICE.to_owned(),
            rate: None,
            volume: None,
            pitch: None,
        }
    }
}

/// Policy deciding between single-shot and progressive synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Texts shorter than this many characters are synthesized in one call.
    pub long_text_threshold: usize,
    /// Texts with at most this many segments are synthesized in one call.
    pub max_short_segments: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            long_text_threshold: 500,
            max_short_segments: 1,
        }
    }
}

/// Queue between the synthesis worker and the playback controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Maximum synthesized units waiting for playback.
    ///
    /// The worker pauses (cancellation-aware) when the queue is full.
    pub queue_capacity: usize,
    /// Capacity of the event bus built by [`SpeakConfig::event_channel`].
    pub event_capacity: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 16,
            event_capacity: 64,
        }
    }
}

impl SpeakConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| SpeechError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| SpeechError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Event bus sized by `playback.event_capacity`.
    ///
    /// Subscribers that fall more than that many events behind observe
    /// [`broadcast::error::RecvError::Lagged`].
    pub fn event_channel(
        &self,
    ) -> (broadcast::Sender<SpeechEvent>, broadcast::Receiver<SpeechEvent>) {
        event_channel(self.playback.event_capacity)
    }

    /// Reject values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`SpeechError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.tts.default_voice.trim().is_empty() {
            return Err(SpeechError::Config("tts.default_voice must not be empty".into()));
        }
        if self.playback.queue_capacity == 0 {
            return Err(SpeechError::Config(
                "playback.queue_capacity must be at least 1".into(),
            ));
        }
        if self.playback.event_capacity == 0 {
            return Err(SpeechError::Config(
                "playback.event_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
