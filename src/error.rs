//! Error types for the speech pipeline.

/// Top-level error type for normalization, synthesis and playback.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    /// Normalization left nothing speakable. Callers treat this as a no-op.
    #[error("nothing to speak")]
    EmptyInput,

    /// A non-first segment failed to synthesize. Recovered inside the worker.
    #[error("segment {index} synthesis failed: {reason}")]
    SegmentSynthesis { index: usize, reason: String },

    /// The first segment failed to synthesize, aborting the session.
    #[error("session synthesis failed: {0}")]
    SessionSynthesis(String),

    /// Text-to-speech provider error.
    #[error("TTS error: {0}")]
    Tts(String),

    /// Playback primitive error.
    #[error("playback error: {0}")]
    Playback(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Pipeline coordination error.
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, SpeechError>;
