//! Message types passed between pipeline stages and out to the caller.

use crate::pipeline::state::PlaybackState;
use crate::tts::AudioClip;
use bytes::Bytes;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

/// Input to one speech session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeechRequest {
    /// Markdown/HTML text, already grouped by the caller.
    pub raw_text: String,
    /// Names of elements rendered with the message; `[Name]` mentions are not spoken.
    pub element_names: BTreeSet<String>,
    /// Provider voice id (None = configured default).
    pub voice_id: Option<String>,
}

impl SpeechRequest {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            ..Self::default()
        }
    }

    pub fn with_element_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.element_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = Some(voice_id.into());
        self
    }
}

/// A synthesized, playable clip bound to one segment.
///
/// Cloning is cheap; all clones share the payload. [`release`](Self::release)
/// frees the payload for every clone.
#[derive(Debug, Clone)]
pub struct AudioUnit {
    inner: Arc<UnitInner>,
}

#[derive(Debug)]
struct UnitInner {
    index: usize,
    mime_type: String,
    payload: Mutex<Option<Bytes>>,
    released: AtomicBool,
}

impl AudioUnit {
    pub fn new(index: usize, clip: AudioClip) -> Self {
        Self {
            inner: Arc::new(UnitInner {
                index,
                mime_type: clip.mime_type,
                payload: Mutex::new(Some(clip.data)),
                released: AtomicBool::new(false),
            }),
        }
    }

    /// Segment index this unit was synthesized from.
    pub fn index(&self) -> usize {
        self.inner.index
    }

    pub fn mime_type(&self) -> &str {
        &self.inner.mime_type
    }

    /// Encoded audio, or `None` once released.
    pub fn data(&self) -> Option<Bytes> {
        self.inner
            .payload
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::Acquire)
    }

    /// Free the payload. Returns `true` for the call that actually released it.
    pub fn release(&self) -> bool {
        if self.inner.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.inner
            .payload
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        true
    }

    /// Whether two handles refer to the same unit.
    pub fn same_unit(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Every available unit was played.
    Completed,
    /// `stop()` was called.
    Cancelled,
    /// The first segment could not be synthesized.
    SynthesisFailed,
    /// The sink failed to start or reported an error.
    PlaybackFailed,
}

/// Events emitted on the caller-supplied event bus.
#[derive(Debug, Clone)]
pub enum SpeechEvent {
    /// The playback state changed.
    StateChanged {
        from: PlaybackState,
        to: PlaybackState,
    },
    /// A session began with this many planned segments.
    SessionStarted { segments: usize, progressive: bool },
    /// A unit was synthesized (it may still be discarded).
    UnitCreated(AudioUnit),
    /// A unit was appended to the playback queue.
    UnitQueued { index: usize },
    /// A unit started playing.
    UnitStarted { index: usize },
    /// A unit arrived after cancellation and was released unplayed.
    UnitDiscarded { index: usize },
    /// A background segment failed and was skipped.
    SegmentFailed { index: usize, reason: String },
    /// The session reached `Stopped`.
    SessionEnded { reason: SessionEnd, released: usize },
}

/// Create an event bus for
/// [`StreamCoordinator::with_events`](crate::StreamCoordinator::with_events).
///
/// [`SpeakConfig::event_channel`](crate::config::SpeakConfig::event_channel)
/// sizes it from configuration.
pub fn event_channel(
    capacity: usize,
) -> (broadcast::Sender<SpeechEvent>, broadcast::Receiver<SpeechEvent>) {
    broadcast::channel(capacity.max(1))
}

/// Optional event bus handle shared by the pipeline stages.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventBus {
    tx: Option<broadcast::Sender<SpeechEvent>>,
}

impl EventBus {
    pub(crate) fn new(tx: Option<broadcast::Sender<SpeechEvent>>) -> Self {
        Self { tx }
    }

    /// Best-effort emit; having no subscribers is not an error.
    pub(crate) fn emit(&self, event: SpeechEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
