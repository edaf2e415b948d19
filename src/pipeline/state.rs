//! Playback state machine.

use crate::pipeline::messages::{EventBus, SpeechEvent};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// State of the single active playback session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    /// No session has run yet (or a fresh one is about to start).
    #[default]
    Idle,
    /// Waiting for the first unit.
    Loading,
    /// A unit is playing.
    Playing,
    /// Playback caught up with synthesis; waiting for the next unit.
    Buffering,
    /// The session is over and its resources are released.
    Stopped,
}

impl PlaybackState {
    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(self, next: Self) -> bool {
        use PlaybackState::{Buffering, Idle, Loading, Playing, Stopped};
        match (self, next) {
            (Idle, Loading)
            | (Loading, Playing)
            | (Playing, Playing)
            | (Playing, Buffering)
            | (Buffering, Playing)
            | (Stopped, Idle) => true,
            (Stopped, Stopped) => false,
            (_, Stopped) => true,
            _ => false,
        }
    }

    /// Whether a session is in progress.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Loading | Self::Playing | Self::Buffering)
    }

    /// Collapse into the three-way status a button renders.
    pub fn status(self) -> SpeechStatus {
        match self {
            Self::Idle | Self::Stopped => SpeechStatus::Idle,
            Self::Loading | Self::Buffering => SpeechStatus::Loading,
            Self::Playing => SpeechStatus::Playing,
        }
    }
}

/// Caller-facing status for a listen/stop indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeechStatus {
    Idle,
    Loading,
    Playing,
}

impl SpeechStatus {
    /// Translation key for the indicator tooltip.
    pub fn label_key(self) -> &'static str {
        match self {
            Self::Idle => "chat.tts.listen",
            Self::Loading => "chat.tts.rendering",
            Self::Playing => "chat.tts.stop",
        }
    }
}

/// Shared, validated state slot.
///
/// Readers subscribe through the watch channel; every accepted change is also
/// published on the event bus.
#[derive(Debug, Clone)]
pub(crate) struct StateCell {
    tx: Arc<watch::Sender<PlaybackState>>,
    bus: EventBus,
}

impl StateCell {
    pub(crate) fn new(bus: EventBus) -> Self {
        let (tx, _rx) = watch::channel(PlaybackState::Idle);
        Self {
            tx: Arc::new(tx),
            bus,
        }
    }

    pub(crate) fn get(&self) -> PlaybackState {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.tx.subscribe()
    }

    /// Apply `next` if the transition is legal. Returns whether it was applied.
    pub(crate) fn transition(&self, next: PlaybackState) -> bool {
        let mut from = None;
        let mut accepted = false;
        self.tx.send_if_modified(|state| {
            let current = *state;
            if !current.can_transition_to(next) {
                from = Some(current);
                return false;
            }
            accepted = true;
            if current == next {
                return false;
            }
            from = Some(current);
            *state = next;
            true
        });

        match from {
            Some(from) if accepted => {
                debug!(?from, to = ?next, "playback state changed");
                self.bus.emit(SpeechEvent::StateChanged { from, to: next });
            }
            // Repeated stops are expected when teardown paths overlap.
            Some(PlaybackState::Stopped) if next == PlaybackState::Stopped => {}
            Some(from) => warn!(?from, to = ?next, "rejected playback state transition"),
            None => {}
        }
        accepted
    }
}
