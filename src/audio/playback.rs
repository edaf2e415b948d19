//! Playback primitive seam.
//!
//! A [`PlaybackSink`] plays one [`AudioUnit`] at a time and reports the end of
//! playback (or a failure) through the [`PlaybackNotifier`] handed to it.

use crate::error::Result;
use crate::pipeline::AudioUnit;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Events reported by a sink about the unit it is playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The unit played to the end.
    Ended { index: usize },
    /// The unit failed while playing.
    Failed { index: usize, reason: String },
}

/// Reports playback progress for one unit back to the controller.
///
/// Notifications after the session has ended are dropped silently.
#[derive(Debug, Clone)]
pub struct PlaybackNotifier {
    index: usize,
    tx: mpsc::UnboundedSender<PlaybackEvent>,
}

impl PlaybackNotifier {
    pub(crate) fn new(index: usize, tx: mpsc::UnboundedSender<PlaybackEvent>) -> Self {
        Self { index, tx }
    }

    /// Segment index of the unit this notifier belongs to.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Signal that playback reached the end of the unit.
    pub fn ended(&self) {
        let _ = self.tx.send(PlaybackEvent::Ended { index: self.index });
    }

    /// Signal that playback of the unit failed.
    pub fn failed(&self, reason: impl Into<String>) {
        let _ = self.tx.send(PlaybackEvent::Failed {
            index: self.index,
            reason: reason.into(),
        });
    }
}

/// Audio output that can play synthesized units.
#[async_trait]
pub trait PlaybackSink: Send + Sync {
    /// Start playing `unit`. Resolves once playback has started; the end of
    /// playback is reported through `notifier`.
    ///
    /// # Errors
    ///
    /// Returns an error if playback cannot be started.
    async fn play(&self, unit: &AudioUnit, notifier: PlaybackNotifier) -> Result<()>;

    /// Stop whatever is currently playing. Must be safe to call when idle.
    fn stop(&self);
}
