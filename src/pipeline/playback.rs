//! Consumer half of a session: plays queued units strictly in order.

use crate::audio::{PlaybackEvent, PlaybackNotifier, PlaybackSink};
use crate::pipeline::messages::{AudioUnit, EventBus, SessionEnd, SpeechEvent};
use crate::pipeline::registry::ResourceRegistry;
use crate::pipeline::state::{PlaybackState, StateCell};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What woke the controller loop.
enum Wake {
    Cancelled,
    Playback(Option<PlaybackEvent>),
    Resume(Option<AudioUnit>),
}

pub(crate) struct PlaybackController {
    pub(crate) sink: Arc<dyn PlaybackSink>,
    pub(crate) state: StateCell,
    pub(crate) registry: ResourceRegistry,
    pub(crate) cancel: CancellationToken,
    pub(crate) bus: EventBus,
}

impl PlaybackController {
    /// Play `first`, then every unit arriving on `units`, until the queue is
    /// closed and drained, the session is cancelled, or playback fails.
    ///
    /// Always leaves the session `Stopped` with every registered unit released.
    pub(crate) async fn run(
        self,
        first: AudioUnit,
        mut units: mpsc::Receiver<AudioUnit>,
    ) -> SessionEnd {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let reason = self.drive(first, &mut units, &event_tx, &mut event_rx).await;
        self.teardown(&mut units, reason);
        reason
    }

    async fn drive(
        &self,
        first: AudioUnit,
        units: &mut mpsc::Receiver<AudioUnit>,
        event_tx: &mpsc::UnboundedSender<PlaybackEvent>,
        event_rx: &mut mpsc::UnboundedReceiver<PlaybackEvent>,
    ) -> SessionEnd {
        let mut current = match self.start_unit(first, event_tx).await {
            Ok(index) => index,
            Err(reason) => return reason,
        };

        loop {
            let buffering = self.state.get() == PlaybackState::Buffering;
            let wake = tokio::select! {
                biased;
                () = self.cancel.cancelled() => Wake::Cancelled,
                event = event_rx.recv() => Wake::Playback(event),
                unit = units.recv(), if buffering => Wake::Resume(unit),
            };

            match wake {
                Wake::Cancelled => return SessionEnd::Cancelled,
                Wake::Playback(Some(PlaybackEvent::Ended { index })) if index == current => {
                    debug!(segment = index, "unit finished");
                    match units.try_recv() {
                        Ok(next) => match self.start_unit(next, event_tx).await {
                            Ok(index) => current = index,
                            Err(reason) => return reason,
                        },
                        Err(TryRecvError::Empty) => {
                            info!(segment = index, "playback caught up with synthesis, buffering");
                            self.state.transition(PlaybackState::Buffering);
                        }
                        Err(TryRecvError::Disconnected) => return SessionEnd::Completed,
                    }
                }
                Wake::Playback(Some(PlaybackEvent::Failed { index, reason }))
                    if index == current =>
                {
                    error!(segment = index, "playback failed: {reason}");
                    return SessionEnd::PlaybackFailed;
                }
                Wake::Playback(Some(stale)) => {
                    debug!(?stale, current, "ignoring event for a unit that is not playing");
                }
                // `event_tx` is held for the whole loop, so the channel stays open.
                Wake::Playback(None) => return SessionEnd::Completed,
                Wake::Resume(Some(next)) => {
                    if self.cancel.is_cancelled() {
                        return SessionEnd::Cancelled;
                    }
                    match self.start_unit(next, event_tx).await {
                        Ok(index) => current = index,
                        Err(reason) => return reason,
                    }
                }
                Wake::Resume(None) => {
                    debug!("queue closed while buffering");
                    return SessionEnd::Completed;
                }
            }
        }
    }

    /// Hand `unit` to the sink. Returns its index on success.
    ///
    /// A sink that never finishes starting does not hold up cancellation;
    /// teardown stops it.
    async fn start_unit(
        &self,
        unit: AudioUnit,
        event_tx: &mpsc::UnboundedSender<PlaybackEvent>,
    ) -> Result<usize, SessionEnd> {
        let index = unit.index();
        if !self.state.transition(PlaybackState::Playing) {
            return Err(SessionEnd::Cancelled);
        }
        self.bus.emit(SpeechEvent::UnitStarted { index });

        let notifier = PlaybackNotifier::new(index, event_tx.clone());
        let started = tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            result = self.sink.play(&unit, notifier) => Some(result),
        };
        match started {
            None => {
                debug!(segment = index, "cancelled while starting playback");
                return Err(SessionEnd::Cancelled);
            }
            Some(Err(e)) => {
                error!(segment = index, "failed to start playback: {e}");
                return Err(SessionEnd::PlaybackFailed);
            }
            Some(Ok(())) => {}
        }
        if self.cancel.is_cancelled() {
            // Stop raced with the start of this unit.
            return Err(SessionEnd::Cancelled);
        }
        debug!(segment = index, "unit playing");
        Ok(index)
    }

    fn teardown(&self, units: &mut mpsc::Receiver<AudioUnit>, reason: SessionEnd) {
        if reason != SessionEnd::Completed {
            self.sink.stop();
        }
        // Halts the worker if it is still producing.
        self.cancel.cancel();

        units.close();
        let mut dropped = 0_usize;
        while let Ok(unit) = units.try_recv() {
            if unit.release() {
                dropped += 1;
            }
        }
        let released = dropped + self.registry.release_all();
        if dropped > 0 {
            warn!(dropped, "released queued units that were never played");
        }

        self.state.transition(PlaybackState::Stopped);
        self.bus.emit(SpeechEvent::SessionEnded { reason, released });
        info!(?reason, released, "playback session ended");
    }
}
