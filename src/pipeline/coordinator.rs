//! Session orchestrator: turns a speech request into one playback session.
//!
//! A session synthesizes its first segment up front, starts playing it, and
//! (on the long path) keeps synthesizing the remaining segments in the
//! background while earlier ones play. At most one session is active at a time.

use crate::audio::PlaybackSink;
use crate::config::SpeakConfig;
use crate::error::{Result, SpeechError};
use crate::pipeline::messages::{AudioUnit, EventBus, SessionEnd, SpeechEvent, SpeechRequest};
use crate::pipeline::playback::PlaybackController;
use crate::pipeline::registry::ResourceRegistry;
use crate::pipeline::state::{PlaybackState, SpeechStatus, StateCell};
use crate::pipeline::worker::{SynthesisJob, SynthesisWorker};
use crate::text::{self, SpeechPlan};
use crate::tts::{SynthesisProvider, VoiceSelection};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Handles for the session currently owned by the coordinator.
struct ActiveSession {
    id: Uuid,
    cancel: CancellationToken,
    registry: ResourceRegistry,
    job: Option<Arc<SynthesisJob>>,
    /// Taken by whichever of `stop` or `wait` joins the task first.
    handle: Option<JoinHandle<SessionEnd>>,
}

impl ActiveSession {
    async fn join(&mut self) -> Option<SessionEnd> {
        let handle = self.handle.take()?;
        match handle.await {
            Ok(reason) => Some(reason),
            Err(e) => {
                let err = SpeechError::Pipeline(format!("session task failed: {e}"));
                error!(session = %self.id, "{err}");
                None
            }
        }
    }
}

/// Owns the single playback session and its lifecycle.
pub struct StreamCoordinator {
    config: SpeakConfig,
    provider: Arc<dyn SynthesisProvider>,
    sink: Arc<dyn PlaybackSink>,
    state: StateCell,
    bus: EventBus,
    session: Option<ActiveSession>,
}

impl StreamCoordinator {
    /// Create a coordinator around a synthesis provider and a playback sink.
    pub fn new(
        config: SpeakConfig,
        provider: Arc<dyn SynthesisProvider>,
        sink: Arc<dyn PlaybackSink>,
    ) -> Self {
        let bus = EventBus::default();
        Self {
            config,
            provider,
            sink,
            state: StateCell::new(bus.clone()),
            bus,
            session: None,
        }
    }

    /// Publish session events on `tx`.
    ///
    /// Observers (metrics, tests, a UI) subscribe to this bus instead of
    /// hooking into the coordinator. Call before the first [`start`](Self::start).
    pub fn with_events(mut self, tx: broadcast::Sender<SpeechEvent>) -> Self {
        self.bus = EventBus::new(Some(tx));
        self.state = StateCell::new(self.bus.clone());
        self
    }

    pub fn config(&self) -> &SpeakConfig {
        &self.config
    }

    /// Current playback state.
    pub fn state(&self) -> PlaybackState {
        self.state.get()
    }

    /// Three-way status for a listen/stop control.
    pub fn status(&self) -> SpeechStatus {
        self.state.get().status()
    }

    /// Watch every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }

    /// Id of the most recent session, if any was started.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Background synthesis job of the most recent long-path session.
    pub fn job(&self) -> Option<Arc<SynthesisJob>> {
        self.session.as_ref().and_then(|s| s.job.clone())
    }

    /// Begin speaking `request`.
    ///
    /// Does nothing while a session is active or when the request normalizes
    /// to nothing speakable. Otherwise the state is `Loading` when this returns
    /// and the session runs on a spawned task. Must be called inside a Tokio
    /// runtime.
    pub fn start(&mut self, request: SpeechRequest) {
        let current = self.state.get();
        if current.is_active() {
            debug!(state = ?current, "speech session already active, ignoring start");
            return;
        }

        let plan = match self.plan(&request) {
            Ok(plan) => plan,
            Err(e) => {
                debug!("ignoring speech request: {e}");
                return;
            }
        };

        if current == PlaybackState::Stopped {
            self.state.transition(PlaybackState::Idle);
        }
        if !self.state.transition(PlaybackState::Loading) {
            warn!(state = ?self.state.get(), "could not enter loading state");
            return;
        }

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let registry = ResourceRegistry::new();
        let voice = VoiceSelection::resolve(request.voice_id.as_deref(), &self.config.tts);
        let progressive = plan.is_progressive();
        let job = progressive.then(|| Arc::new(SynthesisJob::new(1, cancel.clone())));

        info!(
            session = %id,
            segments = plan.segments().len(),
            progressive,
            voice = %voice.voice,
            "starting speech session"
        );
        self.bus.emit(SpeechEvent::SessionStarted {
            segments: plan.segments().len(),
            progressive,
        });

        let session = Session {
            id,
            provider: Arc::clone(&self.provider),
            sink: Arc::clone(&self.sink),
            voice,
            state: self.state.clone(),
            registry: registry.clone(),
            cancel: cancel.clone(),
            bus: self.bus.clone(),
            job: job.clone(),
            queue_capacity: self.config.playback.queue_capacity,
        };
        let handle = tokio::spawn(session.run(plan));

        self.session = Some(ActiveSession {
            id,
            cancel,
            registry,
            job,
            handle: Some(handle),
        });
    }

    fn plan(&self, request: &SpeechRequest) -> Result<SpeechPlan> {
        let normalized = text::normalize(&request.raw_text, &request.element_names);
        text::plan(&normalized, &self.config.segmenter).ok_or(SpeechError::EmptyInput)
    }

    /// Stop the active session and wait until it has fully torn down.
    ///
    /// Safe to call at any time. Afterwards the state is `Stopped` (or
    /// unchanged if no session ever ran) and every unit is released.
    pub async fn stop(&mut self) {
        let active = self.state.get().is_active();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.cancel.cancel();
        if active {
            info!(session = %session.id, "stopping speech session");
            self.sink.stop();
        }

        if let Some(reason) = session.join().await {
            debug!(session = %session.id, ?reason, "session task joined");
        }
        let leaked = session.registry.release_all();
        if leaked > 0 {
            warn!(session = %session.id, leaked, "released units left by the session task");
        }
        self.state.transition(PlaybackState::Stopped);
    }

    /// Start `request` when idle, otherwise stop the active session.
    pub async fn toggle(&mut self, request: SpeechRequest) {
        if self.state.get().is_active() {
            self.stop().await;
        } else {
            self.start(request);
        }
    }

    /// Wait for the active session to end on its own.
    ///
    /// Returns `None` if no session was started or it was already joined.
    pub async fn wait(&mut self) -> Option<SessionEnd> {
        self.session.as_mut()?.join().await
    }
}

impl Drop for StreamCoordinator {
    fn drop(&mut self) {
        if let Some(session) = &self.session {
            session.cancel.cancel();
            session.registry.release_all();
        }
    }
}

/// Everything the spawned session task owns.
struct Session {
    id: Uuid,
    provider: Arc<dyn SynthesisProvider>,
    sink: Arc<dyn PlaybackSink>,
    voice: VoiceSelection,
    state: StateCell,
    registry: ResourceRegistry,
    cancel: CancellationToken,
    bus: EventBus,
    job: Option<Arc<SynthesisJob>>,
    queue_capacity: usize,
}

impl Session {
    async fn run(self, plan: SpeechPlan) -> SessionEnd {
        let mut segments = match plan {
            SpeechPlan::Short(segment) => vec![segment],
            SpeechPlan::Long(segments) => segments,
        };
        let rest = segments.split_off(1);
        let Some(first) = segments.pop() else {
            return self.finish_early(SessionEnd::Completed);
        };

        let result = tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            result = self.provider.synthesize(&first.text, &self.voice) => Some(result),
        };
        let clip = match result {
            None => {
                debug!(session = %self.id, "cancelled during first synthesis");
                return self.finish_early(SessionEnd::Cancelled);
            }
            Some(Err(e)) => {
                let err = SpeechError::SessionSynthesis(e.to_string());
                error!(session = %self.id, "{err}");
                return self.finish_early(SessionEnd::SynthesisFailed);
            }
            Some(Ok(clip)) => clip,
        };

        let unit = AudioUnit::new(first.index, clip);
        self.bus.emit(SpeechEvent::UnitCreated(unit.clone()));
        if self.cancel.is_cancelled() || !self.registry.register(&unit) {
            unit.release();
            self.bus.emit(SpeechEvent::UnitDiscarded { index: unit.index() });
            return self.finish_early(SessionEnd::Cancelled);
        }

        let (tx, rx) = mpsc::channel(self.queue_capacity.max(1));
        match &self.job {
            Some(job) if !rest.is_empty() => {
                let worker = SynthesisWorker {
                    provider: Arc::clone(&self.provider),
                    voice: self.voice.clone(),
                    registry: self.registry.clone(),
                    job: Arc::clone(job),
                    bus: self.bus.clone(),
                };
                tokio::spawn(worker.run(rest, tx));
            }
            _ => drop(tx),
        }

        let controller = PlaybackController {
            sink: self.sink,
            state: self.state,
            registry: self.registry,
            cancel: self.cancel,
            bus: self.bus,
        };
        controller.run(unit, rx).await
    }

    /// End a session that never reached playback.
    fn finish_early(&self, reason: SessionEnd) -> SessionEnd {
        let released = self.registry.release_all();
        self.state.transition(PlaybackState::Stopped);
        self.bus.emit(SpeechEvent::SessionEnded { reason, released });
        info!(session = %self.id, ?reason, "speech session ended before playback");
        reason
    }
}
