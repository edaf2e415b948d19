//! Background synthesis of the remaining segments.

use crate::error::SpeechError;
use crate::pipeline::messages::{AudioUnit, EventBus, SpeechEvent};
use crate::pipeline::registry::ResourceRegistry;
use crate::text::Segment;
use crate::tts::{SynthesisProvider, VoiceSelection};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Observable state of a background synthesis job.
#[derive(Debug)]
pub struct SynthesisJob {
    next_index: AtomicUsize,
    complete: AtomicBool,
    cancel: CancellationToken,
}

impl SynthesisJob {
    pub(crate) fn new(first_index: usize, cancel: CancellationToken) -> Self {
        Self {
            next_index: AtomicUsize::new(first_index),
            complete: AtomicBool::new(false),
            cancel,
        }
    }

    /// Index of the segment being (or about to be) synthesized.
    pub fn next_index(&self) -> usize {
        self.next_index.load(Ordering::Acquire)
    }

    /// Whether every segment has been attempted or the job was halted.
    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Producer half of a progressive session.
pub(crate) struct SynthesisWorker {
    pub(crate) provider: Arc<dyn SynthesisProvider>,
    pub(crate) voice: VoiceSelection,
    pub(crate) registry: ResourceRegistry,
    pub(crate) job: Arc<SynthesisJob>,
    pub(crate) bus: EventBus,
}

impl SynthesisWorker {
    /// Synthesize `segments` one at a time and queue the results on `tx`.
    ///
    /// Failed segments are logged and skipped. The queue is closed when this
    /// returns, which tells the consumer no more units will arrive.
    pub(crate) async fn run(self, segments: Vec<Segment>, tx: mpsc::Sender<AudioUnit>) {
        let total = segments.len();
        let mut queued = 0_usize;

        for segment in segments {
            if self.job.cancel.is_cancelled() {
                debug!(segment = segment.index, "synthesis cancelled before request");
                break;
            }
            self.job.next_index.store(segment.index, Ordering::Release);

            let clip = match self.provider.synthesize(&segment.text, &self.voice).await {
                Ok(clip) => clip,
                Err(e) => {
                    let err = SpeechError::SegmentSynthesis {
                        index: segment.index,
                        reason: e.to_string(),
                    };
                    warn!("{err}; continuing with remaining segments");
                    self.bus.emit(SpeechEvent::SegmentFailed {
                        index: segment.index,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let unit = AudioUnit::new(segment.index, clip);
            self.bus.emit(SpeechEvent::UnitCreated(unit.clone()));

            if self.job.cancel.is_cancelled() || !self.registry.register(&unit) {
                self.discard(&unit);
                break;
            }

            let permit = tokio::select! {
                biased;
                () = self.job.cancel.cancelled() => None,
                permit = tx.reserve() => permit.ok(),
            };
            let Some(permit) = permit else {
                self.discard(&unit);
                break;
            };
            permit.send(unit);
            queued += 1;
            self.bus.emit(SpeechEvent::UnitQueued {
                index: segment.index,
            });
        }

        self.job.complete.store(true, Ordering::Release);
        info!(queued, total, "background synthesis finished");
    }

    fn discard(&self, unit: &AudioUnit) {
        unit.release();
        debug!(segment = unit.index(), "released unit produced after cancellation");
        self.bus.emit(SpeechEvent::UnitDiscarded {
            index: unit.index(),
        });
    }
}
