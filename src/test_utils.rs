//! Scripted provider and sink doubles shared by the pipeline unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::audio::{PlaybackNotifier, PlaybackSink};
use crate::error::{Result, SpeechError};
use crate::pipeline::AudioUnit;
use crate::tts::{AudioClip, SynthesisProvider, VoiceSelection};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Provider whose latency and failures are scripted per call ordinal.
///
/// The clip payload is the UTF-8 text that was synthesized.
pub(crate) struct ScriptedProvider {
    default_latency: Duration,
    latencies: HashMap<usize, Duration>,
    failing: HashSet<usize>,
    calls: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProvider {
    pub(crate) fn new(default_latency: Duration) -> Self {
        Self {
            default_latency,
            latencies: HashMap::new(),
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_latency(mut self, call: usize, latency: Duration) -> Self {
        self.latencies.insert(call, latency);
        self
    }

    pub(crate) fn failing(mut self, call: usize) -> Self {
        self.failing.insert(call);
        self
    }

    /// Texts passed to `synthesize`, in call order.
    pub(crate) fn texts(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Voice ids passed to `synthesize`, in call order.
    pub(crate) fn voices(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(_, v)| v.clone()).collect()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SynthesisProvider for ScriptedProvider {
    async fn synthesize(&self, text: &str, voice: &VoiceSelection) -> Result<AudioClip> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((text.to_owned(), voice.voice.clone()));
            calls.len() - 1
        };
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = self.latencies.get(&call).copied().unwrap_or(self.default_latency);
        tokio::time::sleep(latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&call) {
            return Err(SpeechError::Tts(format!("scripted failure for call {call}")));
        }
        Ok(AudioClip::new(text.as_bytes().to_vec(), "audio/mpeg"))
    }
}

/// Sink that "plays" each unit for a scripted duration.
pub(crate) struct RecordingSink {
    default_duration: Duration,
    durations: HashMap<usize, Duration>,
    refuse: HashSet<usize>,
    error_during: HashSet<usize>,
    stall: HashSet<usize>,
    played: Mutex<Vec<(usize, String)>>,
    stops: AtomicUsize,
}

impl RecordingSink {
    pub(crate) fn new(default_duration: Duration) -> Self {
        Self {
            default_duration,
            durations: HashMap::new(),
            refuse: HashSet::new(),
            error_during: HashSet::new(),
            stall: HashSet::new(),
            played: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_duration(mut self, index: usize, duration: Duration) -> Self {
        self.durations.insert(index, duration);
        self
    }

    /// `play` returns an error for this segment index.
    pub(crate) fn refusing(mut self, index: usize) -> Self {
        self.refuse.insert(index);
        self
    }

    /// Playback of this segment index reports an error instead of ending.
    pub(crate) fn erroring(mut self, index: usize) -> Self {
        self.error_during.insert(index);
        self
    }

    /// `play` never resolves for this segment index.
    pub(crate) fn stalling(mut self, index: usize) -> Self {
        self.stall.insert(index);
        self
    }

    pub(crate) fn played(&self) -> Vec<usize> {
        self.played.lock().unwrap().iter().map(|(i, _)| *i).collect()
    }

    pub(crate) fn played_texts(&self) -> Vec<String> {
        self.played.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }

    pub(crate) fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaybackSink for RecordingSink {
    async fn play(&self, unit: &AudioUnit, notifier: PlaybackNotifier) -> Result<()> {
        let index = unit.index();
        if self.refuse.contains(&index) {
            return Err(SpeechError::Playback(format!("refused unit {index}")));
        }
        let data = unit.data().expect("sink asked to play a released unit");
        let text = String::from_utf8(data.to_vec()).unwrap();
        self.played.lock().unwrap().push((index, text));
        if self.stall.contains(&index) {
            std::future::pending::<()>().await;
        }

        let duration = self.durations.get(&index).copied().unwrap_or(self.default_duration);
        let fail = self.error_during.contains(&index);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if fail {
                notifier.failed("scripted decode error");
            } else {
                notifier.ended();
            }
        });
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}
