use crate::helpers::{EchoProvider, TimedSink, coordinator, drain_events, three_paragraphs};
use speakstream::{AudioUnit, PlaybackState, SessionEnd, SpeechEvent, SpeechRequest, SpeechStatus};
use std::sync::Arc;
use std::time::Duration;

fn states(events: &[SpeechEvent]) -> Vec<PlaybackState> {
    events
        .iter()
        .filter_map(|e| match e {
            SpeechEvent::StateChanged { to, .. } => Some(*to),
            _ => None,
        })
        .collect()
}

fn created(events: &[SpeechEvent]) -> Vec<AudioUnit> {
    events
        .iter()
        .filter_map(|e| match e {
            SpeechEvent::UnitCreated(unit) => Some(unit.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn short_reply_is_one_request() {
    let provider = Arc::new(EchoProvider::new(Duration::from_millis(80)));
    let sink = Arc::new(TimedSink::new(Duration::from_millis(500)));
    let (mut speaker, mut events) = coordinator(&provider, &sink);

    assert_eq!(speaker.status(), SpeechStatus::Idle);
    speaker.start(SpeechRequest::new("Hello world"));
    assert_eq!(speaker.wait().await, Some(SessionEnd::Completed));

    assert_eq!(provider.request_count(), 1);
    assert_eq!(sink.played(), vec![0]);
    let events = drain_events(&mut events);
    assert_eq!(
        states(&events),
        vec![PlaybackState::Loading, PlaybackState::Playing, PlaybackState::Stopped]
    );
}

#[tokio::test(start_paused = true)]
async fn long_reply_starts_after_first_segment_and_plays_all_in_order() {
    let provider = Arc::new(EchoProvider::new(Duration::from_millis(120)));
    let sink = Arc::new(TimedSink::new(Duration::from_millis(400)));
    let (mut speaker, mut events) = coordinator(&provider, &sink);

    speaker.start(SpeechRequest::new(three_paragraphs()));
    let mut watcher = speaker.subscribe_state();
    watcher
        .wait_for(|s| *s == PlaybackState::Playing)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    // Playback began while the rest was still being synthesized.
    assert_eq!(sink.played(), vec![0]);
    assert_eq!(provider.request_count(), 2);
    assert!(!speaker.job().unwrap().is_complete());

    assert_eq!(speaker.wait().await, Some(SessionEnd::Completed));
    assert_eq!(sink.played(), vec![0, 1, 2]);
    assert_eq!(provider.request_count(), 3);

    let events = drain_events(&mut events);
    let units = created(&events);
    assert_eq!(units.iter().map(AudioUnit::index).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert!(units.iter().all(AudioUnit::is_released));
    assert!(events.iter().any(|e| matches!(
        e,
        SpeechEvent::SessionEnded {
            reason: SessionEnd::Completed,
            released: 3
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn stop_while_buffering_releases_the_late_unit() {
    // Segment 1 takes far longer than segment 0 plays.
    let provider = Arc::new(
        EchoProvider::new(Duration::from_millis(50)).slow_on(1, Duration::from_secs(3)),
    );
    let sink = Arc::new(TimedSink::new(Duration::from_millis(200)));
    let (mut speaker, mut events) = coordinator(&provider, &sink);

    speaker.start(SpeechRequest::new(three_paragraphs()));
    let mut watcher = speaker.subscribe_state();
    watcher
        .wait_for(|s| *s == PlaybackState::Buffering)
        .await
        .unwrap();
    assert_eq!(speaker.status(), SpeechStatus::Loading);

    speaker.stop().await;
    assert_eq!(speaker.state(), PlaybackState::Stopped);

    // Let the slow request resolve after the stop.
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(sink.played(), vec![0]);
    assert_eq!(provider.request_count(), 2);
    let job = speaker.job().unwrap();
    assert!(job.is_cancelled());
    assert!(job.is_complete());

    let events = drain_events(&mut events);
    let units = created(&events);
    assert_eq!(units.len(), 2);
    assert!(units.iter().all(AudioUnit::is_released));
    assert!(events.iter().any(|e| matches!(e, SpeechEvent::UnitDiscarded { index: 1 })));
    assert!(!events.iter().any(|e| matches!(e, SpeechEvent::UnitQueued { index: 1 })));
}

#[tokio::test(start_paused = true)]
async fn failing_voice_service_ends_in_stopped() {
    let provider = Arc::new(EchoProvider::new(Duration::from_millis(30)).fail_on(0));
    let sink = Arc::new(TimedSink::new(Duration::from_millis(100)));
    let (mut speaker, _events) = coordinator(&provider, &sink);

    speaker.start(SpeechRequest::new(three_paragraphs()));
    assert_eq!(speaker.wait().await, Some(SessionEnd::SynthesisFailed));
    assert_eq!(speaker.state(), PlaybackState::Stopped);
    assert!(sink.played().is_empty());

    // A later request starts a fresh session.
    speaker.start(SpeechRequest::new("Otra vez"));
    assert_eq!(speaker.wait().await, Some(SessionEnd::Completed));
    assert_eq!(sink.played(), vec![0]);
}

#[tokio::test(start_paused = true)]
async fn toggle_twice_stops_and_silences_the_sink() {
    let provider = Arc::new(EchoProvider::new(Duration::from_millis(30)));
    let sink = Arc::new(TimedSink::new(Duration::from_secs(2)));
    let (mut speaker, _events) = coordinator(&provider, &sink);

    speaker.toggle(SpeechRequest::new(three_paragraphs())).await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(speaker.status(), SpeechStatus::Playing);

    speaker.toggle(SpeechRequest::new(three_paragraphs())).await;
    assert_eq!(speaker.status(), SpeechStatus::Idle);
    assert!(sink.stops() >= 1);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(sink.played(), vec![0]);
}
