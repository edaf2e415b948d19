use speakstream::config::DEFAULT_VOICE;
use speakstream::{SpeakConfig, SpeechError};

#[test]
fn edited_file_is_picked_up_on_reload() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("speakstream").join("config.toml");

    let mut config = SpeakConfig::default();
    config.tts.pitch = Some("-2Hz".into());
    config.playback.queue_capacity = 4;
    config.save_to_file(&path).expect("save config");

    let edited = std::fs::read_to_string(&path)
        .unwrap()
        .replace("queue_capacity = 4", "queue_capacity = 2");
    std::fs::write(&path, edited).unwrap();

    let loaded = SpeakConfig::from_file(&path).expect("load config");
    assert_eq!(loaded.playback.queue_capacity, 2);
    assert_eq!(loaded.tts.pitch.as_deref(), Some("-2Hz"));
    assert_eq!(loaded.tts.default_voice, DEFAULT_VOICE);
}

#[test]
fn invalid_values_are_rejected_on_load() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[playback]\nqueue_capacity = 0\n").unwrap();

    let err = SpeakConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, SpeechError::Config(_)), "unexpected error: {err}");
}

#[test]
fn malformed_toml_is_a_config_error() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[tts\ndefault_voice = ").unwrap();

    assert!(matches!(
        SpeakConfig::from_file(&path),
        Err(SpeechError::Config(_))
    ));
}
