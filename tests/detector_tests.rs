// Integration tests for conversation detection
//
// The detector is driven with synthetic 100ms frame pairs on a simulated
// clock, so the silence timeout can be tested without waiting two minutes.

use std::time::{Duration, Instant};

use parley::{
    ContextHintSource, ContextHints, ConversationDetector, ConversationEvent, ConversationState,
    DetectorConfig, NoHints,
};

const FRAME: usize = 1600; // 100ms at 16kHz

fn loud() -> Vec<f32> {
    vec![0.3; FRAME]
}

fn quiet() -> Vec<f32> {
    vec![0.0; FRAME]
}

/// A four-phase cycle resembling real turn-taking: local speech, crosstalk,
/// remote speech, pause. Produces alternation, mutual activity, and an
/// activity ratio inside the speech-shape band all at once.
fn conversation_phase(i: usize) -> (Vec<f32>, Vec<f32>) {
    match i % 4 {
        0 => (loud(), quiet()),
        1 => (loud(), loud()),
        2 => (quiet(), loud()),
        _ => (quiet(), quiet()),
    }
}

#[test]
fn test_turn_taking_activates_detector() {
    let (mut detector, mut events) = ConversationDetector::new(DetectorConfig::default());
    let hints = ContextHints::default();
    let mut now = Instant::now();

    for i in 0..40 {
        let (mic, system) = conversation_phase(i);
        detector.process_frame(&mic, &system, &hints, now);
        now += Duration::from_millis(100);
    }

    assert_eq!(detector.state(), ConversationState::Active);
    assert!(detector.confidence() >= 0.7);
    // No contextual hints were supplied; the score comes from audio alone
    assert!(detector.confidence() <= 0.9 + 1e-6);

    match events.try_recv() {
        Ok(ConversationEvent::Started { confidence, .. }) => assert!(confidence >= 0.7),
        other => panic!("expected Started event, got {:?}", other),
    }
}

#[test]
fn test_null_hint_source_leaves_detection_to_audio() {
    // Compose through the hint-source seam instead of literal hints: with
    // NoHints, single-channel audio alone must never activate the detector
    let source: Box<dyn ContextHintSource> = Box::new(NoHints);
    let (mut detector, _events) = ConversationDetector::new(DetectorConfig::default());
    let mut now = Instant::now();

    for _ in 0..40 {
        detector.process_frame(&loud(), &quiet(), &source.hints(), now);
        now += Duration::from_millis(100);
    }

    assert_eq!(detector.state(), ConversationState::Idle);
    assert!(!source.hints().calendar_event_active);
    assert!(source.hints().meeting_app.is_none());
}

#[test]
fn test_single_speaker_does_not_activate() {
    let (mut detector, mut events) = ConversationDetector::new(DetectorConfig::default());
    let hints = ContextHints::default();
    let mut now = Instant::now();

    // Sustained one-way speech: no alternation, no mutual activity, and an
    // activity ratio of 1.0 fails the speech-shape band
    for _ in 0..60 {
        detector.process_frame(&loud(), &quiet(), &hints, now);
        now += Duration::from_millis(100);
    }

    assert_eq!(detector.state(), ConversationState::Idle);
    assert!(events.try_recv().is_err());
}

#[test]
fn test_continuous_audio_does_not_activate() {
    let (mut detector, _events) = ConversationDetector::new(DetectorConfig::default());
    let hints = ContextHints::default();
    let mut now = Instant::now();

    // Music or a video: both channels continuously active, no structure
    for _ in 0..60 {
        detector.process_frame(&loud(), &loud(), &hints, now);
        now += Duration::from_millis(100);
    }

    assert_eq!(detector.state(), ConversationState::Idle);
}

#[test]
fn test_silence_timeout_deactivates_and_resets() {
    let (mut detector, mut events) = ConversationDetector::new(DetectorConfig::default());
    let hints = ContextHints::default();
    let mut now = Instant::now();

    for i in 0..40 {
        let (mic, system) = conversation_phase(i);
        detector.process_frame(&mic, &system, &hints, now);
        now += Duration::from_millis(100);
    }
    assert_eq!(detector.state(), ConversationState::Active);

    // Two minutes of silence on the simulated clock
    now += Duration::from_secs(121);
    detector.process_frame(&quiet(), &quiet(), &hints, now);

    assert_eq!(detector.state(), ConversationState::Idle);
    assert_eq!(detector.confidence(), 0.0);
    assert!(detector.started_at().is_none());

    // Started then Ended, in order
    assert!(matches!(
        events.try_recv(),
        Ok(ConversationEvent::Started { .. })
    ));
    assert!(matches!(events.try_recv(), Ok(ConversationEvent::Ended { .. })));
}

#[test]
fn test_explicit_stop_ends_conversation() {
    let (mut detector, mut events) = ConversationDetector::new(DetectorConfig::default());
    let hints = ContextHints::default();
    let mut now = Instant::now();

    for i in 0..40 {
        let (mic, system) = conversation_phase(i);
        detector.process_frame(&mic, &system, &hints, now);
        now += Duration::from_millis(100);
    }
    assert_eq!(detector.state(), ConversationState::Active);

    detector.stop(now);

    assert_eq!(detector.state(), ConversationState::Idle);
    assert!(matches!(
        events.try_recv(),
        Ok(ConversationEvent::Started { .. })
    ));
    assert!(matches!(events.try_recv(), Ok(ConversationEvent::Ended { .. })));
}

#[test]
fn test_meeting_app_hint_accelerates_detection() {
    let hints = ContextHints {
        meeting_app: Some("Zoom".to_string()),
        calendar_event_active: false,
    };
    let no_hints = ContextHints::default();

    let (mut with_hint, _e1) = ConversationDetector::new(DetectorConfig::default());
    let (mut without_hint, _e2) = ConversationDetector::new(DetectorConfig::default());
    let mut now = Instant::now();

    // Early in a call only the remote side is speaking
    for _ in 0..12 {
        with_hint.process_frame(&quiet(), &loud(), &hints, now);
        without_hint.process_frame(&quiet(), &loud(), &no_hints, now);
        now += Duration::from_millis(100);
    }

    assert!(with_hint.confidence() > without_hint.confidence());
}

#[test]
fn test_calendar_boost_requires_activity() {
    let hints = ContextHints {
        meeting_app: None,
        calendar_event_active: true,
    };

    let (mut detector, _events) = ConversationDetector::new(DetectorConfig::default());
    let mut now = Instant::now();

    // Calendar event but total silence: no boost applies
    for _ in 0..20 {
        detector.process_frame(&quiet(), &quiet(), &hints, now);
        now += Duration::from_millis(100);
    }
    assert_eq!(detector.state(), ConversationState::Idle);
    assert_eq!(detector.confidence(), 0.0);

    // First audible frame combines with the calendar hint
    detector.process_frame(&loud(), &quiet(), &hints, now);
    assert!(detector.confidence() >= 0.6);
    assert!(detector.calendar_start_ready(&hints));
}
