// Integration tests for diarization alignment and participant bookkeeping

use std::collections::HashSet;

use parley::{DiarizationSegment, MeetingRecord, MeetingType, SegmentAligner};

fn segment(speaker_id: i32, start_secs: f32, end_secs: f32) -> DiarizationSegment {
    DiarizationSegment {
        speaker_id,
        start_secs,
        end_secs,
        embedding: vec![0.0; 8],
    }
}

#[test]
fn test_majority_overlap_vote_within_transcript_window() {
    let mut aligner = SegmentAligner::new();
    aligner.update(vec![
        segment(0, 12.0, 18.0), // 3s inside [15, 30)
        segment(1, 17.0, 29.0), // 12s inside [15, 30)
        segment(0, 29.5, 40.0), // 0.5s inside [15, 30)
    ]);

    // Window matching a just-produced 15s transcript chunk
    assert_eq!(aligner.dominant_speaker(15.0, 15.0), Some(1));
}

#[test]
fn test_partial_overlaps_clip_to_window() {
    let mut aligner = SegmentAligner::new();
    aligner.update(vec![
        segment(0, 0.0, 11.0),  // 1s inside [10, 20)
        segment(1, 18.0, 60.0), // 2s inside [10, 20)
    ]);

    assert_eq!(aligner.dominant_speaker(10.0, 10.0), Some(1));
}

#[test]
fn test_window_with_no_segments_has_no_speaker() {
    let mut aligner = SegmentAligner::new();
    aligner.update(vec![segment(0, 0.0, 5.0)]);

    assert_eq!(aligner.dominant_speaker(30.0, 15.0), None);
    assert_eq!(SegmentAligner::new().dominant_speaker(0.0, 15.0), None);
}

#[test]
fn test_speaking_times_accumulate_across_segments() {
    let mut aligner = SegmentAligner::new();
    aligner.update(vec![
        segment(0, 0.0, 10.0),
        segment(1, 10.0, 14.0),
        segment(0, 14.0, 20.0),
        segment(1, 20.0, 21.5),
    ]);

    let times = aligner.speaking_times();
    assert!((times[&0] - 16.0).abs() < 1e-4);
    assert!((times[&1] - 5.5).abs() < 1e-4);

    let speakers = aligner.unique_speakers();
    assert_eq!(speakers, [0, 1].into_iter().collect::<HashSet<_>>());
}

#[test]
fn test_participant_sync_after_speaker_merge() {
    let mut record = MeetingRecord::new("meeting-test".to_string());

    // Diarization initially reports three speakers
    for id in 0..3 {
        record.upsert_participant(id, 5.0, false);
    }
    record.reclassify(3);
    assert_eq!(record.meeting_type, MeetingType::Group);

    // Engine later merges speaker 2 into speaker 0 and re-reports
    let mut aligner = SegmentAligner::new();
    aligner.update(vec![segment(0, 0.0, 12.0), segment(1, 12.0, 20.0)]);

    record.sync_participants(&aligner.unique_speakers());

    assert_eq!(record.participant_count(), 2);
    assert!(record.participants().all(|p| p.speaker_id != 2));
    // Meeting type recomputed from the surviving participant count
    assert_eq!(record.meeting_type, MeetingType::OneOnOne);
}
