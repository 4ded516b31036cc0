// In-memory meeting record
//
// Holds the live transcript, participant list, and meeting classification
// for one recording. Presentation layers observe it through a shared handle;
// persistence receives a FinalizedMeeting when recording stops.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::diarize::SpeakerEmbedding;

/// Meeting classification derived from the detected speaker count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeetingType {
    Unknown,
    OneOnOne,
    Group,
}

impl MeetingType {
    /// 0 or 1 speakers is inconclusive; 2 is a one-on-one; more is a group
    pub fn from_speaker_count(count: usize) -> Self {
        match count {
            0 | 1 => MeetingType::Unknown,
            2 => MeetingType::OneOnOne,
            _ => MeetingType::Group,
        }
    }
}

/// A speaker observed by the diarization engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub speaker_id: i32,
    /// Resolved name, if any layer above supplies one
    pub display_name: Option<String>,
    /// Total speaking time in seconds
    pub speaking_time_secs: f64,
    pub is_speaking: bool,
    /// Attribution confidence (0.0 to 1.0)
    pub confidence: f32,
}

/// One transcribed window of the recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    /// Seconds since recording started (not wall-clock time)
    pub timestamp_secs: f64,
    /// Dominant speaker for this window, when diarization is available
    pub speaker_id: Option<i32>,
    pub confidence: f32,
    pub finalized: bool,
}

/// Live record of one recording in progress
#[derive(Debug, Clone)]
pub struct MeetingRecord {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub is_recording: bool,
    pub duration_secs: f64,
    pub meeting_type: MeetingType,
    /// When the classification first moved away from Unknown
    pub meeting_type_detected_at: Option<DateTime<Utc>>,
    transcript: Vec<TranscriptSegment>,
    participants: HashMap<i32, Participant>,
}

impl MeetingRecord {
    pub fn new(id: String) -> Self {
        info!("Created meeting record: {}", id);

        Self {
            id,
            started_at: Utc::now(),
            is_recording: true,
            duration_secs: 0.0,
            meeting_type: MeetingType::Unknown,
            meeting_type_detected_at: None,
            transcript: Vec::new(),
            participants: HashMap::new(),
        }
    }

    /// Append a transcript segment. The caller is responsible for ordering;
    /// segments arrive in chunk-emission order via the resequencer.
    pub fn append_segment(&mut self, segment: TranscriptSegment) {
        debug!(
            "Transcript segment at {:.1}s: {} chars, speaker {:?}",
            segment.timestamp_secs,
            segment.text.len(),
            segment.speaker_id
        );
        self.transcript.push(segment);
    }

    pub fn transcript(&self) -> &[TranscriptSegment] {
        &self.transcript
    }

    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Insert or update the participant for a speaker id
    pub fn upsert_participant(
        &mut self,
        speaker_id: i32,
        speaking_time_secs: f64,
        is_speaking: bool,
    ) {
        let participant = self
            .participants
            .entry(speaker_id)
            .or_insert_with(|| Participant {
                speaker_id,
                display_name: None,
                speaking_time_secs: 0.0,
                is_speaking: false,
                confidence: 1.0,
            });

        participant.speaking_time_secs = speaking_time_secs;
        participant.is_speaking = is_speaking;
    }

    /// Reclassify the meeting from the current speaker count, stamping the
    /// first transition away from Unknown.
    pub fn reclassify(&mut self, speaker_count: usize) {
        let new_type = MeetingType::from_speaker_count(speaker_count);
        if new_type == self.meeting_type {
            return;
        }

        info!(
            "Meeting type changed: {:?} -> {:?} ({} speakers)",
            self.meeting_type, new_type, speaker_count
        );

        if self.meeting_type == MeetingType::Unknown && new_type != MeetingType::Unknown {
            self.meeting_type_detected_at = Some(Utc::now());
        }
        self.meeting_type = new_type;
    }

    /// Reconcile participants after the diarization engine merged speaker
    /// ids: drop any participant whose id is no longer valid, then
    /// reclassify from the surviving count.
    pub fn sync_participants(&mut self, valid_ids: &HashSet<i32>) {
        let before = self.participants.len();
        self.participants.retain(|id, _| valid_ids.contains(id));

        if self.participants.len() != before {
            info!(
                "Participant sync removed {} merged speaker(s)",
                before - self.participants.len()
            );
        }

        self.reclassify(self.participants.len());
    }
}

/// Everything handed to the persistence layer when a recording stops
#[derive(Debug, Clone)]
pub struct FinalizedMeeting {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub meeting_type: MeetingType,
    pub transcript: Vec<TranscriptSegment>,
    pub participants: Vec<Participant>,
    pub speaking_times: HashMap<i32, f64>,
    pub embeddings: Vec<SpeakerEmbedding>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meeting_type_from_speaker_count() {
        assert_eq!(MeetingType::from_speaker_count(0), MeetingType::Unknown);
        assert_eq!(MeetingType::from_speaker_count(1), MeetingType::Unknown);
        assert_eq!(MeetingType::from_speaker_count(2), MeetingType::OneOnOne);
        assert_eq!(MeetingType::from_speaker_count(3), MeetingType::Group);
        assert_eq!(MeetingType::from_speaker_count(7), MeetingType::Group);
    }

    #[test]
    fn test_reclassify_stamps_first_detection() {
        let mut record = MeetingRecord::new("m1".to_string());
        assert!(record.meeting_type_detected_at.is_none());

        record.reclassify(2);
        let first = record.meeting_type_detected_at;
        assert!(first.is_some());

        record.reclassify(4);
        // Stamp marks the first transition away from Unknown only
        assert_eq!(record.meeting_type_detected_at, first);
        assert_eq!(record.meeting_type, MeetingType::Group);
    }

    #[test]
    fn test_sync_removes_merged_participants() {
        let mut record = MeetingRecord::new("m1".to_string());
        record.upsert_participant(0, 10.0, false);
        record.upsert_participant(1, 5.0, false);
        record.upsert_participant(2, 3.0, false);
        record.reclassify(3);
        assert_eq!(record.meeting_type, MeetingType::Group);

        // Speaker 2 merged into 0
        let valid: HashSet<i32> = [0, 1].into_iter().collect();
        record.sync_participants(&valid);

        assert_eq!(record.participant_count(), 2);
        assert_eq!(record.meeting_type, MeetingType::OneOnOne);
    }

    #[test]
    fn test_upsert_updates_in_place() {
        let mut record = MeetingRecord::new("m1".to_string());
        record.upsert_participant(0, 1.0, true);
        record.upsert_participant(0, 2.5, false);

        assert_eq!(record.participant_count(), 1);
        let participant = record.participants().next().unwrap();
        assert!((participant.speaking_time_secs - 2.5).abs() < 1e-9);
        assert!(!participant.is_speaking);
    }
}
