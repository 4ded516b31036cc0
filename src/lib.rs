pub mod audio;
pub mod config;
pub mod detect;
pub mod diarize;
pub mod engine;
pub mod error;
pub mod meeting;
pub mod recorder;

pub use audio::{
    AudioChunk, AudioFile, AudioFrame, AudioSource, CaptureBackend, CaptureStreams, ChunkBuffer,
    ChunkBufferConfig, ScriptedCapture, VadConfig, VoiceActivityDetector,
};
pub use config::Config;
pub use detect::{
    ContextHints, ConversationDetector, ConversationEvent, ConversationState, DetectorConfig,
};
pub use diarize::{DiarizationSegment, DiarizationUpdate, SegmentAligner, SpeakerEmbedding};
pub use engine::{
    ContextHintSource, DiarizationEngine, NoHints, TranscriptionEngine, Transcription,
};
pub use error::StartError;
pub use meeting::{
    FinalizedMeeting, MeetingRecord, MeetingType, Participant, TranscriptSegment,
};
pub use recorder::{AutoRecorder, RecorderConfig, RecordingCoordinator, RecordingStats};
