//! Recording orchestration
//!
//! The `RecordingCoordinator` owns the concurrent pipeline for one recording
//! at a time: two capture-consumption loops feeding the shared chunk buffer,
//! fire-and-forget transcription dispatch with in-order transcript assembly,
//! the mic-only diarization feed, and participant/meeting-type bookkeeping.
//! `AutoRecorder` drives it from conversation-detection events.

pub mod auto;
pub mod coordinator;

pub use auto::AutoRecorder;
pub use coordinator::{RecorderConfig, RecordingCoordinator, RecordingStats};
