//! Speaker diarization types and transcript alignment

pub mod aligner;

pub use aligner::SegmentAligner;

use serde::{Deserialize, Serialize};

/// A time span attributed to one speaker by the diarization engine.
///
/// Consumed, never mutated, by the aligner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiarizationSegment {
    /// Engine-assigned speaker id (0, 1, 2...)
    pub speaker_id: i32,
    /// Start time in seconds, relative to recording start
    pub start_secs: f32,
    /// End time in seconds, relative to recording start
    pub end_secs: f32,
    /// Voice embedding for this segment (opaque float vector)
    pub embedding: Vec<f32>,
}

impl DiarizationSegment {
    pub fn duration_secs(&self) -> f32 {
        (self.end_secs - self.start_secs).max(0.0)
    }
}

/// Per-speaker voice embedding accumulated across a recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerEmbedding {
    pub speaker_id: i32,
    /// Opaque float vector handed to persistence for cross-meeting matching
    pub embedding: Vec<f32>,
    /// Total speech duration backing this embedding, in seconds
    pub duration_secs: f64,
}

/// Latest full segmentation reported by the diarization engine
#[derive(Debug, Clone, Default)]
pub struct DiarizationUpdate {
    pub segments: Vec<DiarizationSegment>,
    pub speaker_count: usize,
    pub embeddings: Vec<SpeakerEmbedding>,
}
