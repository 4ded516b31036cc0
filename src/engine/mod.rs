//! External engine interfaces
//!
//! Transcription and diarization run outside this crate (local models,
//! subprocess binaries, or remote services). The pipeline only depends on
//! these traits; tests and the demo binary plug in lightweight fakes.

use anyhow::Result;

use crate::audio::AudioChunk;
use crate::detect::ContextHints;
use crate::diarize::DiarizationUpdate;

/// Result of transcribing one audio chunk
#[derive(Debug, Clone)]
pub struct Transcription {
    pub text: String,
    /// Confidence score (0.0 to 1.0), if the engine reports one
    pub confidence: Option<f32>,
}

/// Speech-to-text engine consuming one mixed chunk at a time.
///
/// Per-chunk errors are non-fatal to the recording; only `initialize`
/// failure aborts a start.
#[async_trait::async_trait]
pub trait TranscriptionEngine: Send + Sync {
    /// Load models / warm up. Called lazily from the first `start` unless
    /// pre-warmed by the embedder.
    async fn initialize(&self) -> Result<()>;

    fn is_initialized(&self) -> bool;

    async fn transcribe(&self, chunk: &AudioChunk) -> Result<Transcription>;
}

/// Speaker diarization engine consuming mic-only audio.
///
/// The engine keeps internal speaker state across calls and re-reports its
/// full latest segmentation each time (speaker ids may merge between
/// reports). Initialization failure is non-fatal: the pipeline degrades to
/// unlabeled transcript segments.
#[async_trait::async_trait]
pub trait DiarizationEngine: Send + Sync {
    async fn initialize(&self) -> Result<()>;

    /// Feed a window of mic audio and get the latest full segmentation
    async fn process(&self, samples: &[f32], sample_rate: u32) -> Result<DiarizationUpdate>;

    /// Final pass over everything seen; called once at recording end
    async fn finalize(&self) -> Result<DiarizationUpdate>;
}

/// Source of external context signals (frontmost meeting app, calendar).
///
/// Polled on the frame-processing path; advisory only.
pub trait ContextHintSource: Send + Sync {
    fn hints(&self) -> ContextHints;
}

/// Hint source that reports nothing; detection then relies purely on the
/// audio signals.
pub struct NoHints;

impl ContextHintSource for NoHints {
    fn hints(&self) -> ContextHints {
        ContextHints::default()
    }
}
