use thiserror::Error;

/// Errors that abort `start` before a meeting record is retained.
///
/// Everything else in the pipeline is per-operation recoverable: a failed
/// chunk transcription or diarization call is logged and skipped, and a
/// diarization engine that fails to initialize degrades the recording to
/// unlabeled segments instead of aborting it.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("recording already in progress")]
    AlreadyRecording,

    #[error("transcription engine failed to initialize: {0}")]
    TranscriptionInit(anyhow::Error),

    #[error("audio capture failed to start: {0}")]
    Capture(anyhow::Error),
}
