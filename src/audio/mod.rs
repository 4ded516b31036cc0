pub mod buffer;
pub mod capture;
pub mod file;
pub mod vad;

pub use buffer::{AudioChunk, ChunkBuffer, ChunkBufferConfig};
pub use capture::{AudioFrame, AudioSource, CaptureBackend, CaptureStreams, ScriptedCapture};
pub use file::AudioFile;
pub use vad::{VadConfig, VoiceActivityDetector};
