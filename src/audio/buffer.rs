// Chunk buffer for combining microphone and system audio streams
//
// Accumulates raw samples from each source independently and emits
// fixed-duration mixed chunks for transcription. A one-second tail of
// each source is retained across chunk boundaries so words spanning a
// boundary are not lost.
//
// The buffer itself is single-threaded; the recording coordinator wraps
// it in an async mutex so the two capture loops cannot interleave an
// append with an in-flight mix.

use std::collections::VecDeque;
use tracing::{debug, info};

use super::capture::AudioSource;

/// Configuration for the chunk buffer
#[derive(Debug, Clone)]
pub struct ChunkBufferConfig {
    /// Sample rate of both input streams (Hz)
    pub sample_rate: u32,
    /// Duration of each emitted chunk in seconds (default: 15)
    pub chunk_duration_secs: u64,
    /// Tail retained from each source across chunk boundaries (default: 1s)
    pub overlap_duration_secs: u64,
    /// Any sample above this magnitude marks a source as carrying audio
    pub silence_floor: f32,
    /// Peak magnitude above which a mixed chunk is uniformly scaled down
    pub limiter_ceiling: f32,
}

impl Default for ChunkBufferConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            chunk_duration_secs: 15,
            overlap_duration_secs: 1,
            silence_floor: 0.001,
            limiter_ceiling: 0.95,
        }
    }
}

impl ChunkBufferConfig {
    fn target_samples(&self) -> usize {
        (self.sample_rate as u64 * self.chunk_duration_secs) as usize
    }

    fn overlap_samples(&self) -> usize {
        (self.sample_rate as u64 * self.overlap_duration_secs) as usize
    }
}

/// A mixed, fixed-duration audio window ready for transcription.
///
/// Immutable once produced.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Chunk number (0-indexed, emission order)
    pub index: usize,
    /// Start time in milliseconds since recording started
    pub start_ms: u64,
    /// Mixed mono samples (f32 PCM)
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioChunk {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn start_secs(&self) -> f64 {
        self.start_ms as f64 / 1000.0
    }
}

/// Accumulates per-source samples and emits mixed chunks
pub struct ChunkBuffer {
    config: ChunkBufferConfig,
    mic: VecDeque<f32>,
    system: VecDeque<f32>,
    chunk_index: usize,
    /// Recording-relative start of the next chunk, in samples
    next_start_samples: u64,
}

impl ChunkBuffer {
    pub fn new(config: ChunkBufferConfig) -> Self {
        info!(
            "Chunk buffer initialized: {}s chunks, {}s overlap, {}Hz",
            config.chunk_duration_secs, config.overlap_duration_secs, config.sample_rate
        );

        Self {
            config,
            mic: VecDeque::new(),
            system: VecDeque::new(),
            chunk_index: 0,
            next_start_samples: 0,
        }
    }

    /// Append samples from one source. Returns a mixed chunk when either
    /// source has reached the target duration.
    pub fn push(&mut self, source: AudioSource, samples: &[f32]) -> Option<AudioChunk> {
        match source {
            AudioSource::Microphone => self.mic.extend(samples.iter().copied()),
            AudioSource::System => self.system.extend(samples.iter().copied()),
        }

        let target = self.config.target_samples();
        if self.mic.len().max(self.system.len()) >= target {
            Some(self.emit(true))
        } else {
            None
        }
    }

    /// Force emission of whatever is buffered, clearing both sources.
    ///
    /// Used at recording end; no overlap is retained.
    pub fn flush(&mut self) -> Option<AudioChunk> {
        if self.mic.is_empty() && self.system.is_empty() {
            return None;
        }

        let chunk = self.emit(false);
        info!(
            "Flushed final chunk {} ({:.1}s)",
            chunk.index,
            chunk.duration_secs()
        );
        Some(chunk)
    }

    /// Clear both source buffers and reset chunk numbering
    pub fn reset(&mut self) {
        self.mic.clear();
        self.system.clear();
        self.chunk_index = 0;
        self.next_start_samples = 0;
    }

    /// Buffered duration of the fuller source, in seconds
    pub fn buffered_secs(&self) -> f64 {
        self.mic.len().max(self.system.len()) as f64 / self.config.sample_rate as f64
    }

    fn emit(&mut self, retain_overlap: bool) -> AudioChunk {
        let mic: Vec<f32> = self.mic.iter().copied().collect();
        let system: Vec<f32> = self.system.iter().copied().collect();

        let samples = mix_sources(
            &mic,
            &system,
            self.config.silence_floor,
            self.config.limiter_ceiling,
        );

        let emitted_len = samples.len();
        let overlap = self.config.overlap_samples();

        if retain_overlap {
            if self.mic.len() > overlap {
                self.mic.drain(..self.mic.len() - overlap);
            }
            if self.system.len() > overlap {
                self.system.drain(..self.system.len() - overlap);
            }
        } else {
            self.mic.clear();
            self.system.clear();
        }

        let chunk = AudioChunk {
            index: self.chunk_index,
            start_ms: self.next_start_samples * 1000 / self.config.sample_rate as u64,
            samples,
            sample_rate: self.config.sample_rate,
        };

        debug!(
            "Emitted chunk {} at {}ms ({} samples, overlap retained: {})",
            chunk.index, chunk.start_ms, emitted_len, retain_overlap
        );

        self.chunk_index += 1;
        let consumed = if retain_overlap {
            emitted_len.saturating_sub(overlap)
        } else {
            emitted_len
        };
        self.next_start_samples += consumed as u64;

        chunk
    }
}

/// Mix two mono sample buffers into one.
///
/// Output length is the longer of the two inputs. When both sources carry
/// audio above the silence floor their samples are summed (not averaged, so
/// simultaneous speech is not attenuated) and the whole chunk is uniformly
/// scaled down if the peak exceeds the limiter ceiling. When only one source
/// carries audio its samples pass through unmodified, zero-padded to the
/// output length. When neither does, the output is silence.
fn mix_sources(mic: &[f32], system: &[f32], silence_floor: f32, ceiling: f32) -> Vec<f32> {
    let len = mic.len().max(system.len());
    let mic_live = mic.iter().any(|s| s.abs() > silence_floor);
    let system_live = system.iter().any(|s| s.abs() > silence_floor);

    let mut mixed = vec![0.0f32; len];

    match (mic_live, system_live) {
        (true, true) => {
            for (i, out) in mixed.iter_mut().enumerate() {
                let m = mic.get(i).copied().unwrap_or(0.0);
                let s = system.get(i).copied().unwrap_or(0.0);
                *out = m + s;
            }

            let peak = mixed.iter().fold(0.0f32, |max, s| max.max(s.abs()));
            if peak > ceiling {
                let scale = ceiling / peak;
                for out in &mut mixed {
                    *out *= scale;
                }
                debug!("Soft-limited mixed chunk: peak {:.3}, scale {:.3}", peak, scale);
            }
        }
        (true, false) => mixed[..mic.len()].copy_from_slice(mic),
        (false, true) => mixed[..system.len()].copy_from_slice(system),
        (false, false) => {}
    }

    mixed
}
