use anyhow::Result;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

/// Audio stream source type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioSource {
    /// Microphone input (the local party)
    Microphone,
    /// System audio (the remote party: call apps, browser, etc.)
    System,
}

/// Raw audio delivered by a capture backend (f32 PCM, mono)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
    /// Which stream this frame came from
    pub source: AudioSource,
}

/// The two independent streams a capture backend produces
pub struct CaptureStreams {
    pub mic: mpsc::Receiver<AudioFrame>,
    pub system: mpsc::Receiver<AudioFrame>,
}

/// Audio capture backend trait
///
/// The real backend is platform capture machinery outside this crate
/// (microphone device plus a system-audio tap). Implementations deliver two
/// independent frame streams at a fixed sample rate and report fatal
/// capture-start errors (permission denied, no capturable source) from
/// `start`.
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Start capturing audio from both sources
    async fn start(&mut self) -> Result<CaptureStreams>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Capture backend that replays preloaded sample buffers on a timer.
///
/// Used by the demo binary (fed from WAV fixtures) and by integration tests.
/// Each source's samples are sliced into `frame_duration` frames and sent at
/// that cadence until exhausted, then the stream closes.
pub struct ScriptedCapture {
    sample_rate: u32,
    frame_duration: Duration,
    mic_samples: Vec<f32>,
    system_samples: Vec<f32>,
    capturing: bool,
    /// When true, frames are sent back-to-back without sleeping
    realtime: bool,
}

impl ScriptedCapture {
    pub fn new(sample_rate: u32, mic_samples: Vec<f32>, system_samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            frame_duration: Duration::from_millis(100),
            mic_samples,
            system_samples,
            capturing: false,
            realtime: true,
        }
    }

    /// Deliver frames as fast as possible instead of at capture cadence
    pub fn immediate(mut self) -> Self {
        self.realtime = false;
        self
    }

    fn spawn_feeder(
        samples: Vec<f32>,
        source: AudioSource,
        sample_rate: u32,
        frame_duration: Duration,
        realtime: bool,
    ) -> mpsc::Receiver<AudioFrame> {
        let (tx, rx) = mpsc::channel(100);
        let frame_len =
            (sample_rate as u64 * frame_duration.as_millis() as u64 / 1000) as usize;

        tokio::spawn(async move {
            let mut timestamp_ms = 0u64;

            for frame_samples in samples.chunks(frame_len.max(1)) {
                let frame = AudioFrame {
                    samples: frame_samples.to_vec(),
                    sample_rate,
                    timestamp_ms,
                    source,
                };

                if tx.send(frame).await.is_err() {
                    break; // Receiver dropped, stop feeding
                }

                timestamp_ms += frame_duration.as_millis() as u64;
                if realtime {
                    tokio::time::sleep(frame_duration).await;
                }
            }
        });

        rx
    }
}

#[async_trait::async_trait]
impl CaptureBackend for ScriptedCapture {
    async fn start(&mut self) -> Result<CaptureStreams> {
        info!(
            "Scripted capture starting: mic {} samples, system {} samples at {}Hz",
            self.mic_samples.len(),
            self.system_samples.len(),
            self.sample_rate
        );

        self.capturing = true;

        let mic = Self::spawn_feeder(
            std::mem::take(&mut self.mic_samples),
            AudioSource::Microphone,
            self.sample_rate,
            self.frame_duration,
            self.realtime,
        );
        let system = Self::spawn_feeder(
            std::mem::take(&mut self.system_samples),
            AudioSource::System,
            self.sample_rate,
            self.frame_duration,
            self.realtime,
        );

        Ok(CaptureStreams { mic, system })
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
