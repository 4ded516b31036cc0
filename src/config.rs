use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

use crate::audio::{ChunkBufferConfig, VadConfig};
use crate::detect::DetectorConfig;
use crate::recorder::RecorderConfig;

/// File-backed configuration for the whole pipeline.
///
/// Every tuning constant (VAD thresholds, confidence weights, durations) is
/// overridable; the defaults are the tuned values the components ship with.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub vad: VadSettings,
    #[serde(default)]
    pub detector: DetectorSettings,
    #[serde(default)]
    pub diarization: DiarizationSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "parley".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub chunk_duration_secs: u64,
    pub overlap_duration_secs: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        let chunk = ChunkBufferConfig::default();
        Self {
            sample_rate: chunk.sample_rate,
            chunk_duration_secs: chunk.chunk_duration_secs,
            overlap_duration_secs: chunk.overlap_duration_secs,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VadSettings {
    pub mic_threshold: f32,
    pub system_threshold: f32,
}

impl Default for VadSettings {
    fn default() -> Self {
        let vad = VadConfig::default();
        Self {
            mic_threshold: vad.mic_threshold,
            system_threshold: vad.system_threshold,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DetectorSettings {
    pub start_confidence: f32,
    pub silence_timeout_secs: u64,
    pub alternation_weight: f32,
    pub mutual_activity_weight: f32,
    pub speech_shape_weight: f32,
    pub meeting_app_boost: f32,
    pub meeting_app_speech_boost: f32,
    pub calendar_boost: f32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        let detector = DetectorConfig::default();
        Self {
            start_confidence: detector.start_confidence,
            silence_timeout_secs: detector.silence_timeout.as_secs(),
            alternation_weight: detector.alternation_weight,
            mutual_activity_weight: detector.mutual_activity_weight,
            speech_shape_weight: detector.speech_shape_weight,
            meeting_app_boost: detector.meeting_app_boost,
            meeting_app_speech_boost: detector.meeting_app_speech_boost,
            calendar_boost: detector.calendar_boost,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DiarizationSettings {
    pub window_secs: u64,
}

impl Default for DiarizationSettings {
    fn default() -> Self {
        Self {
            window_secs: RecorderConfig::default().diarization_window_secs,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Built-in defaults when no config file is present
    pub fn defaults() -> Self {
        Self {
            service: ServiceConfig::default(),
            audio: AudioSettings::default(),
            vad: VadSettings::default(),
            detector: DetectorSettings::default(),
            diarization: DiarizationSettings::default(),
        }
    }

    pub fn chunk_buffer_config(&self) -> ChunkBufferConfig {
        ChunkBufferConfig {
            sample_rate: self.audio.sample_rate,
            chunk_duration_secs: self.audio.chunk_duration_secs,
            overlap_duration_secs: self.audio.overlap_duration_secs,
            ..ChunkBufferConfig::default()
        }
    }

    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            start_confidence: self.detector.start_confidence,
            silence_timeout: Duration::from_secs(self.detector.silence_timeout_secs),
            alternation_weight: self.detector.alternation_weight,
            mutual_activity_weight: self.detector.mutual_activity_weight,
            speech_shape_weight: self.detector.speech_shape_weight,
            meeting_app_boost: self.detector.meeting_app_boost,
            meeting_app_speech_boost: self.detector.meeting_app_speech_boost,
            calendar_boost: self.detector.calendar_boost,
            vad: VadConfig {
                mic_threshold: self.vad.mic_threshold,
                system_threshold: self.vad.system_threshold,
            },
            ..DetectorConfig::default()
        }
    }

    pub fn recorder_config(&self) -> RecorderConfig {
        RecorderConfig {
            chunk: self.chunk_buffer_config(),
            diarization_window_secs: self.diarization.window_secs,
            ..RecorderConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_carry_tuned_values() {
        let cfg = Config::defaults();

        assert_eq!(cfg.audio.sample_rate, 16000);
        assert_eq!(cfg.audio.chunk_duration_secs, 15);
        assert!((cfg.detector.start_confidence - 0.7).abs() < 1e-6);
        assert_eq!(cfg.detector.silence_timeout_secs, 120);
        assert!(cfg.vad.mic_threshold < cfg.vad.system_threshold);
    }

    #[test]
    fn test_component_configs_reflect_settings() {
        let mut cfg = Config::defaults();
        cfg.audio.chunk_duration_secs = 30;
        cfg.detector.start_confidence = 0.9;

        assert_eq!(cfg.chunk_buffer_config().chunk_duration_secs, 30);
        assert!((cfg.detector_config().start_confidence - 0.9).abs() < 1e-6);
    }
}
