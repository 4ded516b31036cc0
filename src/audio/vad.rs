// RMS energy voice activity detection
//
// One detector instance exists per channel (mic, system), each with its own
// fixed sensitivity threshold. The threshold is deliberately not derived from
// the recent-energy window: an adaptive median baseline silences itself once
// speech raises its own reference level. The window exists for diagnostics
// only.

use std::collections::VecDeque;
use tracing::trace;

const ENERGY_WINDOW_CAPACITY: usize = 20;

/// Per-channel sensitivity thresholds.
///
/// The mic channel is typically closer to the speaker's mouth and runs more
/// sensitive (lower threshold) than system audio. Both are tuning parameters,
/// not derived values.
#[derive(Debug, Clone)]
pub struct VadConfig {
    pub mic_threshold: f32,
    pub system_threshold: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            mic_threshold: 0.010,
            system_threshold: 0.015,
        }
    }
}

/// Speech/silence classifier for one audio channel
pub struct VoiceActivityDetector {
    threshold: f32,
    recent_energies: VecDeque<f32>,
}

impl VoiceActivityDetector {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            recent_energies: VecDeque::with_capacity(ENERGY_WINDOW_CAPACITY),
        }
    }

    /// Classify a frame as speech (true) or silence (false)
    pub fn detect_speech(&mut self, samples: &[f32]) -> bool {
        let energy = rms_energy(samples);

        if self.recent_energies.len() == ENERGY_WINDOW_CAPACITY {
            self.recent_energies.pop_front();
        }
        self.recent_energies.push_back(energy);

        let active = energy > self.threshold;
        trace!("VAD: energy={:.4}, threshold={:.4}, active={}", energy, self.threshold, active);
        active
    }

    /// Recent frame energies, oldest first (diagnostics only)
    pub fn recent_energies(&self) -> impl Iterator<Item = f32> + '_ {
        self.recent_energies.iter().copied()
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn reset(&mut self) {
        self.recent_energies.clear();
    }
}

/// Root mean square energy over a frame
fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
