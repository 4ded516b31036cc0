// Conversation start/stop detection
//
// Combines per-channel voice activity, turn-taking heuristics, and external
// context hints into a confidence score, and drives an Idle/Active state
// machine. Transitions are published on a bounded event channel rather than
// through callbacks, so listeners are decoupled and ordering is explicit.

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::pattern::ConversationPatternAnalyzer;
use crate::audio::{VadConfig, VoiceActivityDetector};

const ACTIVITY_WINDOW_CAPACITY: usize = 10;
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Detector state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Idle,
    Active,
}

/// Conversation lifecycle notifications
#[derive(Debug, Clone)]
pub enum ConversationEvent {
    Started { at: Instant, confidence: f32 },
    Ended { at: Instant },
}

/// External context signals; advisory only, never required
#[derive(Debug, Clone, Default)]
pub struct ContextHints {
    /// Name of a known meeting application currently frontmost, if any
    pub meeting_app: Option<String>,
    /// Whether a calendar event is currently in progress
    pub calendar_event_active: bool,
}

/// Confidence weights and thresholds.
///
/// The literal defaults are tuned values, not derived ones; all of them are
/// exposed through the config file.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Confidence at or above which Idle transitions to Active
    pub start_confidence: f32,
    /// Sustained silence after which Active falls back to Idle
    pub silence_timeout: Duration,
    /// Both channel activity rates must exceed this for the mutual-activity term
    pub activity_rate_floor: f32,
    /// Weight for the turn-taking signal
    pub alternation_weight: f32,
    /// Maximum weight for mutual channel activity
    pub mutual_activity_weight: f32,
    /// Weight for the speech-shape signal
    pub speech_shape_weight: f32,
    /// Boost when a known meeting app is frontmost
    pub meeting_app_boost: f32,
    /// Additional boost when any speech is present while a meeting app is frontmost
    pub meeting_app_speech_boost: f32,
    /// Boost when a calendar event is in progress and any channel is active
    pub calendar_boost: f32,
    /// Per-channel VAD sensitivity
    pub vad: VadConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            start_confidence: 0.7,
            silence_timeout: Duration::from_secs(120),
            activity_rate_floor: 0.2,
            alternation_weight: 0.4,
            mutual_activity_weight: 0.3,
            speech_shape_weight: 0.2,
            meeting_app_boost: 0.3,
            meeting_app_speech_boost: 0.2,
            calendar_boost: 0.6,
            vad: VadConfig::default(),
        }
    }
}

/// Decides, without user input, whether a two-way conversation is occurring
pub struct ConversationDetector {
    config: DetectorConfig,
    mic_vad: VoiceActivityDetector,
    system_vad: VoiceActivityDetector,
    analyzer: ConversationPatternAnalyzer,
    mic_window: VecDeque<bool>,
    system_window: VecDeque<bool>,
    state: ConversationState,
    confidence: f32,
    started_at: Option<Instant>,
    last_activity_at: Option<Instant>,
    events_tx: mpsc::Sender<ConversationEvent>,
}

impl ConversationDetector {
    /// Create a detector and the receiving end of its event channel
    pub fn new(config: DetectorConfig) -> (Self, mpsc::Receiver<ConversationEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let detector = Self {
            mic_vad: VoiceActivityDetector::new(config.vad.mic_threshold),
            system_vad: VoiceActivityDetector::new(config.vad.system_threshold),
            config,
            analyzer: ConversationPatternAnalyzer::new(),
            mic_window: VecDeque::with_capacity(ACTIVITY_WINDOW_CAPACITY),
            system_window: VecDeque::with_capacity(ACTIVITY_WINDOW_CAPACITY),
            state: ConversationState::Idle,
            confidence: 0.0,
            started_at: None,
            last_activity_at: None,
            events_tx,
        };

        (detector, events_rx)
    }

    /// Process one frame pair from the two capture streams.
    ///
    /// `now` is passed explicitly so the silence timeout can be driven by a
    /// simulated clock in tests.
    pub fn process_frame(
        &mut self,
        mic_frame: &[f32],
        system_frame: &[f32],
        hints: &ContextHints,
        now: Instant,
    ) {
        let mic_active = self.mic_vad.detect_speech(mic_frame);
        let system_active = self.system_vad.detect_speech(system_frame);

        push_bounded(&mut self.mic_window, mic_active);
        push_bounded(&mut self.system_window, system_active);
        self.analyzer.add_event(mic_active, system_active, now);

        if mic_active || system_active {
            self.last_activity_at = Some(now);
        }

        self.confidence = self.compute_confidence(mic_active, system_active, hints);

        match self.state {
            ConversationState::Idle => {
                if self.confidence >= self.config.start_confidence {
                    self.transition_to_active(now);
                }
            }
            ConversationState::Active => {
                let silent_for = self
                    .last_activity_at
                    .map(|at| now.duration_since(at))
                    .unwrap_or(Duration::ZERO);

                if silent_for > self.config.silence_timeout {
                    info!(
                        "Conversation ended after {:.0}s of silence",
                        silent_for.as_secs_f64()
                    );
                    self.transition_to_idle(now);
                }
            }
        }
    }

    /// Force an Active detector back to Idle (explicit stop)
    pub fn stop(&mut self, now: Instant) {
        if self.state == ConversationState::Active {
            info!("Conversation detection stopped explicitly");
            self.transition_to_idle(now);
        }
    }

    /// Any mic activity in the current size-10 window
    pub fn mic_activity_in_window(&self) -> bool {
        self.mic_window.iter().any(|&a| a)
    }

    /// Any system activity in the current size-10 window
    pub fn system_activity_in_window(&self) -> bool {
        self.system_window.iter().any(|&a| a)
    }

    /// Calendar-gated fast path: a scheduled event plus any audio on either
    /// channel is treated as sufficient to start immediately, bypassing the
    /// confidence formula.
    pub fn calendar_start_ready(&self, hints: &ContextHints) -> bool {
        hints.calendar_event_active
            && (self.mic_activity_in_window() || self.system_activity_in_window())
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn last_activity_at(&self) -> Option<Instant> {
        self.last_activity_at
    }

    fn compute_confidence(
        &self,
        mic_active: bool,
        system_active: bool,
        hints: &ContextHints,
    ) -> f32 {
        let mut confidence = 0.0f32;

        if self.analyzer.has_alternating_pattern() {
            confidence += self.config.alternation_weight;
        }

        let mic_rate = activity_rate(&self.mic_window);
        let system_rate = activity_rate(&self.system_window);
        if mic_rate > self.config.activity_rate_floor
            && system_rate > self.config.activity_rate_floor
        {
            let scale = (2.0 * mic_rate.min(system_rate)).min(1.0);
            confidence += self.config.mutual_activity_weight * scale;
        }

        if self.analyzer.has_speech_characteristics() {
            confidence += self.config.speech_shape_weight;
        }

        if let Some(app) = &hints.meeting_app {
            confidence += self.config.meeting_app_boost;
            // With a meeting app frontmost, any speech at all is enough
            // evidence; do not wait for sustained activity
            if mic_active || system_active {
                confidence += self.config.meeting_app_speech_boost;
            }
            debug!("Meeting app hint active: {}", app);
        }

        if hints.calendar_event_active && (mic_active || system_active) {
            confidence += self.config.calendar_boost;
        }

        confidence.min(1.0)
    }

    fn transition_to_active(&mut self, now: Instant) {
        info!(
            "Conversation detected (confidence {:.2}, {:.0}s of signal)",
            self.confidence,
            self.analyzer.window_span().as_secs_f64()
        );

        self.state = ConversationState::Active;
        self.started_at = Some(now);
        self.send_event(ConversationEvent::Started {
            at: now,
            confidence: self.confidence,
        });
    }

    fn transition_to_idle(&mut self, now: Instant) {
        self.state = ConversationState::Idle;
        self.started_at = None;
        self.confidence = 0.0;
        self.analyzer.reset();
        self.mic_window.clear();
        self.system_window.clear();
        self.send_event(ConversationEvent::Ended { at: now });
    }

    fn send_event(&self, event: ConversationEvent) {
        if let Err(e) = self.events_tx.try_send(event) {
            warn!("Dropping conversation event, channel full or closed: {}", e);
        }
    }
}

fn push_bounded(window: &mut VecDeque<bool>, value: bool) {
    if window.len() == ACTIVITY_WINDOW_CAPACITY {
        window.pop_front();
    }
    window.push_back(value);
}

/// Fraction of active frames in a window; 0.0 when empty
fn activity_rate(window: &VecDeque<bool>) -> f32 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().filter(|&&a| a).count() as f32 / window.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: usize = 1600; // 100ms at 16kHz

    fn loud() -> Vec<f32> {
        vec![0.3; FRAME]
    }

    fn quiet() -> Vec<f32> {
        vec![0.0; FRAME]
    }

    #[test]
    fn test_idle_detector_has_zero_confidence() {
        let (detector, _rx) = ConversationDetector::new(DetectorConfig::default());
        assert_eq!(detector.state(), ConversationState::Idle);
        assert_eq!(detector.confidence(), 0.0);
    }

    #[test]
    fn test_silence_never_activates() {
        let (mut detector, _rx) = ConversationDetector::new(DetectorConfig::default());
        let hints = ContextHints::default();
        let now = Instant::now();

        for _ in 0..50 {
            detector.process_frame(&quiet(), &quiet(), &hints, now);
        }

        assert_eq!(detector.state(), ConversationState::Idle);
    }

    #[test]
    fn test_activity_window_queries() {
        let (mut detector, _rx) = ConversationDetector::new(DetectorConfig::default());
        let hints = ContextHints::default();
        let now = Instant::now();

        detector.process_frame(&loud(), &quiet(), &hints, now);

        assert!(detector.mic_activity_in_window());
        assert!(!detector.system_activity_in_window());
    }

    #[test]
    fn test_calendar_fast_path_needs_activity() {
        let (mut detector, _rx) = ConversationDetector::new(DetectorConfig::default());
        let hints = ContextHints {
            meeting_app: None,
            calendar_event_active: true,
        };

        assert!(!detector.calendar_start_ready(&hints));

        detector.process_frame(&loud(), &quiet(), &hints, Instant::now());
        assert!(detector.calendar_start_ready(&hints));
    }
}
