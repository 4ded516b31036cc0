// Turn-taking and speech-shape heuristics over recent activity events
//
// A real two-way conversation alternates between the local speaker (mic)
// and the remote party (system audio), and contains pauses. Continuous
// audio such as music or a video fails both tests.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

const EVENT_CAPACITY: usize = 100;
const MIN_EVENTS: usize = 10;
const ALTERNATION_WINDOW: usize = 20;
const SPEECH_SHAPE_WINDOW: usize = 30;
const MIN_ALTERNATIONS: usize = 3;

/// One frame's worth of per-channel activity
#[derive(Debug, Clone, Copy)]
pub struct AudioEvent {
    pub mic_active: bool,
    pub system_active: bool,
    pub at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Turn {
    MicOnly,
    SystemOnly,
    /// Both active (crosstalk) or neither: no turn attribution
    Ambiguous,
}

impl AudioEvent {
    fn turn(&self) -> Turn {
        match (self.mic_active, self.system_active) {
            (true, false) => Turn::MicOnly,
            (false, true) => Turn::SystemOnly,
            _ => Turn::Ambiguous,
        }
    }

    fn any_active(&self) -> bool {
        self.mic_active || self.system_active
    }
}

/// Sliding-window analyzer for conversational structure
pub struct ConversationPatternAnalyzer {
    events: VecDeque<AudioEvent>,
}

impl ConversationPatternAnalyzer {
    pub fn new() -> Self {
        Self {
            events: VecDeque::with_capacity(EVENT_CAPACITY),
        }
    }

    pub fn add_event(&mut self, mic_active: bool, system_active: bool, at: Instant) {
        if self.events.len() == EVENT_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(AudioEvent {
            mic_active,
            system_active,
            at,
        });
    }

    /// True when the most recent events show turn-taking between the two
    /// channels: at least 3 speaker changes over the newest 20 events.
    pub fn has_alternating_pattern(&self) -> bool {
        if self.events.len() < MIN_EVENTS {
            return false;
        }

        let recent = self.recent(ALTERNATION_WINDOW);

        let mut alternations = 0;
        let mut previous: Option<Turn> = None;

        for event in recent {
            let turn = event.turn();
            if turn == Turn::Ambiguous {
                continue;
            }
            if let Some(prev) = previous {
                if turn != prev {
                    alternations += 1;
                }
            }
            previous = Some(turn);
        }

        alternations >= MIN_ALTERNATIONS
    }

    /// True when the activity ratio over the newest 30 events sits strictly
    /// between 0.3 and 0.8: speech with natural pauses, not continuous audio
    /// and not near-silence.
    pub fn has_speech_characteristics(&self) -> bool {
        if self.events.len() < MIN_EVENTS {
            return false;
        }

        let recent: Vec<_> = self.recent(SPEECH_SHAPE_WINDOW).collect();
        let active = recent.iter().filter(|e| e.any_active()).count();
        let ratio = active as f32 / recent.len() as f32;

        ratio > 0.3 && ratio < 0.8
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Wall time covered by the buffered events, oldest to newest
    pub fn window_span(&self) -> Duration {
        match (self.events.front(), self.events.back()) {
            (Some(first), Some(last)) => last.at.duration_since(first.at),
            _ => Duration::ZERO,
        }
    }

    pub fn reset(&mut self) {
        self.events.clear();
    }

    /// Newest `count` events, oldest first
    fn recent(&self, count: usize) -> impl Iterator<Item = &AudioEvent> {
        let skip = self.events.len().saturating_sub(count);
        self.events.iter().skip(skip)
    }
}

impl Default for ConversationPatternAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
