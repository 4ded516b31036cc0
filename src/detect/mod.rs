//! Conversation detection
//!
//! Decides whether a genuine two-way conversation is occurring by combining:
//! - Per-channel voice activity (RMS energy against fixed thresholds)
//! - Turn-taking and speech-shape heuristics over recent activity events
//! - External context hints (frontmost meeting app, calendar events)
//!
//! The detector is a small state machine whose transitions are published on
//! an event channel, typically consumed by the auto-detect controller.

pub mod detector;
pub mod pattern;

pub use detector::{
    ContextHints, ConversationDetector, ConversationEvent, ConversationState, DetectorConfig,
};
pub use pattern::{AudioEvent, ConversationPatternAnalyzer};
