use anyhow::Result;
use clap::Parser;
use std::time::{Duration, Instant};
use tracing::info;

use parley::{AudioFile, Config, ContextHintSource, ContextHints, ConversationDetector};

/// Offline conversation-detection demo: replays a pair of WAV files (mic and
/// system audio) through the detector and reports detected conversation
/// spans.
#[derive(Parser, Debug)]
#[command(name = "parley", version)]
struct Args {
    /// Config file (without extension), e.g. config/parley
    #[arg(long)]
    config: Option<String>,

    /// Microphone recording (16kHz mono WAV)
    #[arg(long)]
    mic: String,

    /// System audio recording (16kHz mono WAV)
    #[arg(long)]
    system: String,

    /// Treat a calendar event as in progress
    #[arg(long)]
    calendar: bool,

    /// Treat this meeting application as frontmost
    #[arg(long)]
    meeting_app: Option<String>,
}

/// Hint source backed by the command-line flags; a live deployment would
/// poll the frontmost application and the calendar here instead.
struct CliHints {
    meeting_app: Option<String>,
    calendar_event_active: bool,
}

impl ContextHintSource for CliHints {
    fn hints(&self) -> ContextHints {
        ContextHints {
            meeting_app: self.meeting_app.clone(),
            calendar_event_active: self.calendar_event_active,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::defaults(),
    };

    info!("Parley v0.1.0 ({})", cfg.service.name);

    let mic = AudioFile::open(&args.mic)?;
    let system = AudioFile::open(&args.system)?;

    let frame_len = (cfg.audio.sample_rate / 10) as usize; // 100ms frames
    let (mut detector, mut events) = ConversationDetector::new(cfg.detector_config());
    let hint_source = CliHints {
        meeting_app: args.meeting_app.clone(),
        calendar_event_active: args.calendar,
    };

    // Replay both files frame by frame on a simulated 100ms clock
    let mut now = Instant::now();
    let frames = (mic.samples.len().max(system.samples.len())).div_ceil(frame_len);

    for i in 0..frames {
        let start = i * frame_len;
        let mic_frame = slice_frame(&mic.samples, start, frame_len);
        let system_frame = slice_frame(&system.samples, start, frame_len);

        detector.process_frame(mic_frame, system_frame, &hint_source.hints(), now);
        now += Duration::from_millis(100);
    }
    detector.stop(now);

    let mut conversations = 0;
    while let Ok(event) = events.try_recv() {
        if let parley::ConversationEvent::Started { confidence, .. } = &event {
            conversations += 1;
            info!("Conversation start detected (confidence {:.2})", confidence);
        }
    }

    let summary = serde_json::json!({
        "frames_processed": frames,
        "conversations_detected": conversations,
        "final_state": format!("{:?}", detector.state()),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

fn slice_frame(samples: &[f32], start: usize, len: usize) -> &[f32] {
    if start >= samples.len() {
        return &[];
    }
    &samples[start..(start + len).min(samples.len())]
}
