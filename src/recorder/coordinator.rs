// Recording lifecycle orchestration
//
// Owns the two capture-consumption loops, chunk dispatch to transcription,
// the parallel diarization feed, and participant bookkeeping. The chunk
// buffer and diarization buffer are the only state reachable from both
// loops; each lives behind an async mutex so appends and mixes cannot
// interleave.
//
// Transcription calls are fire-and-forget relative to audio ingestion, but
// segments pass through a resequencer so the transcript is appended in
// chunk-emission order even when engine calls complete out of order.

use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::audio::{AudioChunk, AudioFrame, CaptureBackend, ChunkBuffer, ChunkBufferConfig};
use crate::diarize::{SegmentAligner, SpeakerEmbedding};
use crate::engine::{DiarizationEngine, TranscriptionEngine};
use crate::error::StartError;
use crate::meeting::{FinalizedMeeting, MeetingRecord, Participant, TranscriptSegment};

/// Recording pipeline configuration
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub chunk: ChunkBufferConfig,
    /// Mic audio accumulated before each diarization call, in seconds
    pub diarization_window_secs: u64,
    /// A speaker whose segments cover the tail of the segmentation within
    /// this many seconds is reported as currently speaking
    pub current_speaker_window_secs: f64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            chunk: ChunkBufferConfig::default(),
            diarization_window_secs: 15,
            current_speaker_window_secs: 2.0,
        }
    }
}

/// Snapshot of recording progress for presentation layers
#[derive(Debug, Clone, serde::Serialize)]
pub struct RecordingStats {
    pub is_recording: bool,
    pub duration_secs: f64,
    pub chunks_emitted: usize,
    pub transcript_segments: usize,
    pub participant_count: usize,
}

/// Reorders transcript segments back into chunk-emission order.
///
/// A failed or empty chunk completes with `None` so later chunks are not
/// held up behind it.
struct Resequencer {
    next_index: usize,
    pending: BTreeMap<usize, Option<TranscriptSegment>>,
}

impl Resequencer {
    fn new() -> Self {
        Self {
            next_index: 0,
            pending: BTreeMap::new(),
        }
    }

    fn reset(&mut self) {
        self.next_index = 0;
        self.pending.clear();
    }

    /// Record completion of one chunk; returns every segment now ready to
    /// append, in order.
    fn complete(
        &mut self,
        index: usize,
        segment: Option<TranscriptSegment>,
    ) -> Vec<TranscriptSegment> {
        self.pending.insert(index, segment);

        let mut ready = Vec::new();
        while let Some(slot) = self.pending.remove(&self.next_index) {
            self.next_index += 1;
            if let Some(segment) = slot {
                ready.push(segment);
            }
        }
        ready
    }
}

/// Orchestrates concurrent capture consumption, transcription and
/// diarization dispatch, and meeting bookkeeping for one recording at a time
pub struct RecordingCoordinator {
    config: RecorderConfig,

    capture: Mutex<Box<dyn CaptureBackend>>,
    transcription: Arc<dyn TranscriptionEngine>,
    diarization: Arc<dyn DiarizationEngine>,

    chunk_buffer: Arc<Mutex<ChunkBuffer>>,
    diarization_buffer: Arc<Mutex<Vec<f32>>>,
    aligner: Arc<Mutex<SegmentAligner>>,
    resequencer: Arc<Mutex<Resequencer>>,
    meeting: Arc<Mutex<Option<MeetingRecord>>>,
    latest_embeddings: Arc<Mutex<Vec<SpeakerEmbedding>>>,

    is_recording: Arc<AtomicBool>,
    /// False when the diarization engine failed to initialize; the pipeline
    /// then runs in degraded mode with unlabeled segments
    diarization_ready: Arc<AtomicBool>,
    chunks_emitted: Arc<AtomicUsize>,

    mic_task: Mutex<Option<JoinHandle<()>>>,
    system_task: Mutex<Option<JoinHandle<()>>>,
    tick_task: Mutex<Option<JoinHandle<()>>>,
    dispatch_tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl RecordingCoordinator {
    pub fn new(
        config: RecorderConfig,
        capture: Box<dyn CaptureBackend>,
        transcription: Arc<dyn TranscriptionEngine>,
        diarization: Arc<dyn DiarizationEngine>,
    ) -> Self {
        Self {
            chunk_buffer: Arc::new(Mutex::new(ChunkBuffer::new(config.chunk.clone()))),
            config,
            capture: Mutex::new(capture),
            transcription,
            diarization,
            diarization_buffer: Arc::new(Mutex::new(Vec::new())),
            aligner: Arc::new(Mutex::new(SegmentAligner::new())),
            resequencer: Arc::new(Mutex::new(Resequencer::new())),
            meeting: Arc::new(Mutex::new(None)),
            latest_embeddings: Arc::new(Mutex::new(Vec::new())),
            is_recording: Arc::new(AtomicBool::new(false)),
            diarization_ready: Arc::new(AtomicBool::new(false)),
            chunks_emitted: Arc::new(AtomicUsize::new(0)),
            mic_task: Mutex::new(None),
            system_task: Mutex::new(None),
            tick_task: Mutex::new(None),
            dispatch_tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Start a recording.
    ///
    /// Transcription initialization and capture start are fatal: on failure
    /// no meeting record is retained. Diarization initialization failure
    /// only degrades the recording to unlabeled transcript segments.
    pub async fn start(&self) -> Result<String, StartError> {
        if self.is_recording.swap(true, Ordering::SeqCst) {
            return Err(StartError::AlreadyRecording);
        }

        // Lazily initialize transcription if the embedder did not pre-warm it
        if !self.transcription.is_initialized() {
            if let Err(e) = self.transcription.initialize().await {
                self.is_recording.store(false, Ordering::SeqCst);
                return Err(StartError::TranscriptionInit(e));
            }
        }

        match self.diarization.initialize().await {
            Ok(()) => self.diarization_ready.store(true, Ordering::SeqCst),
            Err(e) => {
                warn!(
                    "Diarization unavailable, transcript will be unlabeled: {}",
                    e
                );
                self.diarization_ready.store(false, Ordering::SeqCst);
            }
        }

        // Fresh state for this recording
        self.chunk_buffer.lock().await.reset();
        self.diarization_buffer.lock().await.clear();
        self.aligner.lock().await.reset();
        self.resequencer.lock().await.reset();
        self.latest_embeddings.lock().await.clear();
        self.chunks_emitted.store(0, Ordering::SeqCst);

        let meeting_id = format!("meeting-{}", uuid::Uuid::new_v4());
        {
            let mut meeting = self.meeting.lock().await;
            *meeting = Some(MeetingRecord::new(meeting_id.clone()));
        }

        let streams = match self.capture.lock().await.start().await {
            Ok(streams) => streams,
            Err(e) => {
                // Fatal: no meeting record survives a capture failure
                self.is_recording.store(false, Ordering::SeqCst);
                *self.meeting.lock().await = None;
                return Err(StartError::Capture(e));
            }
        };

        info!("Recording started: {}", meeting_id);

        self.spawn_mic_loop(streams.mic).await;
        self.spawn_system_loop(streams.system).await;
        self.spawn_duration_tick().await;

        Ok(meeting_id)
    }

    /// Stop the recording, flush trailing audio, and finalize the meeting
    pub async fn stop(&self) -> Result<FinalizedMeeting> {
        if !self.is_recording.swap(false, Ordering::SeqCst) {
            anyhow::bail!("recording not active");
        }

        info!("Stopping recording");

        // Stop capture first so the consumption loops see closed channels
        if let Err(e) = self.capture.lock().await.stop().await {
            warn!("Failed to stop capture backend: {}", e);
        }

        for task in [&self.mic_task, &self.system_task, &self.tick_task] {
            let handle = task.lock().await.take();
            if let Some(handle) = handle {
                if let Err(e) = handle.await {
                    error!("Capture loop panicked: {}", e);
                }
            }
        }

        // Wait for in-flight transcription/diarization dispatches
        let pending: Vec<_> = self.dispatch_tasks.lock().await.drain(..).collect();
        for result in futures::future::join_all(pending).await {
            if let Err(e) = result {
                error!("Dispatch task panicked: {}", e);
            }
        }

        // Flush the partial final chunk, transcribed like any other but
        // awaited so the transcript is complete before finalization
        let final_chunk = self.chunk_buffer.lock().await.flush();
        if let Some(chunk) = final_chunk {
            self.chunks_emitted.fetch_add(1, Ordering::SeqCst);
            self.transcribe_chunk(chunk).await;
        }

        if self.diarization_ready.load(Ordering::SeqCst) {
            let trailing: Vec<f32> = {
                let mut buffer = self.diarization_buffer.lock().await;
                buffer.drain(..).collect()
            };
            if !trailing.is_empty() {
                match self
                    .diarization
                    .process(&trailing, self.config.chunk.sample_rate)
                    .await
                {
                    Ok(update) => self.apply_diarization_update(update).await,
                    Err(e) => warn!("Trailing diarization call failed: {}", e),
                }
            }

            match self.diarization.finalize().await {
                Ok(update) => self.apply_diarization_update(update).await,
                Err(e) => warn!("Diarization finalization failed: {}", e),
            }
        }

        let mut record = self
            .meeting
            .lock()
            .await
            .take()
            .context("no active meeting record")?;

        record.is_recording = false;
        record.duration_secs = Utc::now()
            .signed_duration_since(record.started_at)
            .num_milliseconds() as f64
            / 1000.0;

        let speaking_times = self.aligner.lock().await.speaking_times().clone();
        let embeddings = self.latest_embeddings.lock().await.clone();

        info!(
            "Recording finalized: {} ({} segments, {} participants, {:.1}s)",
            record.id,
            record.transcript().len(),
            record.participant_count(),
            record.duration_secs
        );

        Ok(FinalizedMeeting {
            id: record.id.clone(),
            started_at: record.started_at,
            duration_secs: record.duration_secs,
            meeting_type: record.meeting_type,
            transcript: record.transcript().to_vec(),
            participants: record.participants().cloned().collect(),
            speaking_times,
            embeddings,
        })
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording.load(Ordering::SeqCst)
    }

    /// Live transcript view for presentation layers
    pub async fn transcript(&self) -> Vec<TranscriptSegment> {
        match self.meeting.lock().await.as_ref() {
            Some(record) => record.transcript().to_vec(),
            None => Vec::new(),
        }
    }

    /// Live participant view for presentation layers
    pub async fn participants(&self) -> Vec<Participant> {
        match self.meeting.lock().await.as_ref() {
            Some(record) => record.participants().cloned().collect(),
            None => Vec::new(),
        }
    }

    pub async fn stats(&self) -> RecordingStats {
        let (duration_secs, transcript_segments, participant_count) =
            match self.meeting.lock().await.as_ref() {
                Some(record) => (
                    record.duration_secs,
                    record.transcript().len(),
                    record.participant_count(),
                ),
                None => (0.0, 0, 0),
            };

        RecordingStats {
            is_recording: self.is_recording(),
            duration_secs,
            chunks_emitted: self.chunks_emitted.load(Ordering::SeqCst),
            transcript_segments,
            participant_count,
        }
    }

    async fn spawn_mic_loop(&self, mut rx: mpsc::Receiver<AudioFrame>) {
        let chunk_buffer = Arc::clone(&self.chunk_buffer);
        let diarization_buffer = Arc::clone(&self.diarization_buffer);
        let is_recording = Arc::clone(&self.is_recording);
        let diarization_ready = Arc::clone(&self.diarization_ready);
        let ctx = self.dispatch_context();
        let window_samples =
            (self.config.chunk.sample_rate as u64 * self.config.diarization_window_secs) as usize;

        let handle = tokio::spawn(async move {
            info!("Mic consumption loop started");

            while let Some(frame) = rx.recv().await {
                if !is_recording.load(Ordering::SeqCst) {
                    break;
                }

                let emitted = {
                    let mut buffer = chunk_buffer.lock().await;
                    buffer.push(frame.source, &frame.samples)
                };
                if let Some(chunk) = emitted {
                    ctx.dispatch_transcription(chunk).await;
                }

                // Mic-only audio feeds diarization
                let window = {
                    let mut buffer = diarization_buffer.lock().await;
                    buffer.extend_from_slice(&frame.samples);
                    if buffer.len() >= window_samples {
                        Some(buffer.drain(..).collect::<Vec<f32>>())
                    } else {
                        None
                    }
                };
                if let Some(samples) = window {
                    if diarization_ready.load(Ordering::SeqCst) {
                        ctx.dispatch_diarization(samples).await;
                    }
                }
            }

            info!("Mic consumption loop stopped");
        });

        *self.mic_task.lock().await = Some(handle);
    }

    async fn spawn_system_loop(&self, mut rx: mpsc::Receiver<AudioFrame>) {
        let chunk_buffer = Arc::clone(&self.chunk_buffer);
        let is_recording = Arc::clone(&self.is_recording);
        let ctx = self.dispatch_context();

        let handle = tokio::spawn(async move {
            info!("System consumption loop started");

            while let Some(frame) = rx.recv().await {
                if !is_recording.load(Ordering::SeqCst) {
                    break;
                }

                let emitted = {
                    let mut buffer = chunk_buffer.lock().await;
                    buffer.push(frame.source, &frame.samples)
                };
                if let Some(chunk) = emitted {
                    ctx.dispatch_transcription(chunk).await;
                }
            }

            info!("System consumption loop stopped");
        });

        *self.system_task.lock().await = Some(handle);
    }

    /// Keeps the meeting record's elapsed duration current while recording
    async fn spawn_duration_tick(&self) {
        let meeting = Arc::clone(&self.meeting);
        let is_recording = Arc::clone(&self.is_recording);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;
                if !is_recording.load(Ordering::SeqCst) {
                    break;
                }

                let mut meeting = meeting.lock().await;
                if let Some(record) = meeting.as_mut() {
                    record.duration_secs = Utc::now()
                        .signed_duration_since(record.started_at)
                        .num_milliseconds() as f64
                        / 1000.0;
                }
            }
        });

        *self.tick_task.lock().await = Some(handle);
    }

    fn dispatch_context(&self) -> DispatchContext {
        DispatchContext {
            transcription: Arc::clone(&self.transcription),
            diarization: Arc::clone(&self.diarization),
            aligner: Arc::clone(&self.aligner),
            resequencer: Arc::clone(&self.resequencer),
            meeting: Arc::clone(&self.meeting),
            latest_embeddings: Arc::clone(&self.latest_embeddings),
            diarization_ready: Arc::clone(&self.diarization_ready),
            chunks_emitted: Arc::clone(&self.chunks_emitted),
            dispatch_tasks: Arc::clone(&self.dispatch_tasks),
            sample_rate: self.config.chunk.sample_rate,
            current_speaker_window_secs: self.config.current_speaker_window_secs,
        }
    }

    /// Transcribe a chunk inline (used for the flushed final chunk)
    async fn transcribe_chunk(&self, chunk: AudioChunk) {
        self.dispatch_context().transcribe_and_append(chunk).await;
    }

    async fn apply_diarization_update(&self, update: crate::diarize::DiarizationUpdate) {
        self.dispatch_context().apply_diarization(update).await;
    }
}

/// The shared handles a dispatched engine call needs, cloned out of the
/// coordinator so spawned tasks borrow nothing
#[derive(Clone)]
struct DispatchContext {
    transcription: Arc<dyn TranscriptionEngine>,
    diarization: Arc<dyn DiarizationEngine>,
    aligner: Arc<Mutex<SegmentAligner>>,
    resequencer: Arc<Mutex<Resequencer>>,
    meeting: Arc<Mutex<Option<MeetingRecord>>>,
    latest_embeddings: Arc<Mutex<Vec<SpeakerEmbedding>>>,
    diarization_ready: Arc<AtomicBool>,
    chunks_emitted: Arc<AtomicUsize>,
    dispatch_tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
    sample_rate: u32,
    current_speaker_window_secs: f64,
}

impl DispatchContext {
    /// Fire-and-forget transcription of an emitted chunk; the capture loop
    /// registers the task handle but does not wait for the engine
    async fn dispatch_transcription(&self, chunk: AudioChunk) {
        self.chunks_emitted.fetch_add(1, Ordering::SeqCst);

        let ctx = self.clone();
        let handle = tokio::spawn(async move {
            ctx.transcribe_and_append(chunk).await;
        });

        self.dispatch_tasks.lock().await.push(handle);
    }

    async fn dispatch_diarization(&self, samples: Vec<f32>) {
        let ctx = self.clone();
        let handle = tokio::spawn(async move {
            match ctx.diarization.process(&samples, ctx.sample_rate).await {
                Ok(update) => ctx.apply_diarization(update).await,
                // Per-call diarization errors are recoverable; skip the window
                Err(e) => warn!("Diarization call failed, window skipped: {}", e),
            }
        });

        self.dispatch_tasks.lock().await.push(handle);
    }

    async fn transcribe_and_append(&self, chunk: AudioChunk) {
        let index = chunk.index;
        let start_secs = chunk.start_secs();
        let duration_secs = chunk.duration_secs();

        let segment = match self.transcription.transcribe(&chunk).await {
            Ok(result) if !result.text.trim().is_empty() => {
                let speaker_id = if self.diarization_ready.load(Ordering::SeqCst) {
                    self.aligner
                        .lock()
                        .await
                        .dominant_speaker(start_secs, duration_secs)
                } else {
                    None
                };

                Some(TranscriptSegment {
                    text: result.text,
                    timestamp_secs: start_secs,
                    speaker_id,
                    confidence: result.confidence.unwrap_or(1.0),
                    finalized: true,
                })
            }
            Ok(_) => None, // Silent chunk, nothing to append
            Err(e) => {
                // Recoverable: this window simply has no transcript segment
                warn!("Chunk {} transcription failed, skipped: {}", index, e);
                None
            }
        };

        let ready = self.resequencer.lock().await.complete(index, segment);
        if ready.is_empty() {
            return;
        }

        let mut meeting = self.meeting.lock().await;
        if let Some(record) = meeting.as_mut() {
            for segment in ready {
                record.append_segment(segment);
            }
        }
    }

    async fn apply_diarization(&self, update: crate::diarize::DiarizationUpdate) {
        let speaker_count = update.speaker_count;

        if !update.embeddings.is_empty() {
            *self.latest_embeddings.lock().await = update.embeddings.clone();
        }

        let (speakers, speaking_times, current_speaker) = {
            let mut aligner = self.aligner.lock().await;

            // Report the speaker covering the tail of the segmentation as
            // currently speaking
            let latest_end = update
                .segments
                .iter()
                .map(|s| s.end_secs as f64)
                .fold(0.0f64, f64::max);

            aligner.update(update.segments);

            let current = aligner.dominant_speaker(
                (latest_end - self.current_speaker_window_secs).max(0.0),
                self.current_speaker_window_secs,
            );

            (
                aligner.unique_speakers(),
                aligner.speaking_times().clone(),
                current,
            )
        };

        let mut meeting = self.meeting.lock().await;
        if let Some(record) = meeting.as_mut() {
            for &speaker_id in &speakers {
                record.upsert_participant(
                    speaker_id,
                    speaking_times.get(&speaker_id).copied().unwrap_or(0.0),
                    current_speaker == Some(speaker_id),
                );
            }

            // Drops participants whose id vanished in a merge, then
            // reclassifies from the surviving count
            record.sync_participants(&speakers);
            record.reclassify(speaker_count);
        }
    }
}
