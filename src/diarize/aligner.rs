// Maps diarization segments onto transcript time windows
//
// The diarization engine re-reports its full latest segmentation on every
// call (ids can merge between reports), so `update` replaces the current
// view rather than accumulating. Speaking times and speaker sets are always
// derived from the most recent report.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::DiarizationSegment;

/// Aligns speaker segments with transcript windows
pub struct SegmentAligner {
    segments: Vec<DiarizationSegment>,
    speaking_times: HashMap<i32, f64>,
}

impl SegmentAligner {
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
            speaking_times: HashMap::new(),
        }
    }

    /// Replace the current segment view with the engine's latest report
    pub fn update(&mut self, segments: Vec<DiarizationSegment>) {
        self.speaking_times.clear();
        for segment in &segments {
            *self.speaking_times.entry(segment.speaker_id).or_insert(0.0) +=
                segment.duration_secs() as f64;
        }

        debug!(
            "Aligner updated: {} segments, {} speakers",
            segments.len(),
            self.speaking_times.len()
        );

        self.segments = segments;
    }

    /// Speaker whose segments cover the greatest total duration within the
    /// queried window (majority-overlap vote). `None` if nothing overlaps.
    pub fn dominant_speaker(&self, window_start_secs: f64, window_duration_secs: f64) -> Option<i32> {
        let window_end = window_start_secs + window_duration_secs;
        let mut overlap_by_speaker: HashMap<i32, f64> = HashMap::new();

        for segment in &self.segments {
            let overlap_start = (segment.start_secs as f64).max(window_start_secs);
            let overlap_end = (segment.end_secs as f64).min(window_end);
            let overlap = overlap_end - overlap_start;

            if overlap > 0.0 {
                *overlap_by_speaker.entry(segment.speaker_id).or_insert(0.0) += overlap;
            }
        }

        overlap_by_speaker
            .into_iter()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(speaker_id, _)| speaker_id)
    }

    /// Total speech duration per speaker across the current segment view
    pub fn speaking_times(&self) -> &HashMap<i32, f64> {
        &self.speaking_times
    }

    /// Distinct speaker ids in the current segment view
    pub fn unique_speakers(&self) -> HashSet<i32> {
        self.segments.iter().map(|s| s.speaker_id).collect()
    }

    pub fn reset(&mut self) {
        self.segments.clear();
        self.speaking_times.clear();
    }
}

impl Default for SegmentAligner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(speaker_id: i32, start_secs: f32, end_secs: f32) -> DiarizationSegment {
        DiarizationSegment {
            speaker_id,
            start_secs,
            end_secs,
            embedding: Vec::new(),
        }
    }

    #[test]
    fn test_dominant_speaker_by_overlap() {
        let mut aligner = SegmentAligner::new();
        aligner.update(vec![
            segment(0, 0.0, 4.0),  // 4s inside the window
            segment(1, 3.0, 12.0), // 7s inside the window
        ]);

        assert_eq!(aligner.dominant_speaker(0.0, 10.0), Some(1));
    }

    #[test]
    fn test_no_overlap_returns_none() {
        let mut aligner = SegmentAligner::new();
        aligner.update(vec![segment(0, 0.0, 5.0)]);

        assert_eq!(aligner.dominant_speaker(10.0, 10.0), None);
    }

    #[test]
    fn test_speaking_times_sum_segments() {
        let mut aligner = SegmentAligner::new();
        aligner.update(vec![
            segment(0, 0.0, 3.0),
            segment(1, 3.0, 5.0),
            segment(0, 5.0, 9.0),
        ]);

        let times = aligner.speaking_times();
        assert!((times[&0] - 7.0).abs() < 1e-6);
        assert!((times[&1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_update_replaces_after_speaker_merge() {
        let mut aligner = SegmentAligner::new();
        aligner.update(vec![segment(0, 0.0, 3.0), segment(1, 3.0, 6.0)]);
        assert_eq!(aligner.unique_speakers().len(), 2);

        // Engine merged speaker 1 into 0 and re-reported
        aligner.update(vec![segment(0, 0.0, 6.0)]);

        let speakers = aligner.unique_speakers();
        assert_eq!(speakers.len(), 1);
        assert!(speakers.contains(&0));
        assert!((aligner.speaking_times()[&0] - 6.0).abs() < 1e-6);
    }
}
