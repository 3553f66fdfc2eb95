//! Buffer boundary (seam) analysis
//!
//! The general glitch scan skips frame boundaries by default because a
//! render pipeline is allowed to jump there. This analyzer looks at exactly
//! those seams with its own, tighter threshold, which is where
//! buffer-to-buffer continuity regressions show up first.

use crate::stream::ChannelId;
use crate::{GlitchError, Result};
use serde::{Deserialize, Serialize};

/// A seam between two processing frames whose step reached the threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryIssue {
    /// Channel the seam belongs to
    pub channel_id: ChannelId,

    /// Index of the frame that starts at the seam (1-based seam count)
    pub frame_index: usize,

    /// First sample of that frame (`frame_index * frame_size`)
    pub sample_index: usize,

    /// Time of the seam in seconds
    pub time_seconds: f64,

    /// `|first sample of frame - last sample of previous frame|`
    pub discontinuity: f64,

    /// Last sample of the previous frame
    pub last_sample_prev: f64,

    /// First sample of this frame
    pub first_sample_curr: f64,
}

/// Inspects seams between fixed-size frames
#[derive(Debug, Clone)]
pub struct BufferBoundaryAnalyzer {
    frame_size: usize,
    threshold: f64,
}

impl BufferBoundaryAnalyzer {
    pub fn new(frame_size: usize, boundary_threshold: f64) -> Result<Self> {
        if frame_size == 0 {
            return Err(GlitchError::invalid(
                "boundary analysis requires a positive frame size",
            ));
        }
        Ok(Self {
            frame_size,
            threshold: boundary_threshold,
        })
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Seams inspected for a channel of `len` samples: frames 1..floor(len/B)-1
    pub fn seam_count(&self, len: usize) -> usize {
        (len / self.frame_size).saturating_sub(1)
    }

    /// Report every inspected seam whose step is at least the threshold
    pub fn analyze(
        &self,
        channel_id: ChannelId,
        samples: &[f64],
        sample_rate: f64,
    ) -> Vec<BoundaryIssue> {
        let num_frames = samples.len() / self.frame_size;
        let mut issues = Vec::new();

        for frame_index in 1..num_frames {
            let start = frame_index * self.frame_size;
            let last_sample_prev = samples[start - 1];
            let first_sample_curr = samples[start];
            let discontinuity = (first_sample_curr - last_sample_prev).abs();

            if discontinuity >= self.threshold {
                issues.push(BoundaryIssue {
                    channel_id,
                    frame_index,
                    sample_index: start,
                    time_seconds: start as f64 / sample_rate,
                    discontinuity,
                    last_sample_prev,
                    first_sample_curr,
                });
            }
        }

        log::debug!(
            "channel {}: {} of {} seams at or above {}",
            channel_id,
            issues.len(),
            self.seam_count(samples.len()),
            self.threshold
        );

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_seam_issue() {
        let samples = [0.0, 0.0, 0.0, 0.2, 0.0, 0.0];
        let analyzer = BufferBoundaryAnalyzer::new(3, 0.01).unwrap();
        let issues = analyzer.analyze(0, &samples, 44100.0);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].frame_index, 1);
        assert_eq!(issues[0].sample_index, 3);
        assert_relative_eq!(issues[0].discontinuity, 0.2);
        assert_eq!(issues[0].last_sample_prev, 0.0);
        assert_eq!(issues[0].first_sample_curr, 0.2);
    }

    #[test]
    fn test_threshold_equal_to_step_reports() {
        let samples = [0.0, 0.0, 0.0, 0.2, 0.0, 0.0];
        let analyzer = BufferBoundaryAnalyzer::new(3, 0.2).unwrap();
        assert_eq!(analyzer.analyze(0, &samples, 44100.0).len(), 1);

        let analyzer = BufferBoundaryAnalyzer::new(3, 0.25).unwrap();
        assert!(analyzer.analyze(0, &samples, 44100.0).is_empty());
    }

    #[test]
    fn test_jumps_inside_frames_ignored() {
        let samples = [0.0, 0.9, 0.0, 0.0, -0.9, 0.0, 0.0, 0.0];
        let analyzer = BufferBoundaryAnalyzer::new(4, 0.01).unwrap();
        assert!(analyzer.analyze(0, &samples, 44100.0).is_empty());
    }

    #[test]
    fn test_seam_count() {
        let analyzer = BufferBoundaryAnalyzer::new(4, 0.01).unwrap();
        assert_eq!(analyzer.seam_count(0), 0);
        assert_eq!(analyzer.seam_count(4), 0);
        assert_eq!(analyzer.seam_count(9), 1);
        assert_eq!(analyzer.seam_count(16), 3);
    }

    #[test]
    fn test_partial_trailing_frame_not_inspected() {
        // seam at index 6 starts a partial frame and is out of range
        let samples = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let analyzer = BufferBoundaryAnalyzer::new(3, 0.01).unwrap();
        assert!(analyzer.analyze(0, &samples, 44100.0).is_empty());
    }

    #[test]
    fn test_zero_frame_size_rejected() {
        assert!(matches!(
            BufferBoundaryAnalyzer::new(0, 0.01),
            Err(GlitchError::InvalidInput(_))
        ));
    }
}
