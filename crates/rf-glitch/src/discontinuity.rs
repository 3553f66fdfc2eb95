//! Sample-to-sample discontinuity (glitch) detection

use crate::config::BoundaryPolicy;
use crate::stream::ChannelId;
use crate::{GlitchError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A jump between two consecutive samples that exceeded the threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscontinuityEvent {
    /// Channel the jump was found on
    pub channel_id: ChannelId,

    /// Index of the sample after the jump (1..N-1)
    pub sample_index: usize,

    /// `sample_index / sample_rate`
    pub time_seconds: f64,

    /// Sample at `sample_index - 1`
    pub value_before: f64,

    /// Sample at `sample_index`
    pub value_after: f64,

    /// `|value_after - value_before|`
    pub jump_magnitude: f64,

    /// True iff `sample_index % frame_size == 0`
    pub is_frame_boundary: bool,

    /// Processing frame the sample belongs to (when a frame size is known)
    pub frame_index: Option<usize>,

    /// Position of the sample inside its frame
    pub offset_in_frame: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct FrameGrid {
    frame_size: usize,
    policy: BoundaryPolicy,
}

/// Scans one channel for jumps above an absolute amplitude threshold
///
/// Pure: one pass over the borrowed samples, one event per qualifying index,
/// no merging of adjacent hits.
#[derive(Debug, Clone)]
pub struct DiscontinuityDetector {
    threshold: f64,
    frames: Option<FrameGrid>,
}

impl DiscontinuityDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            frames: None,
        }
    }

    /// Make the scan aware of fixed-size processing frames
    pub fn with_frames(mut self, frame_size: usize, policy: BoundaryPolicy) -> Result<Self> {
        if frame_size == 0 {
            return Err(GlitchError::invalid("frame size must be positive"));
        }
        self.frames = Some(FrameGrid { frame_size, policy });
        Ok(self)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Detect every index `i` where `|x[i] - x[i-1]| > threshold`
    ///
    /// Empty and single-sample channels yield no events.
    pub fn detect(
        &self,
        channel_id: ChannelId,
        samples: &[f64],
        sample_rate: f64,
    ) -> Vec<DiscontinuityEvent> {
        let mut events = Vec::new();

        for (offset, pair) in samples.windows(2).enumerate() {
            let index = offset + 1;
            let (before, after) = (pair[0], pair[1]);

            let is_frame_boundary = match self.frames {
                Some(grid) if index % grid.frame_size == 0 => {
                    if grid.policy == BoundaryPolicy::Exclude {
                        continue;
                    }
                    true
                }
                _ => false,
            };

            let jump = (after - before).abs();
            if jump <= self.threshold || jump.is_nan() {
                continue;
            }

            events.push(DiscontinuityEvent {
                channel_id,
                sample_index: index,
                time_seconds: index as f64 / sample_rate,
                value_before: before,
                value_after: after,
                jump_magnitude: jump,
                is_frame_boundary,
                frame_index: self.frames.map(|g| index / g.frame_size),
                offset_in_frame: self.frames.map(|g| index % g.frame_size),
            });
        }

        log::debug!(
            "channel {}: {} discontinuities above {}",
            channel_id,
            events.len(),
            self.threshold
        );

        events
    }
}

/// The `k` largest jumps, biggest first; ties keep ascending sample order
pub fn largest(events: &[DiscontinuityEvent], k: usize) -> Vec<DiscontinuityEvent> {
    let mut sorted: Vec<&DiscontinuityEvent> = events.iter().collect();
    sorted.sort_by(|a, b| {
        b.jump_magnitude
            .partial_cmp(&a.jump_magnitude)
            .unwrap_or(Ordering::Equal)
            .then(a.channel_id.cmp(&b.channel_id))
            .then(a.sample_index.cmp(&b.sample_index))
    });
    sorted.into_iter().take(k).cloned().collect()
}
