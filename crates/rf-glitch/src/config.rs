//! Configuration for an analysis run
//!
//! Every threshold is supplied by the caller. Nothing in the analyzers
//! falls back to a baked-in constant, so a run is fully described by its
//! config and its input.

use crate::{GlitchError, Result};
use serde::{Deserialize, Serialize};

/// What the discontinuity scan does with samples that start a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Skip frame boundaries entirely (seams are expected to jump)
    Exclude,
    /// Evaluate them like any other sample and tag the event
    IncludeAndTag,
}

/// Configuration for a glitch analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Sample rate the input streams must have (Hz)
    pub sample_rate: f64,

    /// Absolute sample-to-sample jump that counts as a glitch
    pub discontinuity_threshold: f64,

    /// Seam step that counts as a boundary issue (usually much tighter)
    pub boundary_threshold: f64,

    /// Samples per processing buffer; falls back to the stream's own frame size
    #[serde(default)]
    pub frame_size: Option<usize>,

    /// Frequency of the reference tone (Hz); enables phase analysis
    #[serde(default)]
    pub expected_frequency: Option<f64>,

    /// Run the buffer boundary analyzer (requires a frame size)
    #[serde(default)]
    pub analyze_boundaries: bool,

    /// Explicit boundary policy; derived from `analyze_boundaries` when unset
    #[serde(default)]
    pub boundary_policy: Option<BoundaryPolicy>,

    /// Number of largest discontinuities kept per channel in the summary
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Block size for a windowed fidelity series
    #[serde(default)]
    pub fidelity_window: Option<usize>,
}

fn default_top_k() -> usize {
    10
}

impl AnalysisConfig {
    /// Configuration with the three required fields; everything else off
    pub fn new(sample_rate: f64, discontinuity_threshold: f64, boundary_threshold: f64) -> Self {
        Self {
            sample_rate,
            discontinuity_threshold,
            boundary_threshold,
            frame_size: None,
            expected_frequency: None,
            analyze_boundaries: false,
            boundary_policy: None,
            top_k: default_top_k(),
            fidelity_window: None,
        }
    }

    /// Conventions of the GPU render pipeline test harness: 0.1 glitch
    /// threshold, 0.01 seam threshold, 440 Hz reference tone, seam checks on
    pub fn render_pipeline(sample_rate: f64, frame_size: usize) -> Self {
        Self::new(sample_rate, 0.1, 0.01)
            .with_frame_size(frame_size)
            .with_expected_frequency(440.0)
            .with_boundary_analysis()
    }

    /// Builder pattern: set frame size
    pub fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = Some(frame_size);
        self
    }

    /// Builder pattern: set reference tone frequency
    pub fn with_expected_frequency(mut self, frequency: f64) -> Self {
        self.expected_frequency = Some(frequency);
        self
    }

    /// Builder pattern: enable buffer boundary analysis
    pub fn with_boundary_analysis(mut self) -> Self {
        self.analyze_boundaries = true;
        self
    }

    /// Builder pattern: force a boundary policy
    pub fn with_boundary_policy(mut self, policy: BoundaryPolicy) -> Self {
        self.boundary_policy = Some(policy);
        self
    }

    /// Builder pattern: set number of largest discontinuities to summarize
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// Builder pattern: enable windowed fidelity
    pub fn with_fidelity_window(mut self, window: usize) -> Self {
        self.fidelity_window = Some(window);
        self
    }

    /// Policy the discontinuity scan uses at frame boundaries
    ///
    /// General glitch scanning excludes seams; once boundary analysis is
    /// requested the seams are evaluated and tagged instead.
    pub fn effective_boundary_policy(&self) -> BoundaryPolicy {
        self.boundary_policy.unwrap_or(if self.analyze_boundaries {
            BoundaryPolicy::IncludeAndTag
        } else {
            BoundaryPolicy::Exclude
        })
    }

    /// Fail-fast checks on the configuration itself
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(GlitchError::invalid(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }

        check_threshold("discontinuity_threshold", self.discontinuity_threshold)?;
        check_threshold("boundary_threshold", self.boundary_threshold)?;

        if self.frame_size == Some(0) {
            return Err(GlitchError::invalid("frame size must be positive"));
        }

        if let Some(frequency) = self.expected_frequency {
            let nyquist = self.sample_rate / 2.0;
            if !(frequency.is_finite() && frequency > 0.0 && frequency < nyquist) {
                return Err(GlitchError::invalid(format!(
                    "expected frequency must be in (0, {}) Hz, got {}",
                    nyquist, frequency
                )));
            }
        }

        if self.fidelity_window == Some(0) {
            return Err(GlitchError::invalid("fidelity window must be positive"));
        }

        Ok(())
    }
}

fn check_threshold(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(GlitchError::invalid(format!(
            "{} must be a non-negative amplitude, got {}",
            name, value
        )))
    }
}
