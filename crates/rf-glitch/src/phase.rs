//! Phase continuity analysis for a nominally single-tone channel
//!
//! Instantaneous phase is estimated from amplitude alone:
//! `asin(clamp(x / peak, -1, 1))`, with `peak` the channel's largest
//! absolute sample. That alone only covers half a cycle, so the quadrant is
//! picked from the sign of the quadrature component implied by the expected
//! tone frequency (`Δ = 2π·f / sr`):
//!
//! - looking back from `i`:  `x[i]·cos Δ − x[i−1]`
//! - looking ahead from `i`: `x[i+1] − x[i]·cos Δ`
//!
//! Both are proportional to `cos φ_i` for a clean tone. The step between
//! `i−1` and `i` compares the phase of `i−1` resolved from samples up to
//! `i−1` with the phase of `i` resolved from samples from `i` on, so no
//! estimate ever straddles the step being judged.
//!
//! Near the waveform crests the quadrature sign is buried in noise. When its
//! magnitude is below [`QUADRATURE_DEADBAND`] of the clean-tone quadrature
//! scale (`peak·sin Δ`) both quadrants are kept, and the step uses the pair
//! whose advance sits closest to either `Δ` or a half-cycle reset `π + Δ`.
//!
//! A clean tone advances by `Δ < π` per sample. A forward advance above π
//! (half a cycle) is reported as a [`PhaseJump`]. This is a diagnostic:
//! amplitude-derived phase is ambiguous around the waveform peaks and the
//! result flags candidates rather than reconstructing true phase.

use crate::stream::ChannelId;
use crate::{GlitchError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// Fraction of `peak·sin Δ` under which the quadrature sign is not trusted
pub const QUADRATURE_DEADBAND: f64 = 0.1;

/// A phase advance of more than half a cycle between two samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseJump {
    pub channel_id: ChannelId,

    /// Index of the first sample after the slip
    pub sample_index: usize,

    pub time_seconds: f64,

    /// Forward phase advance across the step, in `(π, 2π)`
    pub phase_jump_radians: f64,

    /// Sample at `sample_index`
    pub sample_value: f64,
}

/// Tracks amplitude-derived phase against an expected tone frequency
#[derive(Debug, Clone)]
pub struct PhaseContinuityAnalyzer {
    sample_rate: f64,
    expected_frequency: f64,
    phase_increment: f64,
}

impl PhaseContinuityAnalyzer {
    /// `expected_frequency` must lie strictly between 0 and Nyquist
    pub fn new(sample_rate: f64, expected_frequency: f64) -> Result<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(GlitchError::invalid(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }

        let nyquist = sample_rate / 2.0;
        if !(expected_frequency.is_finite() && expected_frequency > 0.0 && expected_frequency < nyquist)
        {
            return Err(GlitchError::invalid(format!(
                "expected frequency must be in (0, {}) Hz, got {}",
                nyquist, expected_frequency
            )));
        }

        Ok(Self {
            sample_rate,
            expected_frequency,
            phase_increment: TAU * expected_frequency / sample_rate,
        })
    }

    pub fn expected_frequency(&self) -> f64 {
        self.expected_frequency
    }

    /// Expected phase advance per sample (radians)
    pub fn phase_increment(&self) -> f64 {
        self.phase_increment
    }

    /// Flag every step whose forward phase advance exceeds π
    ///
    /// Channels shorter than three samples or entirely silent yield nothing.
    pub fn analyze(&self, channel_id: ChannelId, samples: &[f64]) -> Vec<PhaseJump> {
        let n = samples.len();
        if n < 3 {
            return Vec::new();
        }

        let peak = samples.iter().fold(0.0f64, |m, s| m.max(s.abs()));
        if !(peak.is_finite() && peak > 0.0) {
            log::warn!(
                "channel {}: no usable peak amplitude, skipping phase analysis",
                channel_id
            );
            return Vec::new();
        }

        let cos_delta = self.phase_increment.cos();
        let deadband = QUADRATURE_DEADBAND * peak * self.phase_increment.sin();
        let amplitude_phase: Vec<f64> = samples
            .iter()
            .map(|s| (s / peak).clamp(-1.0, 1.0).asin())
            .collect();

        let mut jumps = Vec::new();

        // First step judged needs two samples behind it and one ahead
        for i in 2..n - 1 {
            let before = quadrant_candidates(
                amplitude_phase[i - 1],
                samples[i - 1] * cos_delta - samples[i - 2],
                deadband,
            );
            let after = quadrant_candidates(
                amplitude_phase[i],
                samples[i + 1] - samples[i] * cos_delta,
                deadband,
            );

            let advance = self.most_plausible_advance(&before, &after);
            if advance > PI {
                jumps.push(PhaseJump {
                    channel_id,
                    sample_index: i,
                    time_seconds: i as f64 / self.sample_rate,
                    phase_jump_radians: advance,
                    sample_value: samples[i],
                });
            }
        }

        log::debug!(
            "channel {}: {} phase jumps against {} Hz",
            channel_id,
            jumps.len(),
            self.expected_frequency
        );

        jumps
    }
}

impl PhaseContinuityAnalyzer {
    /// Forward advance over all candidate pairs, nearest to a clean step or a
    /// half-cycle reset
    fn most_plausible_advance(&self, before: &[f64], after: &[f64]) -> f64 {
        let reset = PI + self.phase_increment;
        let mut best = (f64::INFINITY, 0.0);

        for &b in before {
            for &a in after {
                let advance = (a - b).rem_euclid(TAU);
                let distance = circular_distance(advance, self.phase_increment)
                    .min(circular_distance(advance, reset));
                if distance < best.0 {
                    best = (distance, advance);
                }
            }
        }

        best.1
    }
}

/// One resolved phase, or both quadrants when `|quadrature| < deadband`
fn quadrant_candidates(asin_phase: f64, quadrature: f64, deadband: f64) -> Vec<f64> {
    if quadrature.abs() < deadband {
        vec![asin_phase, PI - asin_phase]
    } else {
        vec![resolve_quadrant(asin_phase, quadrature)]
    }
}

fn circular_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    d.min(TAU - d)
}

/// Map an `asin` phase onto the full cycle using the sign of `cos φ`
fn resolve_quadrant(asin_phase: f64, quadrature: f64) -> f64 {
    if quadrature >= 0.0 {
        asin_phase
    } else {
        PI - asin_phase
    }
}
