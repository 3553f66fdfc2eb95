//! Per-channel level statistics

use crate::fidelity::rms;
use serde::{Deserialize, Serialize};

/// Level statistics of one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    /// Number of samples
    pub len: usize,

    /// Largest absolute sample
    pub peak: f64,

    /// Root mean square level
    pub rms: f64,

    /// Peak / RMS (0 for a silent channel)
    pub crest_factor: f64,

    /// Mean sample value
    pub dc_offset: f64,
}

impl ChannelStats {
    pub fn compute(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self {
                len: 0,
                peak: 0.0,
                rms: 0.0,
                crest_factor: 0.0,
                dc_offset: 0.0,
            };
        }

        let peak = samples.iter().map(|s| s.abs()).fold(0.0, f64::max);
        let rms = rms(samples);
        let crest_factor = if rms > 0.0 { peak / rms } else { 0.0 };
        let dc_offset = samples.iter().sum::<f64>() / samples.len() as f64;

        Self {
            len: samples.len(),
            peak,
            rms,
            crest_factor,
            dc_offset,
        }
    }

    /// Peak level in dBFS
    pub fn peak_db(&self) -> f64 {
        to_db(self.peak)
    }

    /// RMS level in dBFS
    pub fn rms_db(&self) -> f64 {
        to_db(self.rms)
    }
}

fn to_db(amplitude: f64) -> f64 {
    if amplitude <= 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * amplitude.log10()
    }
}
